/*!
 * CTC forced alignment of a known transcript against emission probabilities.
 *
 * The transcript is turned into a `|WORD|WORD|` label sequence, a trellis of
 * best cumulative log-probabilities is filled over (frame, token), and the
 * most likely path is traced back from the end. Repeated frames of the same
 * token collapse into label segments, label segments join into words at the
 * `|` separator, and words are grouped into caption phrases.
 */

use std::collections::HashMap;

use log::debug;

use crate::app_config::AlignerConfig;
use crate::errors::AlignmentError;
use crate::timing::emissions::EmissionMatrix;
use crate::timing::{TimingCue, Timeline, TranscriptUnit};

/// Label separating words in the token sequence
pub const WORD_SEPARATOR: &str = "|";

/// One step of the backtracked path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    /// Index into the token sequence
    pub token_index: usize,
    /// Emission frame
    pub frame: usize,
    /// Probability of the emission taken on this step
    pub score: f64,
}

/// A run of frames assigned to one token
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSegment {
    pub label: String,
    /// First frame
    pub start: usize,
    /// One past the last frame
    pub end: usize,
    /// Mean probability over the run
    pub score: f64,
}

impl LabelSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// An aligned word in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct WordSegment {
    /// Word as written in the transcript
    pub word: String,
    /// Index of the word among all transcript words
    pub word_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Length-weighted mean label probability
    pub confidence: f64,
}

/// Token sequence for a transcript and the words it covers
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedTranscript {
    /// Label indices, `|` first, after every word
    pub tokens: Vec<usize>,
    /// Transcript word index of each alignable word, in order
    pub word_indices: Vec<usize>,
}

/// Dense (frames + 1) x (tokens + 1) table of cumulative log-probabilities
#[derive(Debug, Clone)]
pub struct Trellis {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl Trellis {
    pub fn get(&self, frame: usize, token: usize) -> f64 {
        self.cells[frame * self.cols + token]
    }

    fn set(&mut self, frame: usize, token: usize, value: f64) {
        self.cells[frame * self.cols + token] = value;
    }

    /// Number of emission frames covered
    pub fn num_frames(&self) -> usize {
        self.rows - 1
    }

    /// Number of tokens covered
    pub fn num_tokens(&self) -> usize {
        self.cols - 1
    }
}

/// Forced aligner and phrase builder
#[derive(Debug, Clone)]
pub struct ForcedAligner {
    max_phrase_duration: f64,
    max_phrase_words: usize,
}

impl ForcedAligner {
    pub fn new(config: &AlignerConfig) -> Self {
        Self {
            max_phrase_duration: config.max_phrase_duration,
            max_phrase_words: config.max_phrase_words.max(1),
        }
    }

    /// Map transcript words onto label indices.
    ///
    /// Characters the vocabulary lacks are dropped; a word left with no
    /// characters is not aligned and borrows its neighbours' timing later.
    pub fn tokenize(&self, labels: &[String], words: &[&str]) -> Result<TokenizedTranscript, AlignmentError> {
        let dictionary: HashMap<String, usize> = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.to_uppercase(), index))
            .collect();

        let separator = *dictionary
            .get(WORD_SEPARATOR)
            .ok_or_else(|| AlignmentError::InvalidEmissions("vocabulary has no '|' separator".to_string()))?;

        let mut tokens = vec![separator];
        let mut word_indices = Vec::new();

        for (word_index, word) in words.iter().enumerate() {
            let word_tokens: Vec<usize> = word
                .to_uppercase()
                .chars()
                .filter_map(|c| dictionary.get(c.to_string().as_str()).copied())
                .filter(|&t| t != separator)
                .collect();
            if word_tokens.is_empty() {
                debug!("Word '{}' has no alignable characters", word);
                continue;
            }
            tokens.extend(word_tokens);
            tokens.push(separator);
            word_indices.push(word_index);
        }

        if word_indices.is_empty() {
            return Err(AlignmentError::EmptyTranscript);
        }

        Ok(TokenizedTranscript { tokens, word_indices })
    }

    /// Fill the trellis for `tokens` over `emissions` (log-probabilities)
    pub fn trellis(&self, emissions: &[Vec<f32>], tokens: &[usize], blank_id: usize) -> Result<Trellis, AlignmentError> {
        let frames = emissions.len();
        let num_tokens = tokens.len();
        if num_tokens == 0 {
            return Err(AlignmentError::EmptyTranscript);
        }
        if frames < num_tokens {
            return Err(AlignmentError::DegenerateTrellis {
                frames,
                tokens: num_tokens,
            });
        }

        let mut trellis = Trellis {
            rows: frames + 1,
            cols: num_tokens + 1,
            cells: vec![f64::NEG_INFINITY; (frames + 1) * (num_tokens + 1)],
        };

        trellis.set(0, 0, 0.0);
        for t in 0..frames {
            let blank = emissions[t][blank_id] as f64;
            trellis.set(t + 1, 0, trellis.get(t, 0) + blank);
            for j in 1..=num_tokens {
                let stay = trellis.get(t, j) + blank;
                let advance = trellis.get(t, j - 1) + emissions[t][tokens[j - 1]] as f64;
                trellis.set(t + 1, j, stay.max(advance));
            }
        }

        Ok(trellis)
    }

    /// Trace the most likely path back to the first token.
    ///
    /// The walk starts at the frame where the last token ends with the best
    /// score once the remaining frames are counted as blanks.
    pub fn backtrack(
        &self,
        trellis: &Trellis,
        emissions: &[Vec<f32>],
        tokens: &[usize],
        blank_id: usize,
    ) -> Result<Vec<PathPoint>, AlignmentError> {
        let frames = trellis.num_frames();
        let last = trellis.num_tokens();
        if last == 0 || frames == 0 {
            return Err(AlignmentError::EmptyPath);
        }

        let mut blank_suffix = vec![0.0; frames + 1];
        for t in (0..frames).rev() {
            blank_suffix[t] = blank_suffix[t + 1] + emissions[t][blank_id] as f64;
        }

        let mut t_start = 0;
        let mut best = f64::NEG_INFINITY;
        for t in 1..=frames {
            let score = trellis.get(t, last) + blank_suffix[t];
            if score > best {
                best = score;
                t_start = t;
            }
        }
        if !best.is_finite() {
            return Err(AlignmentError::EmptyPath);
        }

        let mut j = last;
        let mut path = Vec::with_capacity(t_start);
        for t in (1..=t_start).rev() {
            let blank = emissions[t - 1][blank_id] as f64;
            let emitted = emissions[t - 1][tokens[j - 1]] as f64;
            let stayed = trellis.get(t - 1, j) + blank;
            let changed = trellis.get(t - 1, j - 1) + emitted;
            let advanced = changed > stayed;

            path.push(PathPoint {
                token_index: j - 1,
                frame: t - 1,
                score: if advanced { emitted.exp() } else { blank.exp() },
            });

            if advanced {
                j -= 1;
                if j == 0 {
                    break;
                }
            }
        }

        if j != 0 || path.is_empty() {
            return Err(AlignmentError::EmptyPath);
        }

        path.reverse();
        Ok(path)
    }

    /// Collapse consecutive path points of the same token
    pub fn merge_repeats(&self, path: &[PathPoint], tokens: &[usize], labels: &[String]) -> Vec<LabelSegment> {
        let mut segments = Vec::new();
        let mut i = 0;
        while i < path.len() {
            let mut k = i;
            while k < path.len() && path[k].token_index == path[i].token_index {
                k += 1;
            }
            let run = &path[i..k];
            let score = run.iter().map(|p| p.score).sum::<f64>() / run.len() as f64;
            let label = labels
                .get(tokens[path[i].token_index])
                .cloned()
                .unwrap_or_default();
            segments.push(LabelSegment {
                label,
                start: path[i].frame,
                end: path[k - 1].frame + 1,
                score,
            });
            i = k;
        }
        segments
    }

    /// Join label segments into words at the separator, times stay in frames
    pub fn merge_words(&self, segments: &[LabelSegment]) -> Vec<LabelSegment> {
        let mut words = Vec::new();
        let mut current: Vec<&LabelSegment> = Vec::new();

        let flush = |current: &mut Vec<&LabelSegment>, words: &mut Vec<LabelSegment>| {
            if current.is_empty() {
                return;
            }
            let label: String = current.iter().map(|s| s.label.as_str()).collect();
            let total: usize = current.iter().map(|s| s.len()).sum();
            let weighted: f64 = current.iter().map(|s| s.score * s.len() as f64).sum();
            words.push(LabelSegment {
                label,
                start: current[0].start,
                end: current[current.len() - 1].end,
                score: weighted / total.max(1) as f64,
            });
            current.clear();
        };

        for segment in segments {
            if segment.label == WORD_SEPARATOR {
                flush(&mut current, &mut words);
            } else {
                current.push(segment);
            }
        }
        flush(&mut current, &mut words);

        words
    }

    /// Align transcript words against an emission matrix.
    ///
    /// Returns one segment per alignable word, never a partial result.
    pub fn align(
        &self,
        matrix: EmissionMatrix,
        words: &[&str],
        num_samples: usize,
        sample_rate: u32,
    ) -> Result<Vec<WordSegment>, AlignmentError> {
        let matrix = matrix.into_log_probs()?;
        let transcript = self.tokenize(&matrix.labels, words)?;

        let trellis = self.trellis(&matrix.emissions, &transcript.tokens, matrix.blank_id)?;
        let path = self.backtrack(&trellis, &matrix.emissions, &transcript.tokens, matrix.blank_id)?;
        let segments = self.merge_repeats(&path, &transcript.tokens, &matrix.labels);
        let merged = self.merge_words(&segments);

        if merged.len() != transcript.word_indices.len() {
            return Err(AlignmentError::WordCountMismatch {
                aligned: merged.len(),
                expected: transcript.word_indices.len(),
            });
        }

        let seconds_per_frame = matrix.frame_ratio_for(num_samples) / sample_rate.max(1) as f64;
        debug!(
            "Aligned {} words over {} frames ({:.4}s per frame)",
            merged.len(),
            matrix.num_frames(),
            seconds_per_frame
        );

        Ok(merged
            .into_iter()
            .zip(transcript.word_indices)
            .map(|(segment, word_index)| WordSegment {
                word: words[word_index].to_string(),
                word_index,
                start_time: segment.start as f64 * seconds_per_frame,
                end_time: segment.end as f64 * seconds_per_frame,
                confidence: segment.score,
            })
            .collect())
    }

    /// Group aligned words into caption cues.
    ///
    /// Phrases never cross a sentence boundary and stay within the phrase
    /// duration and word limits. Sentence and question flags come from the
    /// transcript units the words were taken from.
    pub fn group_phrases(&self, units: &[TranscriptUnit], aligned: &[WordSegment]) -> Result<Timeline, AlignmentError> {
        let words = transcript_words(units);
        let mut timing: Vec<Option<(f64, f64)>> = vec![None; words.len()];
        for segment in aligned {
            let slot = timing.get_mut(segment.word_index).ok_or(AlignmentError::WordCountMismatch {
                aligned: aligned.len(),
                expected: words.len(),
            })?;
            *slot = Some((segment.start_time, segment.end_time));
        }

        let mut cues: Timeline = Vec::new();
        let mut phrase: Vec<usize> = Vec::new();

        for (index, word) in words.iter().enumerate() {
            if !phrase.is_empty() {
                let too_long = match (phrase_span(&phrase, &timing), timing[index]) {
                    (Some((start, _)), Some((_, end))) => end - start > self.max_phrase_duration,
                    _ => false,
                };
                if word.sentence_start || too_long || phrase.len() >= self.max_phrase_words {
                    flush_phrase(&mut phrase, &words, &timing, &mut cues);
                }
            }
            phrase.push(index);
            if word.sentence_end {
                flush_phrase(&mut phrase, &words, &timing, &mut cues);
            }
        }
        flush_phrase(&mut phrase, &words, &timing, &mut cues);

        if cues.is_empty() {
            return Err(AlignmentError::EmptyPath);
        }
        Ok(cues)
    }
}

/// A transcript word with the sentence metadata of its unit
#[derive(Debug, Clone)]
struct TranscriptWord<'a> {
    text: &'a str,
    sentence_start: bool,
    sentence_end: bool,
    question: bool,
}

fn transcript_words(units: &[TranscriptUnit]) -> Vec<TranscriptWord<'_>> {
    let mut words = Vec::new();
    for unit in units {
        let count = unit.word_count();
        for (i, text) in unit.words().enumerate() {
            words.push(TranscriptWord {
                text,
                sentence_start: unit.is_sentence_start && i == 0,
                sentence_end: unit.is_sentence_end && i + 1 == count,
                question: unit.is_question,
            });
        }
    }
    words
}

fn phrase_span(phrase: &[usize], timing: &[Option<(f64, f64)>]) -> Option<(f64, f64)> {
    let start = phrase.iter().find_map(|&i| timing[i].map(|(s, _)| s))?;
    let end = phrase.iter().rev().find_map(|&i| timing[i].map(|(_, e)| e))?;
    Some((start, end))
}

fn flush_phrase(
    phrase: &mut Vec<usize>,
    words: &[TranscriptWord<'_>],
    timing: &[Option<(f64, f64)>],
    cues: &mut Timeline,
) {
    if phrase.is_empty() {
        return;
    }
    let text = phrase.iter().map(|&i| words[i].text).collect::<Vec<_>>().join(" ");
    let first = &words[phrase[0]];
    let last = &words[phrase[phrase.len() - 1]];

    match phrase_span(phrase, timing) {
        Some((start, end)) => {
            cues.push(TimingCue {
                is_sentence_start: first.sentence_start,
                is_sentence_end: last.sentence_end,
                is_question: phrase.iter().any(|&i| words[i].question),
                ..TimingCue::spoken(text, start, end)
            });
            phrase.clear();
        }
        None => {
            // Untimed words ride along with the previous phrase, or wait for the next one
            if let Some(previous) = cues.last_mut() {
                previous.text.push(' ');
                previous.text.push_str(&text);
                previous.is_sentence_end |= last.sentence_end;
                phrase.clear();
            }
        }
    }
}

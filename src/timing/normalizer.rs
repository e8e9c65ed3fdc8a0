/*!
 * Sequential normalizer.
 *
 * Turns any timeline into a strictly ordered, non-overlapping cue list:
 * long cues are re-chunked, the voice lead time and a preview buffer shift
 * cues earlier, overlaps are pushed apart, and a closing breath marker plus
 * a blank pause end the track.
 */

use log::debug;

use crate::app_config::{NormalizerConfig, TimingConfig};
use crate::timing::{TimingCue, Timeline, TIME_EPSILON};
use crate::voices::VoiceProfile;

/// Reference word length for complexity scores
const REFERENCE_WORD_LENGTH: f64 = 5.0;

/// Closing pause for call-to-action endings
const CALL_TO_ACTION_PAUSE: f64 = 1.5;
const CALL_TO_ACTION_EXTRA: f64 = 0.5;
/// Extra closing pause when the text ends a sentence
const PUNCTUATION_PAUSE: f64 = 0.2;
const MAX_COMPLEXITY_PAUSE: f64 = 0.5;
const COMPLEXITY_PAUSE_PER_CHAR: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct SequentialNormalizer {
    config: NormalizerConfig,
    min_duration_per_word: f64,
}

impl SequentialNormalizer {
    pub fn new(config: &NormalizerConfig, timing: &TimingConfig) -> Self {
        Self {
            config: config.clone(),
            min_duration_per_word: timing.min_duration_per_word,
        }
    }

    /// Normalize `cues` for `voice`
    pub fn normalize(&self, cues: &[TimingCue], voice: &VoiceProfile) -> Timeline {
        let mut spoken: Vec<TimingCue> = cues.iter().filter(|c| c.is_spoken()).cloned().collect();
        if spoken.is_empty() {
            return Vec::new();
        }
        spoken.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let chunked: Vec<TimingCue> = spoken.iter().flat_map(|cue| self.rechunk(cue)).collect();

        let mut adjusted: Vec<TimingCue> = chunked
            .into_iter()
            .map(|cue| self.shift_and_stretch(cue, voice))
            .collect();
        adjusted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        self.resolve_overlaps(&mut adjusted, voice);
        self.append_closing(&mut adjusted, voice);

        debug!(
            "Normalized {} cues into {} (including closing sequence)",
            cues.len(),
            adjusted.len()
        );
        adjusted
    }

    /// Content-derived minimum duration for a cue
    pub fn min_duration(&self, cue: &TimingCue, voice: &VoiceProfile) -> f64 {
        (cue.word_count() as f64 * self.min_duration_per_word).max(voice.min_cue_duration)
    }

    /// Split a long cue into smaller consecutive cues sharing its span
    pub fn rechunk(&self, cue: &TimingCue) -> Vec<TimingCue> {
        let words: Vec<&str> = cue.text.split_whitespace().collect();
        if words.len() <= self.config.rechunk_word_threshold {
            return vec![cue.clone()];
        }

        let chunk_size = if cue.is_question || self.has_long_word(&words) {
            self.config.small_chunk_size
        } else {
            self.config.default_chunk_size
        };
        let chunks: Vec<&[&str]> = words.chunks(chunk_size).collect();
        let count = chunks.len();
        let piece = cue.duration() / count as f64;

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, group)| {
                let start = cue.start_time + i as f64 * piece;
                TimingCue {
                    is_sentence_start: cue.is_sentence_start && i == 0,
                    is_sentence_end: cue.is_sentence_end && i + 1 == count,
                    ..TimingCue {
                        text: group.join(" "),
                        start_time: start,
                        end_time: start + piece,
                        ..cue.clone()
                    }
                }
            })
            .collect()
    }

    /// Apply lead time, preview buffer and display-time factor
    fn shift_and_stretch(&self, cue: TimingCue, voice: &VoiceProfile) -> TimingCue {
        let words: Vec<&str> = cue.text.split_whitespace().collect();
        let preview = self.config.preview_base + self.config.preview_scale * complexity(&words).min(1.0);
        let start = (cue.start_time + voice.lead_time - preview).max(0.0);

        let factor = if cue.is_question {
            self.config.question_duration_factor
        } else if self.has_long_word(&words) {
            self.config.long_word_duration_factor
        } else {
            1.0
        };
        let duration = (cue.duration() * factor).max(self.min_duration(&cue, voice));

        TimingCue {
            start_time: start,
            end_time: start + duration,
            ..cue
        }
    }

    /// Push every overlapping cue after its predecessor
    fn resolve_overlaps(&self, cues: &mut [TimingCue], voice: &VoiceProfile) {
        for i in 1..cues.len() {
            let previous_end = cues[i - 1].end_time;
            let previous_ends_sentence = cues[i - 1].is_sentence_end;
            if previous_end > cues[i].start_time {
                let gap = self.transition_gap(previous_ends_sentence, &cues[i]);
                let floor = self.min_duration(&cues[i], voice);
                let cue = &mut cues[i];
                cue.start_time = previous_end + gap;
                cue.end_time = cue.end_time.max(cue.start_time + floor);
            }
        }
    }

    /// Gap between two cues, wider at sentence ends and before complex text
    pub fn transition_gap(&self, previous_ends_sentence: bool, next: &TimingCue) -> f64 {
        let words: Vec<&str> = next.text.split_whitespace().collect();
        let weight = if previous_ends_sentence {
            1.0
        } else {
            (complexity(&words) - 1.0).clamp(0.0, 1.0)
        };
        self.config.min_gap + (self.config.max_gap - self.config.min_gap) * weight
    }

    /// Breath marker and trailing blank pause after the last cue
    fn append_closing(&self, cues: &mut Timeline, voice: &VoiceProfile) {
        let Some(last) = cues.last() else { return };

        let text = last.text.trim_end();
        let lowered = text.to_lowercase();
        let is_call_to_action = self
            .config
            .call_to_action_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && lowered.contains(&phrase.to_lowercase()));

        let pause = if is_call_to_action {
            CALL_TO_ACTION_PAUSE + CALL_TO_ACTION_EXTRA
        } else {
            let words: Vec<&str> = text.split_whitespace().collect();
            let avg_len = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len().max(1) as f64;
            let punctuation = if text.ends_with(['.', '!', '?']) {
                PUNCTUATION_PAUSE
            } else {
                0.0
            };
            voice.end_pause + punctuation + (avg_len * COMPLEXITY_PAUSE_PER_CHAR).min(MAX_COMPLEXITY_PAUSE)
        };

        let breath_start = last.end_time + voice.breath_gap.max(0.0);
        let breath_end = breath_start + voice.breath_duration.max(TIME_EPSILON);
        cues.push(TimingCue::marker(breath_start, breath_end));
        cues.push(TimingCue::blank(breath_end, breath_end + pause.max(TIME_EPSILON)));
    }

    fn has_long_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| w.chars().count() > self.config.long_word_length)
    }
}

/// Average word length relative to a five-letter word
fn complexity(words: &[&str]) -> f64 {
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();
    chars as f64 / (REFERENCE_WORD_LENGTH * words.len().max(1) as f64)
}

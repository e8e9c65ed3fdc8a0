/*!
 * Splits a transcript into caption-sized transcript units.
 *
 * Sentences end at runs of `.`, `!` or `?`. Each sentence is cut into groups
 * of at most `max_words` words. Bracketed directives such as `(break)` or
 * `[laugh]` never become caption text: their pause is carried into the next
 * spoken unit instead.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::TimingConfig;
use crate::timing::TranscriptUnit;

static SENTENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

static DIRECTIVE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\(\[]\s*([A-Za-z][A-Za-z\- ]*?)\s*[\)\]]").unwrap()
});

/// One piece of a sentence: a spoken word or a directive name
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Directive(String),
}

/// Transcript chunker
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_words: usize,
    timing: TimingConfig,
}

impl TextChunker {
    /// Create a chunker using the timing configuration's word cap
    pub fn new(timing: &TimingConfig) -> Self {
        Self::with_max_words(timing, timing.max_words_per_chunk)
    }

    /// Create a chunker with an explicit word cap
    pub fn with_max_words(timing: &TimingConfig, max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
            timing: timing.clone(),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split `transcript` into ordered transcript units
    pub fn chunk(&self, transcript: &str) -> Vec<TranscriptUnit> {
        let mut units = Vec::new();
        let mut pending_pause = 0.0;

        for sentence in split_sentences(transcript) {
            let is_question = sentence.contains('?');
            let tokens = tokenize(sentence);

            // Directives break a sentence into runs of words so the pause
            // lands right before the words that follow it
            let mut runs: Vec<(f64, Vec<String>)> = Vec::new();
            let mut run_pause = 0.0;
            let mut run_words: Vec<String> = Vec::new();
            for token in tokens {
                match token {
                    Token::Word(word) => run_words.push(word),
                    Token::Directive(name) => {
                        if !run_words.is_empty() {
                            runs.push((run_pause, std::mem::take(&mut run_words)));
                            run_pause = 0.0;
                        }
                        run_pause += self.timing.directive_pause(&name);
                    }
                }
            }
            let mut trailing_pause = 0.0;
            if !run_words.is_empty() {
                runs.push((run_pause, run_words));
            } else {
                trailing_pause = run_pause;
            }

            let total_runs = runs.len();
            for (run_index, (pause, words)) in runs.into_iter().enumerate() {
                pending_pause += pause;
                let chunk_count = words.len().div_ceil(self.max_words);
                for (chunk_index, group) in words.chunks(self.max_words).enumerate() {
                    units.push(TranscriptUnit {
                        text: group.join(" "),
                        is_sentence_start: run_index == 0 && chunk_index == 0,
                        is_sentence_end: run_index + 1 == total_runs && chunk_index + 1 == chunk_count,
                        is_question,
                        leading_pause: pending_pause,
                    });
                    pending_pause = 0.0;
                }
            }
            pending_pause += trailing_pause;
        }

        units
    }
}

/// Sentence slices with their terminators, empty ones removed
fn split_sentences(transcript: &str) -> Vec<&str> {
    SENTENCE_REGEX
        .find_iter(transcript)
        .map(|m| m.as_str().trim())
        .filter(|s| s.chars().any(|c| !matches!(c, '.' | '!' | '?') && !c.is_whitespace()))
        .collect()
}

/// Words and directives of one sentence in order
fn tokenize(sentence: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in DIRECTIVE_REGEX.captures_iter(sentence) {
        let Some(whole) = caps.get(0) else { continue };
        push_words(&mut tokens, &sentence[last..whole.start()]);
        let name = caps
            .get(1)
            .map(|m| m.as_str().trim().replace(' ', "-"))
            .unwrap_or_default();
        tokens.push(Token::Directive(name));
        last = whole.end();
    }
    push_words(&mut tokens, &sentence[last..]);

    tokens
}

fn push_words(tokens: &mut Vec<Token>, text: &str) {
    for word in text.split_whitespace() {
        let after_directive = matches!(tokens.last(), Some(Token::Directive(_)));
        let is_loose_punctuation = word.chars().all(|c| c.is_ascii_punctuation())
            && (after_directive || word.chars().all(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':')));

        if is_loose_punctuation {
            // Punctuation cut loose by a directive or a stray space sticks to the previous word
            let previous = tokens.iter_mut().rev().find_map(|t| match t {
                Token::Word(w) => Some(w),
                Token::Directive(_) => None,
            });
            if let Some(previous) = previous {
                previous.push_str(word);
            }
            continue;
        }
        tokens.push(Token::Word(word.to_string()));
    }
}

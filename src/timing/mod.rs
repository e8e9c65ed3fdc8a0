/*!
 * Subtitle timing core.
 *
 * Text is chunked into transcript units, timed either by forced alignment or
 * by the heuristic timeline, normalized into a strictly sequential cue list
 * and finally nudged toward the pauses found in the audio.
 */

pub mod aligner;
pub mod chunker;
pub mod emissions;
pub mod estimator;
pub mod heuristic;
pub mod normalizer;
pub mod silence;
pub mod strategy;
pub mod validation;

pub use aligner::{ForcedAligner, WordSegment};
pub use chunker::TextChunker;
pub use estimator::DurationEstimator;
pub use heuristic::HeuristicTimeline;
pub use normalizer::SequentialNormalizer;
pub use silence::{SilenceDetector, SilenceRefiner};
pub use strategy::{StrategyChain, TimingOutcome, TimingRequest, TimingSource, TimingStrategy};
pub use validation::{CueValidator, CueValidatorConfig};

/// Tolerance used when comparing cue boundaries
pub const TIME_EPSILON: f64 = 1e-6;

/// A caption-sized piece of transcript text
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptUnit {
    /// Caption text, directives already removed
    pub text: String,
    /// First chunk of its sentence
    pub is_sentence_start: bool,
    /// Last chunk of its sentence
    pub is_sentence_end: bool,
    /// Chunk belongs to a sentence containing `?`
    pub is_question: bool,
    /// Pause contributed by directives right before this unit (seconds)
    pub leading_pause: f64,
}

impl TranscriptUnit {
    pub fn new(text: impl Into<String>, is_sentence_start: bool, is_sentence_end: bool, is_question: bool) -> Self {
        Self {
            text: text.into(),
            is_sentence_start,
            is_sentence_end,
            is_question,
            leading_pause: 0.0,
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// What a cue stands for in the rendered subtitle track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueKind {
    /// Visible caption text
    #[default]
    Spoken,
    /// Invisible timing marker such as the closing breath
    Marker,
    /// Empty cue holding a pause
    Blank,
}

/// A single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct TimingCue {
    pub text: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    pub is_sentence_start: bool,
    pub is_sentence_end: bool,
    pub is_question: bool,
    pub kind: CueKind,
}

impl TimingCue {
    /// Spoken cue carrying the metadata of its transcript unit
    pub fn from_unit(unit: &TranscriptUnit, start_time: f64, end_time: f64) -> Self {
        Self {
            text: unit.text.clone(),
            start_time,
            end_time,
            is_sentence_start: unit.is_sentence_start,
            is_sentence_end: unit.is_sentence_end,
            is_question: unit.is_question,
            kind: CueKind::Spoken,
        }
    }

    /// Spoken cue without sentence metadata
    pub fn spoken(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
            is_sentence_start: false,
            is_sentence_end: false,
            is_question: false,
            kind: CueKind::Spoken,
        }
    }

    /// Non-rendered breath marker
    pub fn marker(start_time: f64, end_time: f64) -> Self {
        Self {
            text: "[breath]".to_string(),
            kind: CueKind::Marker,
            ..Self::spoken("", start_time, end_time)
        }
    }

    /// Empty pause cue
    pub fn blank(start_time: f64, end_time: f64) -> Self {
        Self {
            kind: CueKind::Blank,
            ..Self::spoken("", start_time, end_time)
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_spoken(&self) -> bool {
        self.kind == CueKind::Spoken
    }

    /// Check a cue coming from outside the timing core
    pub fn is_well_formed(&self) -> bool {
        self.start_time.is_finite()
            && self.end_time.is_finite()
            && self.start_time >= 0.0
            && self.end_time > self.start_time
    }
}

/// Ordered cue list, sorted by start time
pub type Timeline = Vec<TimingCue>;

/// A detected pause in the audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

impl SilenceInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Whether every cue has positive length and none overlaps its successor
pub fn is_sequential(cues: &[TimingCue]) -> bool {
    cues.iter().all(|c| c.end_time > c.start_time)
        && cues
            .windows(2)
            .all(|pair| pair[0].end_time <= pair[1].start_time + TIME_EPSILON)
}

/// Spoken caption text of a timeline joined with spaces
pub fn spoken_text(cues: &[TimingCue]) -> String {
    cues.iter()
        .filter(|c| c.is_spoken())
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

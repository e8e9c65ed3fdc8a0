/*!
 * Spoken-duration estimate for a transcript unit.
 */

use crate::app_config::TimingConfig;
use crate::timing::TranscriptUnit;
use crate::voices::VoiceProfile;

/// Average word length the character factor is normalized around
const REFERENCE_WORD_LENGTH: f64 = 5.0;
const MIN_CHAR_FACTOR: f64 = 0.8;
const MAX_CHAR_FACTOR: f64 = 1.6;

/// Duration estimator built from the timing constants
#[derive(Debug, Clone)]
pub struct DurationEstimator {
    long_word_length: usize,
    long_word_penalty: f64,
    question_factor: f64,
    end_sentence_factor: f64,
    min_duration_per_word: f64,
}

impl DurationEstimator {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            long_word_length: timing.long_word_length,
            long_word_penalty: timing.long_word_penalty,
            question_factor: timing.question_factor,
            end_sentence_factor: timing.end_sentence_factor,
            min_duration_per_word: timing.min_duration_per_word,
        }
    }

    /// Estimated spoken duration of `unit` in seconds
    pub fn estimate(&self, unit: &TranscriptUnit, voice: &VoiceProfile) -> f64 {
        let duration = self.raw_estimate(unit, voice);
        duration.max(self.floor(unit, voice))
    }

    /// Estimate before any floor is applied
    pub fn raw_estimate(&self, unit: &TranscriptUnit, voice: &VoiceProfile) -> f64 {
        let word_count = unit.word_count();
        let char_count = unit.text.chars().count();
        let long_words = unit
            .words()
            .filter(|w| w.chars().count() > self.long_word_length)
            .count();

        let base = word_count as f64 / voice.speaking_rate;
        let avg_word_len = char_count as f64 / word_count.max(1) as f64;
        let char_factor = (avg_word_len / REFERENCE_WORD_LENGTH).clamp(MIN_CHAR_FACTOR, MAX_CHAR_FACTOR);

        let mut duration = base * char_factor + long_words as f64 * self.long_word_penalty;
        if unit.is_question {
            duration *= self.question_factor;
        }
        if unit.is_sentence_end {
            duration *= self.end_sentence_factor;
        }
        duration
    }

    /// Content-derived minimum for a unit
    pub fn floor(&self, unit: &TranscriptUnit, voice: &VoiceProfile) -> f64 {
        (unit.word_count() as f64 * self.min_duration_per_word).max(voice.min_cue_duration)
    }
}

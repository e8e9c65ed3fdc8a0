/*!
 * Heuristic timeline: sequential duration estimates rescaled to the audio.
 */

use log::{debug, error};

use crate::app_config::TimingConfig;
use crate::timing::estimator::DurationEstimator;
use crate::timing::{TimingCue, Timeline, TranscriptUnit};
use crate::voices::VoiceProfile;

/// Builds a timeline from transcript units without acoustic information
#[derive(Debug, Clone)]
pub struct HeuristicTimeline {
    estimator: DurationEstimator,
    initial_silence: f64,
    standard_padding: f64,
    sentence_start_pause: f64,
    placeholder_text: String,
}

impl HeuristicTimeline {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            estimator: DurationEstimator::new(timing),
            initial_silence: timing.initial_silence,
            standard_padding: timing.standard_padding,
            sentence_start_pause: timing.sentence_start_pause,
            placeholder_text: timing.placeholder_text.clone(),
        }
    }

    pub fn estimator(&self) -> &DurationEstimator {
        &self.estimator
    }

    /// Provisional cues before rescaling, starting at the head padding
    pub fn provisional(&self, units: &[TranscriptUnit], voice: &VoiceProfile) -> Timeline {
        let mut cues = Vec::with_capacity(units.len());
        let mut current = self.initial_silence;

        for (i, unit) in units.iter().enumerate() {
            if i > 0 && unit.is_sentence_start {
                current += self.sentence_start_pause;
            }
            current += unit.leading_pause;

            let duration = self.estimator.estimate(unit, voice);
            let end = current + duration;
            cues.push(TimingCue::from_unit(unit, current, end));
            current = end + self.standard_padding;
        }

        cues
    }

    /// Timeline whose last cue ends exactly at `audio_duration`
    pub fn build(&self, units: &[TranscriptUnit], voice: &VoiceProfile, audio_duration: f64) -> Timeline {
        let cues = self.provisional(units, voice);

        // Audio shorter than the head padding anchors the rescale at zero
        let anchor = if audio_duration > self.initial_silence {
            self.initial_silence
        } else {
            0.0
        };

        let total_estimated = cues.last().map(|c| c.end_time - anchor).unwrap_or(0.0);
        if total_estimated <= 0.0 {
            error!(
                "No timed transcript units ({} units), emitting placeholder cue over {:.2}s",
                units.len(),
                audio_duration
            );
            return vec![self.placeholder(audio_duration)];
        }

        let scale = (audio_duration - anchor) / total_estimated;
        debug!(
            "Heuristic estimate {:.2}s vs audio {:.2}s, scale {:.3}",
            total_estimated + anchor,
            audio_duration,
            scale
        );

        cues.into_iter()
            .map(|cue| TimingCue {
                start_time: anchor + (cue.start_time - anchor) * scale,
                end_time: anchor + (cue.end_time - anchor) * scale,
                ..cue
            })
            .collect()
    }

    /// Single cue spanning the whole audio
    pub fn placeholder(&self, audio_duration: f64) -> TimingCue {
        TimingCue::spoken(self.placeholder_text.clone(), 0.0, audio_duration)
    }
}

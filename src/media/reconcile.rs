/*!
 * Final duration check of a composited video against its audio track.
 */

use std::path::Path;

use log::{info, warn};

use crate::app_config::VideoConfig;
use crate::errors::MediaError;
use crate::media::MediaTools;

/// What to do with a rendered video
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileDecision {
    /// Within tolerance of the audio
    Accept,
    /// Too long; cut to this many seconds
    Trim(f64),
    /// Too short; cannot be fixed by trimming
    Reject,
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    Accepted { video: f64, audio: f64 },
    Trimmed { from: f64, to: f64 },
}

/// Compares video and audio durations and trims overlong videos
#[derive(Debug, Clone)]
pub struct DurationReconciler {
    tolerance: f64,
    trim_buffer: f64,
}

impl DurationReconciler {
    pub fn new(video: &VideoConfig) -> Self {
        Self {
            tolerance: video.duration_tolerance_secs.max(0.0),
            trim_buffer: video.trim_buffer_secs.max(0.0),
        }
    }

    /// Decide without touching any file
    pub fn decide(&self, video_duration: f64, audio_duration: f64) -> ReconcileDecision {
        let difference = video_duration - audio_duration;
        if difference.abs() <= self.tolerance {
            ReconcileDecision::Accept
        } else if difference > 0.0 {
            ReconcileDecision::Trim(audio_duration + self.trim_buffer)
        } else {
            ReconcileDecision::Reject
        }
    }

    /// Measure `video` and accept, trim, or reject it
    pub async fn reconcile(
        &self,
        tools: &dyn MediaTools,
        video: &Path,
        audio_duration: f64,
    ) -> Result<ReconcileOutcome, MediaError> {
        let video_duration = tools.probe_duration(video).await?;

        match self.decide(video_duration, audio_duration) {
            ReconcileDecision::Accept => {
                info!(
                    "Video duration {:.2}s matches audio {:.2}s",
                    video_duration, audio_duration
                );
                Ok(ReconcileOutcome::Accepted {
                    video: video_duration,
                    audio: audio_duration,
                })
            }
            ReconcileDecision::Trim(target) => {
                warn!(
                    "Video is {:.2}s but audio is {:.2}s, trimming to {:.2}s",
                    video_duration, audio_duration, target
                );
                tools.trim_to_duration(video, target).await?;
                Ok(ReconcileOutcome::Trimmed {
                    from: video_duration,
                    to: target,
                })
            }
            ReconcileDecision::Reject => Err(MediaError::VideoTooShort {
                video: video_duration,
                audio: audio_duration,
            }),
        }
    }
}

/*!
 * Energy-based silence detection and silence-aware cue refinement.
 */

use std::path::Path;

use anyhow::Result;
use log::debug;

use crate::app_config::SilenceConfig;
use crate::media::wav::read_mono_samples;
use crate::timing::{SilenceInterval, TimingCue, Timeline, TIME_EPSILON};

/// Finds quiet stretches in mono audio by windowed RMS level
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    threshold_db: f64,
    window_ms: u32,
}

impl SilenceDetector {
    pub fn new(config: &SilenceConfig) -> Self {
        Self {
            threshold_db: config.threshold_db,
            window_ms: config.window_ms.max(1),
        }
    }

    /// Silent intervals in `samples` (normalized to [-1, 1])
    pub fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<SilenceInterval> {
        let window = ((sample_rate as u64 * self.window_ms as u64) / 1000).max(1) as usize;
        let seconds = |index: usize| index as f64 / sample_rate.max(1) as f64;

        let mut intervals = Vec::new();
        let mut silence_start: Option<usize> = None;

        for (i, frame) in samples.chunks(window).enumerate() {
            let offset = i * window;
            if rms_db(frame) < self.threshold_db {
                silence_start.get_or_insert(offset);
            } else if let Some(start) = silence_start.take() {
                intervals.push(SilenceInterval::new(seconds(start), seconds(offset)));
            }
        }
        if let Some(start) = silence_start {
            intervals.push(SilenceInterval::new(seconds(start), seconds(samples.len())));
        }

        intervals
    }

    /// Silent intervals of a WAV file
    pub fn detect_file(&self, path: &Path) -> Result<Vec<SilenceInterval>> {
        let (samples, sample_rate) = read_mono_samples(path)?;
        let intervals = self.detect(&samples, sample_rate);
        debug!("Found {} silent stretches in {}", intervals.len(), path.display());
        Ok(intervals)
    }
}

/// RMS level of a window in dBFS
fn rms_db(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return f64::NEG_INFINITY;
    }
    let mean_square = frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / frame.len() as f64;
    if mean_square <= 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * mean_square.log10()
    }
}

/// Moves cue boundaries toward significant pauses
#[derive(Debug, Clone)]
pub struct SilenceRefiner {
    min_silence: f64,
    clip_buffer: f64,
    resume_buffer: f64,
    resume_window: f64,
}

impl SilenceRefiner {
    pub fn new(config: &SilenceConfig) -> Self {
        Self {
            min_silence: config.min_silence,
            clip_buffer: config.clip_buffer,
            resume_buffer: config.resume_buffer,
            resume_window: config.resume_window,
        }
    }

    /// Refine a normalized timeline.
    ///
    /// Starts only move later and ends only move earlier, each within the
    /// cue's own span, so a sequential timeline stays sequential.
    pub fn refine(&self, cues: &[TimingCue], silences: &[SilenceInterval], audio_duration: f64) -> Timeline {
        let significant: Vec<&SilenceInterval> = silences
            .iter()
            .filter(|s| s.duration() > self.min_silence && s.start < audio_duration)
            .collect();

        let mut refined = cues.to_vec();
        let mut clipped = 0;
        let mut delayed = 0;

        for i in 0..refined.len() {
            if !refined[i].is_spoken() {
                continue;
            }

            if i > 0 {
                // Captions resume after the pause, not during it
                let cue = &refined[i];
                let resume = significant
                    .iter()
                    .filter(|s| s.end > cue.start_time && s.end - cue.start_time <= self.resume_window)
                    .map(|s| s.end + self.resume_buffer)
                    .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));
                if let Some(new_start) = resume {
                    if new_start < refined[i].end_time - TIME_EPSILON {
                        refined[i].start_time = new_start;
                        delayed += 1;
                    }
                }
            }

            // Captions do not bleed into a pause
            let cue = &refined[i];
            let clip = significant
                .iter()
                .filter(|s| s.start > cue.start_time && s.start < cue.end_time)
                .map(|s| s.start - self.clip_buffer)
                .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.min(t))));
            if let Some(new_end) = clip {
                if new_end > refined[i].start_time + TIME_EPSILON {
                    refined[i].end_time = new_end;
                    clipped += 1;
                }
            }
        }

        debug!(
            "Silence refinement: {} significant pauses, {} cue ends clipped, {} cue starts delayed",
            significant.len(),
            clipped,
            delayed
        );
        refined
    }
}

/*!
 * Audio/video collaborators.
 *
 * - `wav`: PCM WAV decoding for alignment and silence detection
 * - `ffmpeg`: ffmpeg/ffprobe subprocess wrappers
 * - `reconcile`: final video duration check and trim
 */

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::MediaError;

pub mod ffmpeg;
pub mod reconcile;
pub mod wav;

pub use ffmpeg::FfmpegTools;
pub use reconcile::{DurationReconciler, ReconcileDecision, ReconcileOutcome};

/// Operations the pipeline needs from an audio/video toolchain
#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError>;

    /// Convert speech audio to mono 16 kHz PCM WAV with the lead-in silence prepended
    async fn convert_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError>;

    /// Produce a vertical background clip at least `target` seconds long in `work_dir`
    async fn prepare_background(&self, background: &Path, target: f64, work_dir: &Path) -> Result<PathBuf, MediaError>;

    /// Burn `subtitles` into `video`, attach `audio`, write `output`
    async fn composite(&self, video: &Path, subtitles: &Path, audio: &Path, output: &Path) -> Result<(), MediaError>;

    /// Cut `video` down to `duration` seconds in place
    async fn trim_to_duration(&self, video: &Path, duration: f64) -> Result<(), MediaError>;
}

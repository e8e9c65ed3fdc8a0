/*!
 * # reelsync - narrated short videos with synced subtitles
 *
 * A Rust library that turns a text into a narrated, subtitled vertical video,
 * once per voice.
 *
 * ## Features
 *
 * - Script generation in a voice's persona (OpenAI-compatible or Anthropic chat APIs)
 * - Speech synthesis through Fish Audio
 * - Subtitle timing from a transcript and its audio:
 *   - CTC forced alignment against an external emission model
 *   - Heuristic timeline from per-voice pacing profiles as a fallback
 *   - Sequential normalization and silence-based refinement
 * - ASS subtitle writing with per-cue styling, SRT export
 * - Background preparation, compositing and duration reconciliation with ffmpeg
 * - Independent concurrent pipelines for several voices
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `voices`: Voice pacing profiles and the voice registry
 * - `timing`: The offline timing core:
 *   - `timing::chunker`: Transcript chunking into caption units
 *   - `timing::estimator`: Per-unit duration estimates
 *   - `timing::heuristic`: Heuristic timeline
 *   - `timing::aligner`: CTC forced alignment
 *   - `timing::emissions`: Emission model backends
 *   - `timing::strategy`: Ordered timing strategies with fallback
 *   - `timing::normalizer`: Sequential normalization
 *   - `timing::silence`: Silence detection and refinement
 *   - `timing::validation`: Cue list validation
 * - `subtitle_processor`: ASS/SRT subtitle files
 * - `media`: ffmpeg/ffprobe tooling, WAV access, duration reconciliation
 * - `providers`: Client implementations for the chat and TTS APIs
 * - `generation`: Text and speech collaborators
 * - `file_utils`: File system operations and run layout
 * - `pipeline`: One voice's sequential pipeline
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod generation;
pub mod media;
pub mod pipeline;
pub mod providers;
pub mod subtitle_processor;
pub mod timing;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunReport};
pub use errors::{AlignmentError, MediaError, PipelineError, ProviderError, Stage};
pub use pipeline::{Collaborators, TimingEngine, VoicePipeline};
pub use subtitle_processor::{SubtitleEntry, SubtitleFileWriter};
pub use timing::{TimingCue, TranscriptUnit};
pub use voices::{VoiceProfile, VoiceRegistry};

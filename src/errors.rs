/*!
 * Error types for the reelsync pipeline.
 *
 * Collaborator and stage failures that callers need to tell apart are
 * modelled with thiserror enums; everything else travels as `anyhow::Error`.
 */

use std::fmt;

use thiserror::Error;

/// Errors that can occur when talking to a remote provider (LLM or TTS)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but produced nothing usable
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::EmptyResponse => false,
        }
    }

    /// Map an HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Reasons the forced-alignment path gives up.
///
/// None of these are fatal to a run: the strategy chain moves on to the
/// heuristic timeline whenever one is returned.
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// No emission backend configured, or it could not be reached/loaded
    #[error("Alignment model unavailable: {0}")]
    ModelUnavailable(String),

    /// Emission matrix is malformed (ragged rows, unknown blank, no labels)
    #[error("Invalid emission data: {0}")]
    InvalidEmissions(String),

    /// The transcript contains no token the model knows
    #[error("Transcript has no alignable tokens")]
    EmptyTranscript,

    /// Not enough frames to place every token
    #[error("Degenerate trellis: {frames} frames for {tokens} tokens")]
    DegenerateTrellis { frames: usize, tokens: usize },

    /// Backtracking did not reach the first token
    #[error("Backtracking produced an empty or incomplete path")]
    EmptyPath,

    /// Aligned words do not line up with the transcript words
    #[error("Aligned {aligned} words but transcript has {expected}")]
    WordCountMismatch { aligned: usize, expected: usize },

    /// The whole attempt exceeded its deadline
    #[error("Alignment timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

/// Errors from ffmpeg/ffprobe and audio decoding
#[derive(Error, Debug)]
pub enum MediaError {
    /// External tool exited unsuccessfully or could not be spawned
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// External tool did not finish in time
    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    /// A probed duration could not be parsed or is not positive
    #[error("Invalid media duration: {0}")]
    InvalidDuration(String),

    /// WAV file could not be decoded
    #[error("Failed to decode WAV audio: {0}")]
    WavDecode(String),

    /// The rendered video is shorter than its audio track
    #[error("Video ({video:.2}s) is shorter than audio ({audio:.2}s) beyond tolerance")]
    VideoTooShort { video: f64, audio: f64 },
}

/// Pipeline stage, used to report where a voice run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generate,
    Clean,
    Synthesize,
    ConvertAudio,
    Timing,
    Subtitles,
    PrepareVideo,
    Composite,
    Reconcile,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 9] = [
        Stage::Generate,
        Stage::Clean,
        Stage::Synthesize,
        Stage::ConvertAudio,
        Stage::Timing,
        Stage::Subtitles,
        Stage::PrepareVideo,
        Stage::Composite,
        Stage::Reconcile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Clean => "clean",
            Stage::Synthesize => "synthesize",
            Stage::ConvertAudio => "convert-audio",
            Stage::Timing => "timing",
            Stage::Subtitles => "subtitles",
            Stage::PrepareVideo => "prepare-video",
            Stage::Composite => "composite",
            Stage::Reconcile => "reconcile",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed voice run: which stage, which voice, and why
#[derive(Error, Debug)]
#[error("stage '{stage}' failed for voice '{voice}': {cause:#}")]
pub struct PipelineError {
    pub stage: Stage,
    pub voice: String,
    pub cause: anyhow::Error,
}

impl PipelineError {
    pub fn new(stage: Stage, voice: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            voice: voice.into(),
            cause: cause.into(),
        }
    }
}

/// Attach stage/voice information to a fallible stage result
pub trait StageContext<T> {
    fn stage(self, stage: Stage, voice: &str) -> Result<T, PipelineError>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn stage(self, stage: Stage, voice: &str) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, voice, e))
    }
}

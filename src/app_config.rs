use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::path::PathBuf;

use crate::voices::{builtin_voices, VoiceProfile, VoiceRegistry};

/// Application configuration module
/// This module handles loading, defaulting and validating the settings
/// of every pipeline stage.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Heuristic timing constants
    #[serde(default)]
    pub timing: TimingConfig,

    /// Sequential normalizer settings
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Silence detection and refinement
    #[serde(default)]
    pub silence: SilenceConfig,

    /// Forced alignment backend
    #[serde(default)]
    pub aligner: AlignerConfig,

    /// Per-voice profiles
    #[serde(default = "builtin_voices")]
    pub voices: BTreeMap<String, VoiceProfile>,

    /// Profile used for voices without an entry in `voices`
    #[serde(default)]
    pub default_voice: VoiceProfile,

    /// LLM text generator
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Speech synthesis
    #[serde(default)]
    pub tts: TtsConfig,

    /// Video rendering
    #[serde(default)]
    pub video: VideoConfig,

    /// Caption style written into the subtitle file
    #[serde(default)]
    pub subtitle_style: SubtitleStyle,

    /// Output layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Constants driving chunking, duration estimation and the heuristic timeline
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimingConfig {
    /// Head padding before the first cue (seconds)
    #[serde(default = "default_initial_silence")]
    pub initial_silence: f64,

    /// Padding after every cue (seconds)
    #[serde(default = "default_standard_padding")]
    pub standard_padding: f64,

    /// Extra pause before a chunk that starts a new sentence (seconds)
    #[serde(default = "default_sentence_start_pause")]
    pub sentence_start_pause: f64,

    /// Maximum words per caption chunk
    #[serde(default = "default_max_words_per_chunk")]
    pub max_words_per_chunk: usize,

    /// Words longer than this many characters count as long
    #[serde(default = "default_long_word_length")]
    pub long_word_length: usize,

    /// Extra seconds per long word
    #[serde(default = "default_long_word_penalty")]
    pub long_word_penalty: f64,

    /// Multiplier for question chunks
    #[serde(default = "default_question_factor")]
    pub question_factor: f64,

    /// Multiplier for sentence-final chunks
    #[serde(default = "default_end_sentence_factor")]
    pub end_sentence_factor: f64,

    /// Floor per spoken word (seconds)
    #[serde(default = "default_min_duration_per_word")]
    pub min_duration_per_word: f64,

    /// Caption text used when nothing can be timed
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,

    /// Pause contributed by each known bracketed directive (seconds)
    #[serde(default = "default_directive_pauses")]
    pub directive_pauses: BTreeMap<String, f64>,

    /// Pause for bracketed directives not listed above (seconds)
    #[serde(default = "default_directive_pause")]
    pub default_directive_pause: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            initial_silence: default_initial_silence(),
            standard_padding: default_standard_padding(),
            sentence_start_pause: default_sentence_start_pause(),
            max_words_per_chunk: default_max_words_per_chunk(),
            long_word_length: default_long_word_length(),
            long_word_penalty: default_long_word_penalty(),
            question_factor: default_question_factor(),
            end_sentence_factor: default_end_sentence_factor(),
            min_duration_per_word: default_min_duration_per_word(),
            placeholder_text: default_placeholder_text(),
            directive_pauses: default_directive_pauses(),
            default_directive_pause: default_directive_pause(),
        }
    }
}

impl TimingConfig {
    /// Pause for a directive name such as `break` or `long-break`
    pub fn directive_pause(&self, name: &str) -> f64 {
        self.directive_pauses
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(self.default_directive_pause)
    }
}

/// Settings for the sequential normalizer
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NormalizerConfig {
    /// Cues with more words than this are re-chunked
    #[serde(default = "default_rechunk_word_threshold")]
    pub rechunk_word_threshold: usize,

    /// Chunk size for questions and long-word-heavy text
    #[serde(default = "default_small_chunk_size")]
    pub small_chunk_size: usize,

    /// Chunk size for everything else
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    /// Words longer than this many characters count as long here
    #[serde(default = "default_normalizer_long_word_length")]
    pub long_word_length: usize,

    /// Fixed part of the preview buffer (seconds)
    #[serde(default = "default_preview_base")]
    pub preview_base: f64,

    /// Complexity-scaled part of the preview buffer (seconds)
    #[serde(default = "default_preview_scale")]
    pub preview_scale: f64,

    /// Display-time multiplier for questions
    #[serde(default = "default_question_duration_factor")]
    pub question_duration_factor: f64,

    /// Display-time multiplier for chunks with long words
    #[serde(default = "default_long_word_duration_factor")]
    pub long_word_duration_factor: f64,

    /// Smallest gap inserted when resolving an overlap (seconds)
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,

    /// Largest gap inserted when resolving an overlap (seconds)
    #[serde(default = "default_max_gap")]
    pub max_gap: f64,

    /// Phrases that earn the final cue a longer closing pause
    #[serde(default = "default_call_to_action_phrases")]
    pub call_to_action_phrases: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            rechunk_word_threshold: default_rechunk_word_threshold(),
            small_chunk_size: default_small_chunk_size(),
            default_chunk_size: default_chunk_size(),
            long_word_length: default_normalizer_long_word_length(),
            preview_base: default_preview_base(),
            preview_scale: default_preview_scale(),
            question_duration_factor: default_question_duration_factor(),
            long_word_duration_factor: default_long_word_duration_factor(),
            min_gap: default_min_gap(),
            max_gap: default_max_gap(),
            call_to_action_phrases: default_call_to_action_phrases(),
        }
    }
}

/// Silence detection and refinement settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SilenceConfig {
    /// Whether to run the silence refiner at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// RMS level in dBFS below which a window counts as silent
    #[serde(default = "default_threshold_db")]
    pub threshold_db: f64,

    /// Only pauses longer than this are used (seconds)
    #[serde(default = "default_min_silence")]
    pub min_silence: f64,

    /// Analysis window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u32,

    /// Distance kept between a clipped cue end and the pause (seconds)
    #[serde(default = "default_silence_buffer")]
    pub clip_buffer: f64,

    /// Delay after a pause before the next cue resumes (seconds)
    #[serde(default = "default_silence_buffer")]
    pub resume_buffer: f64,

    /// How far past a cue start a pause may end and still delay it (seconds)
    #[serde(default = "default_resume_window")]
    pub resume_window: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_db: default_threshold_db(),
            min_silence: default_min_silence(),
            window_ms: default_window_ms(),
            clip_buffer: default_silence_buffer(),
            resume_buffer: default_silence_buffer(),
            resume_window: default_resume_window(),
        }
    }
}

/// Where emission probabilities for forced alignment come from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignerBackend {
    // @backend: Heuristic timing only
    #[default]
    Disabled,
    // @backend: HTTP alignment service
    Service,
    // @backend: External inference command
    Command,
}

impl std::fmt::Display for AlignerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::Service => "service",
            Self::Command => "command",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for AlignerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disabled" | "none" => Ok(Self::Disabled),
            "service" => Ok(Self::Service),
            "command" => Ok(Self::Command),
            _ => Err(anyhow!("Invalid aligner backend: {}", s)),
        }
    }
}

/// Forced alignment settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignerConfig {
    #[serde(default)]
    pub backend: AlignerBackend,

    /// Service URL for the `service` backend
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Program for the `command` backend
    #[serde(default = "String::new")]
    pub command: String,

    /// Extra arguments passed before the WAV path
    #[serde(default)]
    pub args: Vec<String>,

    /// Wall-clock budget for a whole alignment attempt, model loading included
    #[serde(default = "default_aligner_timeout_secs")]
    pub timeout_secs: u64,

    /// Longest phrase built from aligned words (seconds)
    #[serde(default = "default_max_phrase_duration")]
    pub max_phrase_duration: f64,

    /// Most words in a phrase built from aligned words
    #[serde(default = "default_max_phrase_words")]
    pub max_phrase_words: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            backend: AlignerBackend::default(),
            endpoint: String::new(),
            command: String::new(),
            args: Vec::new(),
            timeout_secs: default_aligner_timeout_secs(),
            max_phrase_duration: default_max_phrase_duration(),
            max_phrase_words: default_max_phrase_words(),
        }
    }
}

/// LLM provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorProvider {
    // @provider: OpenAI and compatible servers
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
}

impl GeneratorProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for GeneratorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for GeneratorProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Text generator settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: GeneratorProvider,

    // @field: Model name, empty means the provider default
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key, falls back to the provider's environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL, empty means the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_generator_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System prompt template, `{persona}` is replaced with the voice persona
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Whether the generated script may contain directives like `(break)`
    #[serde(default = "default_true")]
    pub use_effects: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_generator_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_generator_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            use_effects: true,
        }
    }
}

impl GeneratorConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider {
            GeneratorProvider::OpenAI => default_openai_model(),
            GeneratorProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            GeneratorProvider::OpenAI => default_openai_endpoint(),
            GeneratorProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the API key from config or environment
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(self.provider.api_key_env()).unwrap_or_default()
    }
}

/// Speech synthesis settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TtsConfig {
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,

    // @field: API key, falls back to FISH_API_KEY
    #[serde(default = "String::new")]
    pub api_key: String,

    #[serde(default = "default_tts_model")]
    pub model: String,

    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate: u32,

    #[serde(default = "default_chunk_length")]
    pub chunk_length: u32,

    #[serde(default = "default_latency")]
    pub latency: String,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_tts_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Timeout of the first attempt, later attempts get multiples of it
    #[serde(default = "default_tts_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            api_key: String::new(),
            model: default_tts_model(),
            mp3_bitrate: default_mp3_bitrate(),
            chunk_length: default_chunk_length(),
            latency: default_latency(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_tts_backoff_ms(),
            timeout_secs: default_tts_timeout_secs(),
        }
    }
}

impl TtsConfig {
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("FISH_API_KEY").unwrap_or_default()
    }
}

/// Video rendering settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Silence prepended to the converted audio (milliseconds)
    #[serde(default = "default_lead_in_silence_ms")]
    pub lead_in_silence_ms: u64,

    /// Accepted difference between final video and audio (seconds)
    #[serde(default = "default_duration_tolerance_secs")]
    pub duration_tolerance_secs: f64,

    /// Tail kept after the audio when trimming an overlong video (seconds)
    #[serde(default = "default_trim_buffer_secs")]
    pub trim_buffer_secs: f64,

    /// Timeout for a single ffmpeg invocation
    #[serde(default = "default_ffmpeg_timeout_secs")]
    pub ffmpeg_timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            preset: default_preset(),
            crf: default_crf(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            lead_in_silence_ms: default_lead_in_silence_ms(),
            duration_tolerance_secs: default_duration_tolerance_secs(),
            trim_buffer_secs: default_trim_buffer_secs(),
            ffmpeg_timeout_secs: default_ffmpeg_timeout_secs(),
        }
    }
}

/// Caption style written into the `[V4+ Styles]` section
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleStyle {
    #[serde(default = "default_font_name")]
    pub font_name: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    pub secondary_color: String,
    #[serde(default = "default_outline_color")]
    pub outline_color: String,
    #[serde(default = "default_back_color")]
    pub back_color: String,
    #[serde(default = "default_true")]
    pub bold: bool,
    #[serde(default = "default_border_style")]
    pub border_style: u32,
    #[serde(default = "default_outline")]
    pub outline: f64,
    #[serde(default)]
    pub shadow: f64,
    /// Numpad-style alignment, 2 is bottom centre
    #[serde(default = "default_alignment")]
    pub alignment: u32,
    #[serde(default = "default_margin_h")]
    pub margin_l: u32,
    #[serde(default = "default_margin_h")]
    pub margin_r: u32,
    #[serde(default = "default_margin_v")]
    pub margin_v: u32,
    #[serde(default = "default_blur")]
    pub blur: f64,
    /// 0.0 is opaque, 1.0 fully transparent
    #[serde(default)]
    pub bg_opacity: f64,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            font_size: default_font_size(),
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            outline_color: default_outline_color(),
            back_color: default_back_color(),
            bold: true,
            border_style: default_border_style(),
            outline: default_outline(),
            shadow: 0.0,
            alignment: default_alignment(),
            margin_l: default_margin_h(),
            margin_r: default_margin_h(),
            margin_v: default_margin_v(),
            blur: default_blur(),
            bg_opacity: 0.0,
        }
    }
}

/// Where run artifacts go
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,

    /// Keep `temp_*` intermediates after a successful run
    #[serde(default)]
    pub keep_temp_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            keep_temp_files: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_initial_silence() -> f64 {
    0.7
}

fn default_standard_padding() -> f64 {
    0.25
}

fn default_sentence_start_pause() -> f64 {
    0.5
}

fn default_max_words_per_chunk() -> usize {
    3
}

fn default_long_word_length() -> usize {
    6
}

fn default_long_word_penalty() -> f64 {
    0.18
}

fn default_question_factor() -> f64 {
    1.25
}

fn default_end_sentence_factor() -> f64 {
    1.2
}

fn default_min_duration_per_word() -> f64 {
    0.35
}

fn default_placeholder_text() -> String {
    "No subtitle data available".to_string()
}

fn default_directive_pauses() -> BTreeMap<String, f64> {
    [
        ("break", 0.5),
        ("long-break", 1.0),
        ("breath", 0.3),
        ("laugh", 0.6),
        ("sigh", 0.6),
        ("cough", 0.4),
        ("lip-smacking", 0.3),
        ("burp", 0.4),
    ]
    .into_iter()
    .map(|(name, pause)| (name.to_string(), pause))
    .collect()
}

fn default_directive_pause() -> f64 {
    0.25
}

fn default_rechunk_word_threshold() -> usize {
    4
}

fn default_small_chunk_size() -> usize {
    2
}

fn default_chunk_size() -> usize {
    3
}

fn default_normalizer_long_word_length() -> usize {
    8
}

fn default_preview_base() -> f64 {
    0.3
}

fn default_preview_scale() -> f64 {
    0.15
}

fn default_question_duration_factor() -> f64 {
    1.2
}

fn default_long_word_duration_factor() -> f64 {
    1.15
}

fn default_min_gap() -> f64 {
    0.05
}

fn default_max_gap() -> f64 {
    0.15
}

fn default_call_to_action_phrases() -> Vec<String> {
    vec!["subscribe".to_string()]
}

fn default_threshold_db() -> f64 {
    -40.0
}

fn default_min_silence() -> f64 {
    0.3
}

fn default_window_ms() -> u32 {
    20
}

fn default_silence_buffer() -> f64 {
    0.1
}

fn default_resume_window() -> f64 {
    0.5
}

fn default_aligner_timeout_secs() -> u64 {
    120
}

fn default_max_phrase_duration() -> f64 {
    2.5
}

fn default_max_phrase_words() -> usize {
    4
}

fn default_generator_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_generator_backoff_ms() -> u64 {
    2000
}

fn default_tts_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_system_prompt() -> String {
    "You rewrite the text you are given as a short, spoken monologue by {persona}. Keep it under 150 words, use plain sentences, and do not add stage directions other than (break), (long-break) or (laugh).".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_tts_endpoint() -> String {
    "https://api.fish.audio/v1/tts".to_string()
}

fn default_tts_model() -> String {
    "speech-1.6".to_string()
}

fn default_mp3_bitrate() -> u32 {
    192
}

fn default_chunk_length() -> u32 {
    200
}

fn default_latency() -> String {
    "normal".to_string()
}

fn default_tts_timeout_secs() -> u64 {
    60
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_lead_in_silence_ms() -> u64 {
    300
}

fn default_duration_tolerance_secs() -> f64 {
    3.0
}

fn default_trim_buffer_secs() -> f64 {
    1.0
}

fn default_ffmpeg_timeout_secs() -> u64 {
    600
}

fn default_font_name() -> String {
    "Arial".to_string()
}

fn default_font_size() -> u32 {
    72
}

fn default_primary_color() -> String {
    "&H00FFFFFF".to_string()
}

fn default_secondary_color() -> String {
    "&H000000FF".to_string()
}

fn default_outline_color() -> String {
    "&H00000000".to_string()
}

fn default_back_color() -> String {
    "&H80000000".to_string()
}

fn default_border_style() -> u32 {
    1
}

fn default_outline() -> f64 {
    2.5
}

fn default_alignment() -> u32 {
    2
}

fn default_margin_h() -> u32 {
    20
}

fn default_margin_v() -> u32 {
    50
}

fn default_blur() -> f64 {
    0.6
}

fn default_output_root() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Build the immutable voice registry from this configuration
    pub fn voice_registry(&self) -> VoiceRegistry {
        VoiceRegistry::new(&self.voices, self.default_voice.clone())
    }

    /// Validate the timing core settings (everything the offline path needs)
    pub fn validate_timing(&self) -> Result<()> {
        let t = &self.timing;
        if t.max_words_per_chunk == 0 {
            return Err(anyhow!("timing.max_words_per_chunk must be at least 1"));
        }
        for (name, value) in [
            ("timing.initial_silence", t.initial_silence),
            ("timing.standard_padding", t.standard_padding),
            ("timing.sentence_start_pause", t.sentence_start_pause),
            ("timing.long_word_penalty", t.long_word_penalty),
            ("timing.min_duration_per_word", t.min_duration_per_word),
            ("timing.default_directive_pause", t.default_directive_pause),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be a non-negative number, got {}", name, value));
            }
        }
        if t.question_factor < 1.0 || t.end_sentence_factor < 1.0 {
            return Err(anyhow!("timing question/end-sentence factors must be >= 1.0"));
        }
        if let Some((name, pause)) = t.directive_pauses.iter().find(|(_, p)| **p < 0.0) {
            return Err(anyhow!("Directive pause for '{}' is negative: {}", name, pause));
        }

        let n = &self.normalizer;
        if n.small_chunk_size == 0 || n.default_chunk_size == 0 {
            return Err(anyhow!("normalizer chunk sizes must be at least 1"));
        }
        if n.min_gap < 0.0 || n.max_gap < n.min_gap {
            return Err(anyhow!(
                "normalizer gap range is invalid: min {} max {}",
                n.min_gap,
                n.max_gap
            ));
        }
        if n.question_duration_factor < 1.0 || n.long_word_duration_factor < 1.0 {
            return Err(anyhow!("normalizer duration factors must be >= 1.0"));
        }

        if self.silence.window_ms == 0 {
            return Err(anyhow!("silence.window_ms must be at least 1"));
        }
        if self.silence.threshold_db >= 0.0 {
            return Err(anyhow!("silence.threshold_db must be negative (dBFS)"));
        }

        for (name, profile) in self
            .voices
            .iter()
            .chain(std::iter::once((&"default_voice".to_string(), &self.default_voice)))
        {
            if !(profile.speaking_rate > 0.0) {
                return Err(anyhow!("Voice '{}' has a non-positive speaking rate", name));
            }
            if profile.min_cue_duration <= 0.0 {
                return Err(anyhow!("Voice '{}' needs a positive min_cue_duration", name));
            }
            if profile.breath_duration <= 0.0 || profile.end_pause <= 0.0 {
                return Err(anyhow!("Voice '{}' needs positive breath and end pauses", name));
            }
        }

        match self.aligner.backend {
            AlignerBackend::Service => {
                url::Url::parse(&self.aligner.endpoint)
                    .map_err(|e| anyhow!("aligner.endpoint is not a valid URL: {}", e))?;
            }
            AlignerBackend::Command => {
                if self.aligner.command.trim().is_empty() {
                    return Err(anyhow!("aligner.command is required for the command backend"));
                }
            }
            AlignerBackend::Disabled => {}
        }
        if self.aligner.backend != AlignerBackend::Disabled && self.aligner.timeout_secs == 0 {
            return Err(anyhow!("aligner.timeout_secs must be positive"));
        }

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.validate_timing()?;

        url::Url::parse(&self.generator.get_endpoint())
            .map_err(|e| anyhow!("generator endpoint is not a valid URL: {}", e))?;
        url::Url::parse(&self.tts.endpoint)
            .map_err(|e| anyhow!("tts.endpoint is not a valid URL: {}", e))?;

        if self.video.duration_tolerance_secs < 0.0 || self.video.trim_buffer_secs < 0.0 {
            return Err(anyhow!("video tolerances must be non-negative"));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(anyhow!("video dimensions must be positive"));
        }

        Ok(())
    }

    /// Validate that the remote collaborators have credentials
    pub fn validate_credentials(&self) -> Result<()> {
        if self.generator.get_api_key().is_empty() {
            return Err(anyhow!(
                "{} API key is required (config generator.api_key or {})",
                self.generator.provider.display_name(),
                self.generator.provider.api_key_env()
            ));
        }
        if self.tts.get_api_key().is_empty() {
            return Err(anyhow!("TTS API key is required (config tts.api_key or FISH_API_KEY)"));
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            timing: TimingConfig::default(),
            normalizer: NormalizerConfig::default(),
            silence: SilenceConfig::default(),
            aligner: AlignerConfig::default(),
            voices: builtin_voices(),
            default_voice: VoiceProfile::default(),
            generator: GeneratorConfig::default(),
            tts: TtsConfig::default(),
            video: VideoConfig::default(),
            subtitle_style: SubtitleStyle::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

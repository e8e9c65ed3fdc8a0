use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{PipelineError, Stage};
use crate::file_utils::RunArtifacts;
use crate::generation::{ChatGenerator, FishSpeechSynthesizer};
use crate::media::FfmpegTools;
use crate::pipeline::{Collaborators, TimingEngine, VoiceOutcome, VoicePipeline};
use crate::voices::VoiceRegistry;

// @module: Application controller running one pipeline per voice

static VOICE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap());

/// Result of one voice's pipeline
pub type VoiceResult = Result<VoiceOutcome, PipelineError>;

/// Per-voice results of a multi-voice run, in the order the voices were requested
#[derive(Debug)]
pub struct RunReport {
    // @field: Shared run timestamp
    pub started: DateTime<Local>,
    // @field: (voice, result) pairs
    pub results: Vec<(String, VoiceResult)>,
    // @field: Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &VoiceOutcome> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PipelineError> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    /// One-line summary for the end of a run
    pub fn summary(&self) -> String {
        format!(
            "Run completed: {} succeeded, {} failed in {}",
            self.succeeded().count(),
            self.failed().count(),
            format_duration(self.elapsed)
        )
    }
}

/// Main application controller for multi-voice runs
pub struct Controller {
    // @field: App configuration, shared read-only with every pipeline
    config: Arc<Config>,
    // @field: Voice profiles, built once from the configuration
    voices: VoiceRegistry,
    // @field: Text, speech and media collaborators
    collaborators: Collaborators,
    // @field: Background video file or directory
    background: PathBuf,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller with the provider-backed collaborators from `config`
    pub fn with_config(config: Config, background: PathBuf) -> Result<Self> {
        let collaborators = Collaborators {
            generator: Arc::new(ChatGenerator::from_config(&config.generator)),
            synthesizer: Arc::new(FishSpeechSynthesizer::from_config(&config.tts)),
            media: Arc::new(FfmpegTools::new(&config.video)),
        };
        Ok(Self::new(config, collaborators, background))
    }

    /// Create a controller with explicit collaborators
    pub fn new(config: Config, collaborators: Collaborators, background: PathBuf) -> Self {
        Self {
            voices: config.voice_registry(),
            config: Arc::new(config),
            collaborators,
            background,
            show_progress: true,
        }
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    /// Render `source` in every voice of `voices` concurrently.
    ///
    /// Each voice runs in its own task and writes only to its own directory.
    /// A failed voice is reported in the `RunReport` and never stops the others.
    pub async fn run(&self, source: &str, voices: &[String]) -> Result<RunReport> {
        let voices = self.check_voices(voices)?;
        if source.trim().is_empty() {
            return Err(anyhow!("Source text is empty"));
        }

        let start_time = Instant::now();
        let started = Local::now();
        let source: Arc<str> = Arc::from(source);

        let multi_progress = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        info!("Starting run for {} voice(s): {}", voices.len(), voices.join(", "));

        let mut bars = Vec::with_capacity(voices.len());
        let mut handles = Vec::with_capacity(voices.len());
        for voice in &voices {
            let bar = multi_progress.add(ProgressBar::new(Stage::ALL.len() as u64));
            bar.set_style(Self::stage_style());
            bar.set_message(format!("{}: waiting", voice));

            let artifacts = RunArtifacts::new(&self.config.output.root, &started, voice);
            let pipeline = VoicePipeline::new(
                voice.clone(),
                &self.voices,
                Arc::clone(&self.config),
                self.collaborators.clone(),
                TimingEngine::from_config(&self.config),
                self.background.clone(),
            )
            .with_progress(bar.clone());
            let source = Arc::clone(&source);

            let handle = tokio::spawn(async move { pipeline.run(&source, &artifacts).await });
            bars.push(bar);
            handles.push(handle);
        }

        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        for ((voice, bar), joined) in voices.into_iter().zip(bars).zip(joined) {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    // Position counts finished stages, so it points at the one that was running
                    let position = (bar.position() as usize).min(Stage::ALL.len() - 1);
                    bar.abandon_with_message(format!("{}: aborted", voice));
                    Err(PipelineError::new(
                        Stage::ALL[position],
                        voice.as_str(),
                        anyhow!("Voice task aborted: {}", e),
                    ))
                }
            };

            match &result {
                Ok(outcome) => info!(
                    "[{}] {} ({} cues, {} timing)",
                    voice,
                    outcome.artifacts.final_video.display(),
                    outcome.cue_count,
                    outcome.timing_source
                ),
                Err(e) => error!("{}", e),
            }
            results.push((voice, result));
        }

        let report = RunReport {
            started,
            results,
            elapsed: start_time.elapsed(),
        };
        info!("{}", report.summary());
        Ok(report)
    }

    /// Deduplicate the requested voices and reject names unfit for a directory
    fn check_voices(&self, voices: &[String]) -> Result<Vec<String>> {
        let mut checked: Vec<String> = Vec::with_capacity(voices.len());

        for voice in voices {
            let voice = voice.trim();
            if !VOICE_NAME_REGEX.is_match(voice) {
                return Err(anyhow!("Invalid voice name: {:?}", voice));
            }
            if checked.iter().any(|v| v == voice) {
                warn!("Voice '{}' requested twice, running it once", voice);
                continue;
            }
            if !self.voices.contains(voice) {
                warn!("Unknown voice '{}', using the default voice profile", voice);
            }
            checked.push(voice.to_string());
        }

        if checked.is_empty() {
            return Err(anyhow!("At least one voice is required"));
        }
        Ok(checked)
    }

    fn stage_style() -> ProgressStyle {
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} stages {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        template_result.progress_chars("█▓▒░")
    }
}

/// Format a duration as `1h 2m 3s`, `2m 3s` or `3.4s`
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/*!
 * Ordered timing strategies with explicit fallback.
 *
 * A chain is a plain list of strategies tried in order; the first one that
 * returns a timeline wins. Forced alignment runs under a wall-clock deadline
 * and is dropped (cancelled) when the deadline passes.
 */

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};

use crate::app_config::Config;
use crate::errors::AlignmentError;
use crate::media::wav::read_wav_info;
use crate::timing::aligner::ForcedAligner;
use crate::timing::emissions::{emission_model_from_config, EmissionModel};
use crate::timing::heuristic::HeuristicTimeline;
use crate::timing::{Timeline, TranscriptUnit};
use crate::voices::VoiceProfile;

/// Everything a strategy may use to time one transcript
#[derive(Debug, Clone, Copy)]
pub struct TimingRequest<'a> {
    pub units: &'a [TranscriptUnit],
    pub voice: &'a VoiceProfile,
    /// Mono PCM WAV of the synthesized speech
    pub audio_path: &'a Path,
    /// Measured length of that audio in seconds
    pub audio_duration: f64,
}

/// Which strategy produced a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSource {
    Aligned,
    Heuristic,
    /// Nothing could be timed, one placeholder cue covers the audio
    Placeholder,
}

impl fmt::Display for TimingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimingSource::Aligned => "forced-alignment",
            TimingSource::Heuristic => "heuristic",
            TimingSource::Placeholder => "placeholder",
        };
        f.write_str(name)
    }
}

/// A timeline and where it came from
#[derive(Debug, Clone)]
pub struct TimingOutcome {
    pub cues: Timeline,
    pub source: TimingSource,
}

/// One way of producing a timeline
#[async_trait]
pub trait TimingStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn timeline(&self, request: &TimingRequest<'_>) -> Result<TimingOutcome>;
}

/// Forced alignment against an external emission model
pub struct ForcedAlignmentStrategy {
    model: Arc<dyn EmissionModel>,
    aligner: ForcedAligner,
    timeout: Duration,
}

impl ForcedAlignmentStrategy {
    pub fn new(model: Arc<dyn EmissionModel>, aligner: ForcedAligner, timeout: Duration) -> Self {
        Self { model, aligner, timeout }
    }

    async fn align(&self, request: &TimingRequest<'_>) -> Result<Timeline, AlignmentError> {
        let words: Vec<&str> = request.units.iter().flat_map(|u| u.words()).collect();
        if words.is_empty() {
            return Err(AlignmentError::EmptyTranscript);
        }

        let info = read_wav_info(request.audio_path)
            .map_err(|e| AlignmentError::ModelUnavailable(format!("cannot read audio: {:#}", e)))?;
        let matrix = self.model.emissions(request.audio_path).await?;

        // The trellis is CPU-bound; off the runtime so the deadline can still fire
        let aligner = self.aligner.clone();
        let words: Vec<String> = words.into_iter().map(str::to_string).collect();
        let (num_samples, sample_rate) = (info.num_samples, info.sample_rate);
        let aligned = tokio::task::spawn_blocking(move || {
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            aligner.align(matrix, &words, num_samples, sample_rate)
        })
        .await
        .map_err(|e| AlignmentError::ModelUnavailable(format!("alignment task failed: {}", e)))??;

        self.aligner.group_phrases(request.units, &aligned)
    }
}

#[async_trait]
impl TimingStrategy for ForcedAlignmentStrategy {
    fn name(&self) -> &str {
        "forced-alignment"
    }

    async fn timeline(&self, request: &TimingRequest<'_>) -> Result<TimingOutcome> {
        debug!("Aligning with the {} emission backend", self.model.name());
        let cues = tokio::select! {
            result = self.align(request) => result?,
            _ = tokio::time::sleep(self.timeout) => {
                return Err(AlignmentError::Timeout { secs: self.timeout.as_secs() }.into());
            }
        };

        if !cues.iter().all(|c| c.is_well_formed()) {
            return Err(AlignmentError::EmptyPath.into());
        }

        Ok(TimingOutcome {
            cues,
            source: TimingSource::Aligned,
        })
    }
}

/// Word-count based timeline, always succeeds
pub struct HeuristicStrategy {
    timeline: HeuristicTimeline,
}

impl HeuristicStrategy {
    pub fn new(timeline: HeuristicTimeline) -> Self {
        Self { timeline }
    }
}

#[async_trait]
impl TimingStrategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn timeline(&self, request: &TimingRequest<'_>) -> Result<TimingOutcome> {
        let cues = self
            .timeline
            .build(request.units, request.voice, request.audio_duration);
        let source = if request.units.is_empty() {
            TimingSource::Placeholder
        } else {
            TimingSource::Heuristic
        };
        Ok(TimingOutcome { cues, source })
    }
}

/// Strategies tried in order until one succeeds
pub struct StrategyChain {
    strategies: Vec<Box<dyn TimingStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn TimingStrategy>>) -> Self {
        Self { strategies }
    }

    /// `[forced alignment, heuristic]`, or just the heuristic when no backend is configured
    pub fn from_config(config: &Config) -> Self {
        let mut strategies: Vec<Box<dyn TimingStrategy>> = Vec::new();
        if let Some(model) = emission_model_from_config(&config.aligner) {
            strategies.push(Box::new(ForcedAlignmentStrategy::new(
                model,
                ForcedAligner::new(&config.aligner),
                Duration::from_secs(config.aligner.timeout_secs),
            )));
        }
        strategies.push(Box::new(HeuristicStrategy::new(HeuristicTimeline::new(&config.timing))));
        Self::new(strategies)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain, returning the first successful outcome
    pub async fn run(&self, request: &TimingRequest<'_>) -> Result<TimingOutcome> {
        if !(request.audio_duration > 0.0) {
            return Err(anyhow!("Audio duration must be positive, got {}", request.audio_duration));
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.timeline(request).await {
                Ok(outcome) if !outcome.cues.is_empty() => {
                    info!(
                        "Timed {} units into {} cues using {}",
                        request.units.len(),
                        outcome.cues.len(),
                        outcome.source
                    );
                    return Ok(outcome);
                }
                Ok(_) => {
                    warn!("Timing strategy '{}' produced no cues, falling back", strategy.name());
                    failures.push(format!("{}: no cues", strategy.name()));
                }
                Err(e) => {
                    warn!("Timing strategy '{}' failed, falling back: {:#}", strategy.name(), e);
                    failures.push(format!("{}: {:#}", strategy.name(), e));
                }
            }
        }

        Err(anyhow!("No timing strategy succeeded ({})", failures.join("; ")))
    }
}

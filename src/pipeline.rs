/*!
 * One text rendered in one voice.
 *
 * Stages run strictly in order: generate, clean, synthesize, convert audio,
 * timing, subtitles, prepare video, composite, reconcile. A failing stage
 * stops the run and is reported with its stage and voice.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};

use crate::app_config::Config;
use crate::errors::{PipelineError, Stage, StageContext};
use crate::file_utils::{FileManager, RunArtifacts};
use crate::generation::{clean_for_speech, SpeechSynthesizer, TextGenerator};
use crate::media::wav::read_wav_info;
use crate::media::{DurationReconciler, MediaTools, ReconcileOutcome};
use crate::subtitle_processor::SubtitleFileWriter;
use crate::timing::{
    SequentialNormalizer, SilenceDetector, SilenceRefiner, StrategyChain, TextChunker, Timeline, TimingRequest,
    TimingSource,
};
use crate::voices::{VoiceProfile, VoiceRegistry};

/// Result of timing a transcript against its audio
#[derive(Debug, Clone)]
pub struct TimingReport {
    pub cues: Timeline,
    pub source: TimingSource,
    pub audio_duration: f64,
    pub unit_count: usize,
}

/// The offline timing core: chunk, time, normalize, refine
pub struct TimingEngine {
    chunker: TextChunker,
    chain: StrategyChain,
    normalizer: SequentialNormalizer,
    detector: Option<SilenceDetector>,
    refiner: SilenceRefiner,
}

impl TimingEngine {
    pub fn from_config(config: &Config) -> Self {
        Self::with_chain(config, StrategyChain::from_config(config))
    }

    /// Engine with a caller-supplied strategy chain
    pub fn with_chain(config: &Config, chain: StrategyChain) -> Self {
        Self {
            chunker: TextChunker::new(&config.timing),
            chain,
            normalizer: SequentialNormalizer::new(&config.normalizer, &config.timing),
            detector: config.silence.enabled.then(|| SilenceDetector::new(&config.silence)),
            refiner: SilenceRefiner::new(&config.silence),
        }
    }

    /// Time `transcript` against the mono WAV at `wav_path`
    pub async fn run(&self, transcript: &str, voice: &VoiceProfile, wav_path: &Path) -> Result<TimingReport> {
        let audio_duration = read_wav_info(wav_path)
            .with_context(|| format!("Cannot read audio {}", wav_path.display()))?
            .duration();

        let units = self.chunker.chunk(transcript);
        debug!("Chunked transcript into {} units", units.len());

        let request = TimingRequest {
            units: &units,
            voice,
            audio_path: wav_path,
            audio_duration,
        };
        let outcome = self.chain.run(&request).await?;

        if outcome.source == TimingSource::Placeholder {
            error!("Subtitles fell back to a placeholder cue over {:.2}s of audio", audio_duration);
            return Ok(TimingReport {
                cues: outcome.cues,
                source: outcome.source,
                audio_duration,
                unit_count: units.len(),
            });
        }

        let normalized = self.normalizer.normalize(&outcome.cues, voice);
        let cues = match &self.detector {
            Some(detector) => match self.detect_silences(detector, wav_path).await {
                Ok(silences) => self.refiner.refine(&normalized, &silences, audio_duration),
                Err(e) => {
                    warn!("Silence detection failed, keeping normalized timing: {:#}", e);
                    normalized
                }
            },
            None => normalized,
        };

        Ok(TimingReport {
            cues,
            source: outcome.source,
            audio_duration,
            unit_count: units.len(),
        })
    }

    async fn detect_silences(
        &self,
        detector: &SilenceDetector,
        wav_path: &Path,
    ) -> Result<Vec<crate::timing::SilenceInterval>> {
        let detector = detector.clone();
        let path = wav_path.to_path_buf();
        tokio::task::spawn_blocking(move || detector.detect_file(&path))
            .await
            .map_err(|e| anyhow!("Silence detection task failed: {}", e))?
    }
}

/// Everything a finished voice run produced
#[derive(Debug, Clone)]
pub struct VoiceOutcome {
    pub voice: String,
    pub artifacts: RunArtifacts,
    pub timing_source: TimingSource,
    pub cue_count: usize,
    pub audio_duration: f64,
    pub reconcile: ReconcileOutcome,
}

/// Shared, read-only collaborators for voice pipelines
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub media: Arc<dyn MediaTools>,
}

/// One source text rendered in one voice
pub struct VoicePipeline {
    voice_name: String,
    voice: VoiceProfile,
    config: Arc<Config>,
    collaborators: Collaborators,
    timing: TimingEngine,
    background: PathBuf,
    progress: Option<ProgressBar>,
}

impl VoicePipeline {
    pub fn new(
        voice_name: impl Into<String>,
        voices: &VoiceRegistry,
        config: Arc<Config>,
        collaborators: Collaborators,
        timing: TimingEngine,
        background: PathBuf,
    ) -> Self {
        let voice_name = voice_name.into();
        let voice = voices.resolve(&voice_name).clone();
        Self {
            voice_name,
            voice,
            config,
            collaborators,
            timing,
            background,
            progress: None,
        }
    }

    /// Report stage progress on `bar`
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn voice_name(&self) -> &str {
        &self.voice_name
    }

    fn begin(&self, stage: Stage) {
        debug!("[{}] stage {}", self.voice_name, stage);
        if let Some(bar) = &self.progress {
            bar.set_message(format!("{}: {}", self.voice_name, stage));
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
    }

    /// Run every stage for `source`, writing into `artifacts`
    pub async fn run(&self, source: &str, artifacts: &RunArtifacts) -> Result<VoiceOutcome, PipelineError> {
        let result = self.run_stages(source, artifacts).await;

        if !self.config.output.keep_temp_files {
            artifacts.cleanup();
        }
        if let Some(bar) = &self.progress {
            match &result {
                Ok(_) => bar.finish_with_message(format!("{}: done", self.voice_name)),
                Err(e) => bar.abandon_with_message(format!("{}: failed at {}", self.voice_name, e.stage)),
            }
        }
        result
    }

    async fn run_stages(&self, source: &str, artifacts: &RunArtifacts) -> Result<VoiceOutcome, PipelineError> {
        let voice = self.voice_name.as_str();
        let c = &self.collaborators;
        artifacts.create().stage(Stage::Generate, voice)?;

        self.begin(Stage::Generate);
        let script = c.generator.generate(source, &self.voice).await.stage(Stage::Generate, voice)?;
        FileManager::write_to_file(&artifacts.text, &script).stage(Stage::Generate, voice)?;
        info!("[{}] Generated script ({} words)", voice, script.split_whitespace().count());
        self.finish();

        self.begin(Stage::Clean);
        let processed = clean_for_speech(&script, self.config.generator.use_effects);
        if processed.is_empty() {
            return Err(PipelineError::new(Stage::Clean, voice, anyhow!("Script is empty after cleaning")));
        }
        FileManager::write_to_file(&artifacts.processed_text, &processed).stage(Stage::Clean, voice)?;
        self.finish();

        self.begin(Stage::Synthesize);
        c.synthesizer
            .synthesize(&processed, &self.voice, &artifacts.audio)
            .await
            .stage(Stage::Synthesize, voice)?;
        info!("[{}] Synthesized speech to {}", voice, artifacts.audio.display());
        self.finish();

        self.begin(Stage::ConvertAudio);
        c.media
            .convert_audio(&artifacts.audio, &artifacts.audio_converted)
            .await
            .stage(Stage::ConvertAudio, voice)?;
        self.finish();

        self.begin(Stage::Timing);
        let report = self
            .timing
            .run(&processed, &self.voice, &artifacts.audio_converted)
            .await
            .stage(Stage::Timing, voice)?;
        info!(
            "[{}] {} cues from {} units ({} timing, {:.2}s audio)",
            voice,
            report.cues.len(),
            report.unit_count,
            report.source,
            report.audio_duration
        );
        self.finish();

        self.begin(Stage::Subtitles);
        SubtitleFileWriter::new(&self.config.subtitle_style, &self.config.video)
            .write_ass(&artifacts.subtitles, &report.cues, report.audio_duration)
            .stage(Stage::Subtitles, voice)?;
        self.finish();

        self.begin(Stage::PrepareVideo);
        let background = FileManager::pick_background(&self.background).stage(Stage::PrepareVideo, voice)?;
        info!("[{}] Background: {}", voice, background.display());
        let prepared = c
            .media
            .prepare_background(&background, report.audio_duration, &artifacts.dir)
            .await
            .stage(Stage::PrepareVideo, voice)?;
        self.finish();

        self.begin(Stage::Composite);
        c.media
            .composite(&prepared, &artifacts.subtitles, &artifacts.audio_converted, &artifacts.final_video)
            .await
            .stage(Stage::Composite, voice)?;
        self.finish();

        self.begin(Stage::Reconcile);
        let reconcile = DurationReconciler::new(&self.config.video)
            .reconcile(c.media.as_ref(), &artifacts.final_video, report.audio_duration)
            .await
            .stage(Stage::Reconcile, voice)?;
        self.finish();

        info!("[{}] Finished: {}", voice, artifacts.final_video.display());
        Ok(VoiceOutcome {
            voice: self.voice_name.clone(),
            artifacts: artifacts.clone(),
            timing_source: report.source,
            cue_count: report.cues.len(),
            audio_duration: report.audio_duration,
            reconcile,
        })
    }
}

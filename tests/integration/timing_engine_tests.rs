/*!
 * Integration tests for the offline timing core: transcript and WAV in,
 * subtitle file out
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use reelsync::app_config::Config;
use reelsync::errors::AlignmentError;
use reelsync::pipeline::TimingEngine;
use reelsync::subtitle_processor::{parse_ass_file, SubtitleFileWriter};
use reelsync::timing::emissions::{EmissionMatrix, EmissionModel};
use reelsync::timing::strategy::{ForcedAlignmentStrategy, HeuristicStrategy};
use reelsync::timing::{
    is_sequential, spoken_text, CueKind, ForcedAligner, HeuristicTimeline, StrategyChain, TimingSource,
};
use reelsync::voices::VoiceProfile;

use crate::common::{self, SAMPLE_TRANSCRIPT};

/// Emission model that "hears" exactly the given transcript, spread evenly over the audio
struct ScriptedModel {
    transcript: String,
    frames: usize,
}

impl ScriptedModel {
    fn labels() -> Vec<String> {
        let mut labels = vec!["-".to_string(), "|".to_string(), "'".to_string()];
        labels.extend(('A'..='Z').map(|c| c.to_string()));
        labels
    }

    fn matrix(&self) -> EmissionMatrix {
        let labels = Self::labels();
        let index = |label: &str| labels.iter().position(|l| l == label).unwrap_or(0);

        let mut tokens = vec![index("|")];
        for word in self.transcript.split_whitespace() {
            let chars: Vec<usize> = word
                .to_uppercase()
                .chars()
                .filter(|c| c.is_ascii_alphabetic() || *c == '\'')
                .map(|c| index(&c.to_string()))
                .collect();
            if chars.is_empty() {
                continue;
            }
            tokens.extend(chars);
            tokens.push(index("|"));
        }

        // Two frames per token, a blank between repeats, blanks to fill the rest
        let mut best = Vec::new();
        for (i, &token) in tokens.iter().enumerate() {
            if i > 0 && tokens[i - 1] == token {
                best.push(0);
            }
            best.push(token);
            best.push(token);
        }
        while best.len() < self.frames {
            best.push(0);
        }

        let emissions = best
            .iter()
            .map(|&label| {
                (0..labels.len())
                    .map(|l| if l == label { 5.0 } else { 0.0 })
                    .collect()
            })
            .collect();

        EmissionMatrix {
            labels,
            emissions,
            blank_id: 0,
            frame_ratio: None,
        }
    }
}

#[async_trait]
impl EmissionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn emissions(&self, _wav_path: &Path) -> Result<EmissionMatrix, AlignmentError> {
        Ok(self.matrix())
    }
}

/// Emission model whose weights can never be fetched
struct UnreachableModel;

#[async_trait]
impl EmissionModel for UnreachableModel {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn emissions(&self, _wav_path: &Path) -> Result<EmissionMatrix, AlignmentError> {
        Err(AlignmentError::ModelUnavailable("connection refused".to_string()))
    }
}

fn chain_with(config: &Config, model: Arc<dyn EmissionModel>) -> StrategyChain {
    StrategyChain::new(vec![
        Box::new(ForcedAlignmentStrategy::new(
            model,
            ForcedAligner::new(&config.aligner),
            Duration::from_secs(5),
        )),
        Box::new(HeuristicStrategy::new(HeuristicTimeline::new(&config.timing))),
    ])
}

/// Test the heuristic path end to end on a real WAV file
#[tokio::test]
async fn test_timingEngine_withHeuristicOnly_shouldWriteSequentialSubtitles() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    let audio = common::write_speech_wav(&wav, &[(0.4, false), (4.0, true), (0.8, false), (4.5, true), (0.3, false)])?;

    let config = Config::default();
    let voice = config.voice_registry().resolve("walter_cronkite").clone();
    let report = TimingEngine::from_config(&config).run(SAMPLE_TRANSCRIPT, &voice, &wav).await?;

    assert_eq!(report.source, TimingSource::Heuristic);
    assert!((report.audio_duration - audio).abs() < 1e-6);
    assert!(is_sequential(&report.cues));
    assert_eq!(
        spoken_text(&report.cues).split_whitespace().count(),
        SAMPLE_TRANSCRIPT.split_whitespace().count()
    );

    let ass = dir.path().join("subtitles.ass");
    SubtitleFileWriter::new(&config.subtitle_style, &config.video).write_ass(&ass, &report.cues, report.audio_duration)?;
    let entries = parse_ass_file(&ass)?;
    assert!(entries.len() >= report.cues.len());
    assert!(entries.windows(2).all(|p| p[0].end_time_ms <= p[1].start_time_ms));

    let content = std::fs::read_to_string(&ass)?;
    assert!(content.contains("PlayResY: 1920"));
    assert!(content.contains("Effects,,0,0,0,,{\\alpha&HFF&}"), "breath marker must be invisible");
    Ok(())
}

/// Test the forced alignment path with an emission model that hears the transcript
#[tokio::test]
async fn test_timingEngine_withWorkingAligner_shouldUseAlignedTiming() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    common::write_tone_wav(&wav, 8.0)?;

    let config = Config::default();
    let model = Arc::new(ScriptedModel {
        transcript: SAMPLE_TRANSCRIPT.to_string(),
        frames: 400,
    });
    let engine = TimingEngine::with_chain(&config, chain_with(&config, model));
    let report = engine.run(SAMPLE_TRANSCRIPT, &VoiceProfile::default(), &wav).await?;

    assert_eq!(report.source, TimingSource::Aligned);
    assert!(is_sequential(&report.cues));
    let spoken: Vec<_> = report.cues.iter().filter(|c| c.kind == CueKind::Spoken).collect();
    assert!(spoken.iter().all(|c| c.word_count() <= config.aligner.max_phrase_words));
    assert!(spoken.iter().any(|c| c.is_question), "question flag survives alignment");
    assert_eq!(
        spoken_text(&report.cues).split_whitespace().count(),
        SAMPLE_TRANSCRIPT.split_whitespace().count()
    );
    Ok(())
}

/// Test that an unavailable aligner falls back to the heuristic timeline
#[tokio::test]
async fn test_timingEngine_withUnavailableAligner_shouldFallBackToHeuristic() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    common::write_tone_wav(&wav, 6.0)?;

    let config = Config::default();
    let engine = TimingEngine::with_chain(&config, chain_with(&config, Arc::new(UnreachableModel)));
    let report = engine.run(SAMPLE_TRANSCRIPT, &VoiceProfile::default(), &wav).await?;

    assert_eq!(report.source, TimingSource::Heuristic);
    assert!(!report.cues.is_empty());
    assert!(is_sequential(&report.cues));
    Ok(())
}

/// Test an aligner that does not fit the audio (too few frames for the transcript)
#[tokio::test]
async fn test_timingEngine_withDegenerateEmissions_shouldFallBackToHeuristic() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    common::write_tone_wav(&wav, 6.0)?;

    let config = Config::default();
    let model = Arc::new(ScriptedModel {
        transcript: "Hi.".to_string(),
        frames: 0,
    });
    let engine = TimingEngine::with_chain(&config, chain_with(&config, model));
    let report = engine.run(SAMPLE_TRANSCRIPT, &VoiceProfile::default(), &wav).await?;

    assert_eq!(report.source, TimingSource::Heuristic);
    Ok(())
}

/// Test the empty transcript scenario
#[tokio::test]
async fn test_timingEngine_withEmptyTranscript_shouldEmitPlaceholder() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    let audio = common::write_tone_wav(&wav, 3.0)?;

    let config = Config::default();
    let report = TimingEngine::from_config(&config)
        .run("   ", &VoiceProfile::default(), &wav)
        .await?;

    assert_eq!(report.source, TimingSource::Placeholder);
    assert_eq!(report.cues.len(), 1);
    assert_eq!(report.cues[0].start_time, 0.0);
    assert!((report.cues[0].end_time - audio).abs() < 1e-9);
    assert_eq!(report.cues[0].text, config.timing.placeholder_text);
    Ok(())
}

/// Test that cue ends are clipped before a long pause in the audio
#[tokio::test]
async fn test_timingEngine_withLongPause_shouldNotShowCaptionsDuringSilence() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let wav = dir.path().join("narration.wav");
    common::write_speech_wav(&wav, &[(3.0, true), (1.5, false), (3.0, true)])?;

    let config = Config::default();
    let voice = VoiceProfile::default();
    let report = TimingEngine::from_config(&config)
        .run("One two three four five six. Seven eight nine ten eleven twelve.", &voice, &wav)
        .await?;

    assert!(is_sequential(&report.cues));
    let clip_point = 3.0 - config.silence.clip_buffer;
    for cue in report.cues.iter().filter(|c| c.is_spoken()) {
        assert!(
            !(cue.start_time < clip_point - 1e-6 && cue.end_time > 3.0 + 1e-6),
            "cue {:?} runs into the pause",
            cue
        );
    }
    Ok(())
}

/// Test that a missing audio file is reported, not timed
#[tokio::test]
async fn test_timingEngine_withMissingAudio_shouldFail() {
    let config = Config::default();
    let result = TimingEngine::from_config(&config)
        .run(SAMPLE_TRANSCRIPT, &VoiceProfile::default(), Path::new("/nonexistent/audio.wav"))
        .await;
    assert!(result.is_err());
}

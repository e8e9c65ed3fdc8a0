/*!
 * Integration tests for a single voice pipeline running against mock collaborators
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

use reelsync::app_config::Config;
use reelsync::errors::Stage;
use reelsync::file_utils::RunArtifacts;
use reelsync::media::ReconcileOutcome;
use reelsync::pipeline::{Collaborators, TimingEngine, VoicePipeline};
use reelsync::subtitle_processor::parse_ass_file;
use reelsync::timing::TimingSource;
use reelsync::voices::{VoiceProfile, VoiceRegistry};

use crate::common::mock_collaborators::{
    collaborators, working_collaborators, MockGenerator, MockMedia, MockSynthesizer,
};
use crate::common::{self, SAMPLE_TRANSCRIPT};

/// A background directory holding one placeholder clip
fn background_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join("backgrounds");
    common::create_test_file(&dir, "minecraft/parkour.mp4", "not really a video")?;
    Ok(dir)
}

fn pipeline(voice: &str, config: Config, collaborators: Collaborators, background: PathBuf) -> VoicePipeline {
    let voices = config.voice_registry();
    pipeline_with(voice, &voices, config, collaborators, background)
}

fn pipeline_with(
    voice: &str,
    voices: &VoiceRegistry,
    config: Config,
    collaborators: Collaborators,
    background: PathBuf,
) -> VoicePipeline {
    let engine = TimingEngine::from_config(&config);
    VoicePipeline::new(voice, voices, Arc::new(config), collaborators, engine, background)
}

/// Test a full run producing every artifact
#[tokio::test]
async fn test_voicePipeline_withWorkingCollaborators_shouldProduceAllArtifacts() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");
    let (collaborators, media) = working_collaborators(SAMPLE_TRANSCRIPT);

    let outcome = pipeline("fireship", config, collaborators, background)
        .run("Cats can now write Rust", &artifacts)
        .await?;

    assert_eq!(outcome.voice, "fireship");
    assert_eq!(outcome.timing_source, TimingSource::Heuristic);
    assert!(matches!(outcome.reconcile, ReconcileOutcome::Accepted { .. }));
    assert_eq!(media.trim_count(), 0);

    for path in [
        &artifacts.text,
        &artifacts.processed_text,
        &artifacts.audio,
        &artifacts.audio_converted,
        &artifacts.subtitles,
        &artifacts.final_video,
    ] {
        assert!(path.exists(), "{} missing", path.display());
    }

    assert_eq!(std::fs::read_to_string(&artifacts.text)?, SAMPLE_TRANSCRIPT);
    let entries = parse_ass_file(&artifacts.subtitles)?;
    assert!(!entries.is_empty());
    assert!(entries.windows(2).all(|p| p[0].end_time_ms <= p[1].start_time_ms));
    Ok(())
}

/// Test that temp files are removed after a run unless asked to keep them
#[tokio::test]
async fn test_voicePipeline_cleanup_shouldRespectKeepTempFiles() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let background = background_dir(dir.path())?;

    let config = common::test_config(&dir.path().join("outputs"));
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");
    let (collaborators, _) = working_collaborators(SAMPLE_TRANSCRIPT);
    pipeline("fireship", config, collaborators, background.clone())
        .run("Cats", &artifacts)
        .await?;
    assert!(!artifacts.dir.join("temp_cropped.mp4").exists());
    assert!(artifacts.final_video.exists());

    let mut config = common::test_config(&dir.path().join("kept"));
    config.output.keep_temp_files = true;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");
    let (collaborators, _) = working_collaborators(SAMPLE_TRANSCRIPT);
    pipeline("fireship", config, collaborators, background)
        .run("Cats", &artifacts)
        .await?;
    assert!(artifacts.dir.join("temp_cropped.mp4").exists());
    Ok(())
}

/// Test the overlong video scenario
#[tokio::test]
async fn test_voicePipeline_withOverlongVideo_shouldTrimOnce() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "walter_cronkite");

    let media = Arc::new(MockMedia::new().with_video_excess(7.5));
    let collaborators = collaborators(
        MockGenerator::returning(SAMPLE_TRANSCRIPT),
        MockSynthesizer::working(),
        Arc::clone(&media),
    );

    let outcome = pipeline("walter_cronkite", config, collaborators, background)
        .run("Cats", &artifacts)
        .await?;

    match outcome.reconcile {
        ReconcileOutcome::Trimmed { from, to } => {
            assert!(from > to);
            assert!((from - outcome.audio_duration - 7.5).abs() < 1e-6);
        }
        other => panic!("expected a trim, got {:?}", other),
    }
    assert_eq!(media.trim_count(), 1);
    let trims = media.trims.lock().unwrap();
    assert_eq!(trims[0].0, artifacts.final_video);
    Ok(())
}

/// Test that a video shorter than its audio is an error, not a silent trim
#[tokio::test]
async fn test_voicePipeline_withShortVideo_shouldFailAtReconcile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");

    let media = Arc::new(MockMedia::new().with_video_excess(-5.0));
    let collaborators = collaborators(
        MockGenerator::returning(SAMPLE_TRANSCRIPT),
        MockSynthesizer::working(),
        Arc::clone(&media),
    );

    let err = pipeline("fireship", config, collaborators, background)
        .run("Cats", &artifacts)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Reconcile);
    assert!(err.to_string().contains("shorter than audio"), "{}", err);
    assert_eq!(media.trim_count(), 0);
    Ok(())
}

/// Test that a generator failure stops the voice with no fallback script
#[tokio::test]
async fn test_voicePipeline_withFailingGenerator_shouldReportGenerateStage() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "keanu_reeves");

    let generator = MockGenerator::failing();
    let collaborators = collaborators(
        generator.clone(),
        MockSynthesizer::working(),
        Arc::new(MockMedia::new()),
    );

    let err = pipeline("keanu_reeves", config, collaborators, background)
        .run("Cats", &artifacts)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Generate);
    assert_eq!(err.voice, "keanu_reeves");
    assert_eq!(generator.call_count(), 1);
    assert!(!artifacts.text.exists(), "no fallback script may be written");
    assert!(!artifacts.audio.exists());
    Ok(())
}

/// Test that the persona of the requested voice reaches the generator
#[tokio::test]
async fn test_voicePipeline_generate_shouldUseVoicePersona() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let expected = config.voice_registry().resolve("southpark_eric_cartman").persona.clone();
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "southpark_eric_cartman");

    let generator = MockGenerator::returning(SAMPLE_TRANSCRIPT);
    let collaborators = collaborators(
        generator.clone(),
        MockSynthesizer::working(),
        Arc::new(MockMedia::new()),
    );
    pipeline("southpark_eric_cartman", config, collaborators, background)
        .run("Cats", &artifacts)
        .await?;

    let calls = generator.calls.lock().unwrap();
    assert_eq!(*calls, vec![expected]);
    Ok(())
}

/// Test that the pipeline looks voices up in the registry it is given
#[tokio::test]
async fn test_voicePipeline_withSharedRegistry_shouldResolveFromIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    assert!(!config.voices.contains_key("narrator"));

    let mut profiles = config.voices.clone();
    profiles.insert(
        "narrator".to_string(),
        VoiceProfile {
            persona: "a calm documentary narrator".to_string(),
            ..VoiceProfile::default()
        },
    );
    let voices = VoiceRegistry::new(&profiles, VoiceProfile::default());

    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "narrator");
    let generator = MockGenerator::returning(SAMPLE_TRANSCRIPT);
    let collaborators = collaborators(
        generator.clone(),
        MockSynthesizer::working(),
        Arc::new(MockMedia::new()),
    );

    pipeline_with("narrator", &voices, config, collaborators, background)
        .run("Cats", &artifacts)
        .await?;

    assert_eq!(*generator.calls.lock().unwrap(), vec!["a calm documentary narrator".to_string()]);
    Ok(())
}

/// Test a synthesizer failure after its retries are spent
#[tokio::test]
async fn test_voicePipeline_withFailingSynthesizer_shouldReportSynthesizeStage() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let background = background_dir(dir.path())?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");

    let collaborators = collaborators(
        MockGenerator::returning(SAMPLE_TRANSCRIPT),
        MockSynthesizer::failing(),
        Arc::new(MockMedia::new()),
    );

    let err = pipeline("fireship", config, collaborators, background)
        .run("Cats", &artifacts)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Synthesize);
    assert!(artifacts.processed_text.exists(), "earlier stages keep their output");
    assert!(!artifacts.final_video.exists());
    Ok(())
}

/// Test that an empty background directory fails at video preparation
#[tokio::test]
async fn test_voicePipeline_withNoBackgroundVideos_shouldFailAtPrepareVideo() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let empty = dir.path().join("empty_backgrounds");
    std::fs::create_dir_all(&empty)?;
    let artifacts = RunArtifacts::new(&config.output.root, &Local::now(), "fireship");
    let (collaborators, _) = working_collaborators(SAMPLE_TRANSCRIPT);

    let err = pipeline("fireship", config, collaborators, empty)
        .run("Cats", &artifacts)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::PrepareVideo);
    assert!(artifacts.subtitles.exists(), "subtitles are written before the video stage");
    Ok(())
}

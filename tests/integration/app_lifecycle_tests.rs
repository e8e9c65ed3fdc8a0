/*!
 * Integration tests for multi-voice runs through the controller
 */

use std::sync::Arc;

use anyhow::Result;

use reelsync::app_controller::Controller;
use reelsync::errors::Stage;

use crate::common::mock_collaborators::{collaborators, working_collaborators, MockGenerator, MockMedia, MockSynthesizer};
use crate::common::{self, SAMPLE_TRANSCRIPT};

fn voices(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Test that one failing voice does not stop the others
#[tokio::test]
async fn test_controller_withOneFailingVoice_shouldFinishTheOthers() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let background = common::create_test_file(dir.path(), "backgrounds/clip.mp4", "video")?;
    let config = common::test_config(&dir.path().join("outputs"));

    let media = Arc::new(MockMedia::new().failing_convert_for("keanu_reeves"));
    let collaborators = collaborators(
        MockGenerator::returning(SAMPLE_TRANSCRIPT),
        MockSynthesizer::working(),
        media,
    );
    let controller = Controller::new(config, collaborators, background).with_progress(false);

    let report = controller
        .run("Cats can now write Rust", &voices(&["fireship", "keanu_reeves"]))
        .await?;

    assert_eq!(report.results.len(), 2);
    assert!(!report.all_succeeded());
    assert_eq!(report.succeeded().count(), 1);

    let (first, first_result) = &report.results[0];
    assert_eq!(first, "fireship");
    let outcome = first_result.as_ref().expect("fireship should succeed");
    assert!(outcome.artifacts.final_video.exists());

    let (second, second_result) = &report.results[1];
    assert_eq!(second, "keanu_reeves");
    let err = second_result.as_ref().unwrap_err();
    assert_eq!(err.stage, Stage::ConvertAudio);
    assert_eq!(err.voice, "keanu_reeves");
    assert!(err.to_string().starts_with("stage 'convert-audio' failed for voice 'keanu_reeves'"));

    assert!(report.summary().contains("1 succeeded, 1 failed"));
    Ok(())
}

/// Test that concurrent voices share a timestamp but never a directory
#[tokio::test]
async fn test_controller_withSeveralVoices_shouldSeparateOutputs() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let background = common::create_test_file(dir.path(), "backgrounds/clip.mp4", "video")?;
    let config = common::test_config(&dir.path().join("outputs"));
    let (collaborators, _) = working_collaborators(SAMPLE_TRANSCRIPT);
    let controller = Controller::new(config, collaborators, background).with_progress(false);

    let report = controller
        .run("Cats", &voices(&["fireship", "walter_cronkite", "donald_trump"]))
        .await?;

    assert!(report.all_succeeded(), "{}", report.summary());
    let outcomes: Vec<_> = report.succeeded().collect();
    assert_eq!(outcomes.len(), 3);

    let timestamp = report.started.format("%Y%m%d_%H%M%S").to_string();
    for outcome in &outcomes {
        let name = outcome.artifacts.dir.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("{}_{}", timestamp, outcome.voice));
        assert!(outcome.artifacts.subtitles.exists());
    }
    assert_ne!(outcomes[0].artifacts.dir, outcomes[1].artifacts.dir);
    assert_ne!(outcomes[1].artifacts.dir, outcomes[2].artifacts.dir);
    Ok(())
}

/// Test duplicate and unknown voice handling
#[tokio::test]
async fn test_controller_withDuplicateAndUnknownVoices_shouldRunEachOnce() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let background = common::create_test_file(dir.path(), "backgrounds/clip.mp4", "video")?;
    let config = common::test_config(&dir.path().join("outputs"));
    let (collaborators, _) = working_collaborators(SAMPLE_TRANSCRIPT);
    let controller = Controller::new(config, collaborators, background).with_progress(false);

    assert!(controller.voices().contains("fireship"));
    assert!(!controller.voices().contains("bob_ross"));

    let report = controller
        .run("Cats", &voices(&["fireship", "fireship", "bob_ross"]))
        .await?;

    let names: Vec<&str> = report.results.iter().map(|(v, _)| v.as_str()).collect();
    assert_eq!(names, vec!["fireship", "bob_ross"]);
    assert!(report.all_succeeded());
    Ok(())
}

/// Test the rejected inputs
#[test]
fn test_controller_withInvalidInput_shouldFailBeforeRunning() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(&dir.path().join("outputs"));
    let generator = MockGenerator::returning(SAMPLE_TRANSCRIPT);
    let collaborators = collaborators(generator.clone(), MockSynthesizer::working(), Arc::new(MockMedia::new()));
    let controller = Controller::new(config, collaborators, dir.path().to_path_buf()).with_progress(false);

    tokio_test::block_on(async {
        assert!(controller.run("Cats", &[]).await.is_err());
        assert!(controller.run("Cats", &voices(&["../escape"])).await.is_err());
        assert!(controller.run("   ", &voices(&["fireship"])).await.is_err());
    });

    assert_eq!(generator.call_count(), 0);
    assert!(!dir.path().join("outputs").exists());
    Ok(())
}

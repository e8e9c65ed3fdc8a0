/*!
 * Tests for error types and stage reporting
 */

use anyhow::anyhow;
use reelsync::errors::{AlignmentError, MediaError, PipelineError, ProviderError, Stage, StageContext};

/// Test the user-visible pipeline failure message
#[test]
fn test_pipelineError_display_shouldNameStageAndVoice() {
    let err = PipelineError::new(
        Stage::Synthesize,
        "keanu_reeves",
        ProviderError::ConnectionError("timed out".to_string()),
    );

    let message = err.to_string();
    assert_eq!(
        message,
        "stage 'synthesize' failed for voice 'keanu_reeves': Connection error: timed out"
    );
    assert_eq!(err.stage, Stage::Synthesize);
    assert_eq!(err.voice, "keanu_reeves");
}

/// Test attaching stage information to arbitrary results
#[test]
fn test_stageContext_withTypedAndAnyhowErrors_shouldWrap() {
    let media: Result<(), MediaError> = Err(MediaError::VideoTooShort { video: 20.0, audio: 30.0 });
    let err = media.stage(Stage::Reconcile, "fireship").unwrap_err();
    assert_eq!(err.stage, Stage::Reconcile);
    assert!(err.to_string().contains("shorter than audio"));

    let plain: anyhow::Result<u32> = Err(anyhow!("disk full"));
    let err = plain.stage(Stage::Subtitles, "fireship").unwrap_err();
    assert!(err.to_string().ends_with("disk full"));

    let ok: anyhow::Result<u32> = Ok(3);
    assert_eq!(ok.stage(Stage::Generate, "fireship").unwrap(), 3);
}

/// Test stage ordering and names
#[test]
fn test_stage_all_shouldListStagesInExecutionOrder() {
    let names: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "generate",
            "clean",
            "synthesize",
            "convert-audio",
            "timing",
            "subtitles",
            "prepare-video",
            "composite",
            "reconcile"
        ]
    );
}

/// Test which provider failures are worth retrying
#[test]
fn test_providerError_fromStatus_shouldClassifyRetryability() {
    assert!(matches!(
        ProviderError::from_status(401, "bad key".to_string()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(ProviderError::from_status(429, "slow down".to_string()).is_retryable());
    assert!(ProviderError::from_status(503, "busy".to_string()).is_retryable());
    assert!(!ProviderError::from_status(400, "bad request".to_string()).is_retryable());
    assert!(!ProviderError::from_status(403, "forbidden".to_string()).is_retryable());
    assert!(!ProviderError::EmptyResponse.is_retryable());
}

/// Test alignment error messages
#[test]
fn test_alignmentError_display_shouldCarryDetails() {
    let err = AlignmentError::DegenerateTrellis { frames: 3, tokens: 12 };
    assert_eq!(err.to_string(), "Degenerate trellis: 3 frames for 12 tokens");

    let err = AlignmentError::Timeout { secs: 120 };
    assert!(err.to_string().contains("120"));
}

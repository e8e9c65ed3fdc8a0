/*!
 * Common test utilities for the reelsync test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use reelsync::app_config::Config;

// Mock text, speech and media collaborators
pub mod mock_collaborators;

/// Sample rate of every WAV fixture, matching the converted narration
pub const SAMPLE_RATE: u32 = 16_000;

/// Routes library logs through the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a mono 16 kHz WAV made of `(seconds, voiced)` stretches.
///
/// Voiced stretches hold a 220 Hz tone well above the silence threshold,
/// the others are digital silence.
pub fn write_speech_wav(path: &Path, pattern: &[(f64, bool)]) -> Result<f64> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    let mut written = 0usize;

    for &(seconds, voiced) in pattern {
        let count = (seconds * SAMPLE_RATE as f64).round() as usize;
        for _ in 0..count {
            let sample = if voiced {
                let t = written as f64 / SAMPLE_RATE as f64;
                (0.3 * (2.0 * std::f64::consts::PI * 220.0 * t).sin() * i16::MAX as f64) as i16
            } else {
                0
            };
            writer.write_sample(sample)?;
            written += 1;
        }
    }
    writer.finalize()?;

    Ok(written as f64 / SAMPLE_RATE as f64)
}

/// Writes `seconds` of uninterrupted tone
pub fn write_tone_wav(path: &Path, seconds: f64) -> Result<f64> {
    write_speech_wav(path, &[(seconds, true)])
}

/// Default configuration writing its runs under `root`, no aligner, fast retries
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.output.root = root.to_path_buf();
    config.generator.retry_backoff_ms = 1;
    config.tts.retry_backoff_ms = 1;
    config
}

/// Transcript used across the integration tests
pub const SAMPLE_TRANSCRIPT: &str =
    "Breaking news from the lab. Scientists taught a cat to write Rust! Is this the future of programming?";

/*!
 * Mock collaborator implementations for testing
 *
 * The pipeline talks to an LLM, a TTS engine and ffmpeg through traits. These
 * mocks stand in for all three so tests never touch the network or need
 * ffmpeg installed.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use reelsync::errors::MediaError;
use reelsync::generation::{SpeechSynthesizer, TextGenerator};
use reelsync::media::MediaTools;
use reelsync::pipeline::Collaborators;
use reelsync::voices::VoiceProfile;

use super::write_speech_wav;

/// Narration shape used by `MockMedia::convert_audio` unless overridden
pub const DEFAULT_SPEECH: [(f64, bool); 5] = [(0.3, false), (3.0, true), (0.6, false), (3.5, true), (0.4, false)];

/// Text generator returning a fixed script
#[derive(Debug, Clone)]
pub struct MockGenerator {
    script: Option<String>,
    /// Personas seen so far
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    pub fn returning(script: &str) -> Self {
        Self {
            script: Some(script.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, _source: &str, voice: &VoiceProfile) -> Result<String> {
        self.calls.lock().unwrap().push(voice.persona.clone());
        self.script
            .clone()
            .ok_or_else(|| anyhow!("Simulated generator outage"))
    }
}

/// Speech synthesizer writing a stub MP3
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer {
    fail: bool,
}

impl MockSynthesizer {
    pub fn working() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceProfile, output: &Path) -> Result<()> {
        if self.fail {
            return Err(anyhow!("Simulated TTS failure after retries"));
        }
        if text.trim().is_empty() {
            return Err(anyhow!("Nothing to synthesize"));
        }
        tokio::fs::write(output, b"ID3").await?;
        Ok(())
    }
}

/// Media toolchain that writes fixture WAVs and placeholder videos
#[derive(Debug, Default)]
pub struct MockMedia {
    speech: Vec<(f64, bool)>,
    /// Rendered video length minus audio length
    video_excess: f64,
    /// Fail `convert_audio` for outputs whose path contains this text
    fail_convert_for: Option<String>,
    targets: Mutex<HashMap<PathBuf, f64>>,
    /// `(video, duration)` for every trim request
    pub trims: Mutex<Vec<(PathBuf, f64)>>,
}

impl MockMedia {
    pub fn new() -> Self {
        Self {
            speech: DEFAULT_SPEECH.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_speech(mut self, speech: &[(f64, bool)]) -> Self {
        self.speech = speech.to_vec();
        self
    }

    pub fn with_video_excess(mut self, seconds: f64) -> Self {
        self.video_excess = seconds;
        self
    }

    pub fn failing_convert_for(mut self, voice: &str) -> Self {
        self.fail_convert_for = Some(voice.to_string());
        self
    }

    pub fn trim_count(&self) -> usize {
        self.trims.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaTools for MockMedia {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let target = self
            .targets
            .lock()
            .unwrap()
            .get(&dir)
            .copied()
            .ok_or_else(|| MediaError::InvalidDuration(format!("nothing rendered in {}", dir.display())))?;
        Ok(target + self.video_excess)
    }

    async fn convert_audio(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        if let Some(voice) = &self.fail_convert_for {
            if output.to_string_lossy().contains(voice.as_str()) {
                return Err(MediaError::ToolFailed {
                    tool: "ffmpeg".to_string(),
                    message: "Invalid data found when processing input".to_string(),
                });
            }
        }
        if !input.exists() {
            return Err(MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                message: format!("{}: No such file or directory", input.display()),
            });
        }
        write_speech_wav(output, &self.speech).map_err(|e| MediaError::ToolFailed {
            tool: "ffmpeg".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn prepare_background(&self, background: &Path, target: f64, work_dir: &Path) -> Result<PathBuf, MediaError> {
        if !background.exists() {
            return Err(MediaError::ToolFailed {
                tool: "ffprobe".to_string(),
                message: format!("{}: No such file or directory", background.display()),
            });
        }
        self.targets.lock().unwrap().insert(work_dir.to_path_buf(), target);
        let prepared = work_dir.join("temp_cropped.mp4");
        std::fs::write(&prepared, b"video").map_err(|e| MediaError::ToolFailed {
            tool: "ffmpeg".to_string(),
            message: e.to_string(),
        })?;
        Ok(prepared)
    }

    async fn composite(&self, video: &Path, subtitles: &Path, audio: &Path, output: &Path) -> Result<(), MediaError> {
        for input in [video, subtitles, audio] {
            if !input.exists() {
                return Err(MediaError::ToolFailed {
                    tool: "ffmpeg".to_string(),
                    message: format!("{}: No such file or directory", input.display()),
                });
            }
        }
        std::fs::write(output, b"final").map_err(|e| MediaError::ToolFailed {
            tool: "ffmpeg".to_string(),
            message: e.to_string(),
        })
    }

    async fn trim_to_duration(&self, video: &Path, duration: f64) -> Result<(), MediaError> {
        self.trims.lock().unwrap().push((video.to_path_buf(), duration));
        Ok(())
    }
}

/// Collaborators built from the given mocks
pub fn collaborators(generator: MockGenerator, synthesizer: MockSynthesizer, media: Arc<MockMedia>) -> Collaborators {
    Collaborators {
        generator: Arc::new(generator),
        synthesizer: Arc::new(synthesizer),
        media,
    }
}

/// Collaborators that succeed with `script`
pub fn working_collaborators(script: &str) -> (Collaborators, Arc<MockMedia>) {
    let media = Arc::new(MockMedia::new());
    (
        collaborators(MockGenerator::returning(script), MockSynthesizer::working(), Arc::clone(&media)),
        media,
    )
}

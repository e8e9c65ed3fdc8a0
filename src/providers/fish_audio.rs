use std::path::Path;
use std::time::Duration;

use log::{debug, error};
use reqwest::Client;
use serde::Serialize;

use crate::errors::ProviderError;

/// Fish Audio text-to-speech client
#[derive(Debug)]
pub struct FishAudio {
    client: Client,
    api_key: String,
    /// Full TTS URL, e.g. `https://api.fish.audio/v1/tts`
    endpoint: String,
}

/// Speed and similar delivery controls
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prosody {
    pub speed: f64,
}

/// TTS request body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FishAudioRequest {
    pub text: String,
    pub reference_id: String,
    pub chunk_length: u32,
    pub normalize: bool,
    pub format: String,
    pub mp3_bitrate: u32,
    pub latency: String,
    pub model: String,
    pub prosody: Prosody,
}

impl FishAudioRequest {
    pub fn new(text: impl Into<String>, reference_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference_id: reference_id.into(),
            chunk_length: 200,
            normalize: true,
            format: "mp3".to_string(),
            mp3_bitrate: 192,
            latency: "normal".to_string(),
            model: model.into(),
            prosody: Prosody { speed: 1.0 },
        }
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.prosody.speed = speed;
        self
    }

    pub fn mp3_bitrate(mut self, bitrate: u32) -> Self {
        self.mp3_bitrate = bitrate;
        self
    }

    pub fn chunk_length(mut self, chunk_length: u32) -> Self {
        self.chunk_length = chunk_length;
        self
    }

    pub fn latency(mut self, latency: impl Into<String>) -> Self {
        self.latency = latency.into();
        self
    }
}

impl FishAudio {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder().build().unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    /// One synthesis attempt with its own timeout; returns the encoded audio
    pub async fn synthesize(&self, request: &FishAudioRequest, timeout: Duration) -> Result<Vec<u8>, ProviderError> {
        debug!(
            "Fish Audio request: {} chars, voice {}, timeout {}s",
            request.text.chars().count(),
            request.reference_id,
            timeout.as_secs()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("model", &request.model)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Fish Audio API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }

    /// Synthesize into `output`, writing `<output>.tmp` first and renaming on success
    pub async fn synthesize_to_file(
        &self,
        request: &FishAudioRequest,
        timeout: Duration,
        output: &Path,
    ) -> anyhow::Result<()> {
        let audio = self.synthesize(request, timeout).await?;
        write_atomically(output, &audio).await
    }
}

/// Write `data` next to `path` and rename it into place
pub async fn write_atomically(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    if let Err(e) = tokio::fs::write(&tmp, data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(anyhow::anyhow!("Failed to write {}: {}", tmp.display(), e));
    }
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to move {} into place: {}", tmp.display(), e))
}

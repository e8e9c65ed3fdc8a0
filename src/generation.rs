/*!
 * Text and speech generation collaborators.
 *
 * The pipeline only sees the `TextGenerator` and `SpeechSynthesizer` traits.
 * The provider-backed implementations here retry transient failures with
 * exponential backoff and jitter, and give up with the last error once the
 * retries are spent.
 */

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::{GeneratorConfig, GeneratorProvider, TtsConfig};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::fish_audio::{write_atomically, FishAudio, FishAudioRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{backoff_delay, Provider};
use crate::voices::VoiceProfile;

static BOLD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static UNDERLINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.*?)__").unwrap());
static LINK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").unwrap());
static DIRECTIVE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[]\s*[A-Za-z][A-Za-z\- ]*?\s*[\)\]]").unwrap());
static DOTS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static SPACE_BEFORE_PUNCT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,!?])").unwrap());
// Only a lowercase word glued to a capitalized one, so "node.js" and "example.com" stay whole
static MISSING_SPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z][.,!?])([A-Z])").unwrap());

/// Turns source text into a narration script in a voice's persona
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, source: &str, voice: &VoiceProfile) -> Result<String>;
}

/// Renders a script to an audio file
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<()>;
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `retry_count` retries are spent. The closure receives the 1-based attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    retry_count: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = retry_count + 1;
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = backoff_delay(backoff_base_ms, attempt);
                warn!(
                    "{} failed (attempt {}/{}): {} - retrying in {}ms",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    warn!("{} giving up after {} attempts: {}", label, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

/// Chat backend selected from configuration
#[derive(Debug)]
enum ChatClient {
    OpenAI(OpenAI),
    Anthropic(Anthropic),
    Mock(MockProvider),
}

/// LLM-backed script generator
#[derive(Debug)]
pub struct ChatGenerator {
    client: ChatClient,
    config: GeneratorConfig,
}

impl ChatGenerator {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let model = config.get_model();
        let client = match config.provider {
            GeneratorProvider::OpenAI => ChatClient::OpenAI(OpenAI::new(
                config.get_api_key(),
                config.get_endpoint(),
                model,
                config.timeout_secs,
            )),
            GeneratorProvider::Anthropic => ChatClient::Anthropic(Anthropic::new(
                config.get_api_key(),
                config.get_endpoint(),
                model,
                config.timeout_secs,
            )),
        };
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Generator answering from a mock provider
    pub fn with_mock(provider: MockProvider, config: &GeneratorConfig) -> Self {
        Self {
            client: ChatClient::Mock(provider),
            config: config.clone(),
        }
    }

    /// System prompt for a voice
    pub fn system_prompt(&self, voice: &VoiceProfile) -> String {
        let persona = if voice.persona.is_empty() {
            "an energetic short-form video narrator"
        } else {
            voice.persona.as_str()
        };
        let mut prompt = self.config.system_prompt.replace("{persona}", persona);
        if self.config.use_effects {
            prompt.push_str(" You may add delivery markers such as (break), (long-break), (laugh) or (sigh).");
        }
        prompt
    }

    /// Check that the backend answers
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.client {
            ChatClient::OpenAI(client) => client.test_connection().await,
            ChatClient::Anthropic(client) => client.test_connection().await,
            ChatClient::Mock(client) => client.test_connection().await,
        }
    }

    async fn complete_once(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let text = match &self.client {
            ChatClient::OpenAI(client) => {
                let request = OpenAIRequest::new(self.config.get_model())
                    .add_message("system", system)
                    .add_message("user", prompt)
                    .temperature(self.config.temperature)
                    .max_tokens(self.config.max_tokens);
                OpenAI::extract_text(&client.complete(request).await?)
            }
            ChatClient::Anthropic(client) => {
                let request = AnthropicRequest::new(self.config.get_model(), self.config.max_tokens)
                    .system(system)
                    .add_message("user", prompt)
                    .temperature(self.config.temperature);
                Anthropic::extract_text(&client.complete(request).await?)
            }
            ChatClient::Mock(client) => {
                let request = MockRequest {
                    system: system.to_string(),
                    prompt: prompt.to_string(),
                };
                MockProvider::extract_text(&client.complete(request).await?)
            }
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(&self, source: &str, voice: &VoiceProfile) -> Result<String> {
        if source.trim().is_empty() {
            return Err(anyhow!("Source text is empty"));
        }
        let system = self.system_prompt(voice);
        let label = format!("{} generation", self.config.provider.display_name());

        let text = retry_with_backoff(&label, self.config.retry_count, self.config.retry_backoff_ms, |_| {
            self.complete_once(&system, source)
        })
        .await
        .with_context(|| format!("{} did not produce a script", self.config.provider.display_name()))?;

        debug!("Generated script of {} words", text.split_whitespace().count());
        Ok(text)
    }
}

/// Fish Audio backed synthesizer
#[derive(Debug)]
pub struct FishSpeechSynthesizer {
    client: FishAudio,
    config: TtsConfig,
}

impl FishSpeechSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: FishAudio::new(config.get_api_key(), config.endpoint.clone()),
            config: config.clone(),
        }
    }

    pub fn request(&self, text: &str, voice: &VoiceProfile) -> FishAudioRequest {
        FishAudioRequest::new(text, voice.reference_id.clone(), self.config.model.clone())
            .speed(voice.tts_speed)
            .mp3_bitrate(self.config.mp3_bitrate)
            .chunk_length(self.config.chunk_length)
            .latency(self.config.latency.clone())
    }

    /// Timeout for an attempt, growing linearly
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1) * attempt.max(1) as u64)
    }
}

#[async_trait]
impl SpeechSynthesizer for FishSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<()> {
        if text.trim().is_empty() {
            return Err(anyhow!("Nothing to synthesize"));
        }
        let request = self.request(text, voice);

        let audio = retry_with_backoff("Fish Audio synthesis", self.config.retry_count, self.config.retry_backoff_ms, |attempt| {
            self.client.synthesize(&request, self.attempt_timeout(attempt))
        })
        .await
        .context("Speech synthesis failed")?;

        write_atomically(output, &audio).await?;
        debug!("Wrote {} bytes of audio to {}", audio.len(), output.display());
        Ok(())
    }
}

/// Prepare a script for the TTS engine.
///
/// Non-ASCII characters other than apostrophes and markdown emphasis or links
/// are removed, runs of dots collapse, and spacing around punctuation is
/// normalized. Directive markers stay only when `keep_effects` is set.
pub fn clean_for_speech(text: &str, keep_effects: bool) -> String {
    let ascii: String = text
        .chars()
        .filter_map(|c| match c {
            '\u{2019}' => Some('\''),
            c if c.is_ascii() => Some(c),
            _ => None,
        })
        .collect();
    let mut text = ascii.split_whitespace().collect::<Vec<_>>().join(" ");

    text = BOLD_REGEX.replace_all(&text, "$1").to_string();
    text = ITALIC_REGEX.replace_all(&text, "$1").to_string();
    text = UNDERLINE_REGEX.replace_all(&text, "$1").to_string();
    text = LINK_REGEX.replace_all(&text, "$1").to_string();

    if !keep_effects {
        text = DIRECTIVE_REGEX.replace_all(&text, "").to_string();
    }

    text = DOTS_REGEX.replace_all(&text, ".").to_string();
    text = SPACE_BEFORE_PUNCT_REGEX.replace_all(&text, "$1").to_string();
    text = MISSING_SPACE_REGEX.replace_all(&text, "$1 $2").to_string();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

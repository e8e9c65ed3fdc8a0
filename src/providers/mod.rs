/*!
 * Clients for the remote services a run talks to.
 *
 * - OpenAI: chat completions (also any OpenAI-compatible server)
 * - Anthropic: messages API
 * - Fish Audio: text-to-speech
 * - Mock: scripted chat provider for tests
 */

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::errors::ProviderError;

/// Common trait for chat-style LLM providers
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)` plus up to
/// half of that again as random jitter.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let backoff_ms = base_ms.saturating_mul(1u64 << exponent);
    let jitter_ms = if backoff_ms > 1 {
        rand::rng().random_range(0..=backoff_ms / 2)
    } else {
        0
    };
    Duration::from_millis(backoff_ms + jitter_ms)
}

pub mod anthropic;
pub mod fish_audio;
pub mod mock;
pub mod openai;

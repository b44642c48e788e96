//! Abstraction over the text-generation backend.
//!
//! The service only ever talks to a [`GenerationProvider`], so the canned
//! mock used by default and the real OpenRouter client are interchangeable
//! without touching the generation logic.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::FlashcardProposal;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Empty response from generation backend")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same call might succeed. Connection failures,
    /// timeouts, and server-side errors are transient; client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(err) => err.is_connect() || err.is_timeout(),
            ProviderError::Status { status, .. } => *status >= 500,
            ProviderError::EmptyResponse => false,
        }
    }
}

/// A text-generation backend. Takes a prompt, returns the raw model
/// content (expected to be a JSON array of proposals, but the provider
/// makes no promise about that; parsing is the service's job).
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Fixed stand-in for a real backend: ignores the prompt and returns a
/// canned JSON array of three proposals.
pub struct MockProvider;

impl MockProvider {
    fn sample_flashcards() -> Vec<FlashcardProposal> {
        vec![
            FlashcardProposal::new(
                "What is the capital of France?",
                "Paris is the capital and largest city of France.",
            ),
            FlashcardProposal::new(
                "Who wrote 'Romeo and Juliet'?",
                "William Shakespeare wrote 'Romeo and Juliet' between 1591 and 1595.",
            ),
            FlashcardProposal::new(
                "What is photosynthesis?",
                "Photosynthesis is the process by which plants convert light energy \
                 into chemical energy to produce glucose from carbon dioxide and water.",
            ),
        ]
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        // Serializing the canned proposals cannot fail.
        Ok(serde_json::to_string(&Self::sample_flashcards()).unwrap())
    }
}

/// Number of extra attempts after the first failed call
const MAX_RETRIES: u32 = 2;

/// Initial delay before the first retry
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// OpenRouter chat-completions client.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenRouterProvider {
    /// Create a new client. The base URL should not include the
    /// `/chat/completions` suffix.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    async fn call_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl GenerationProvider for OpenRouterProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        // The original backend made a single attempt; the bounded retry
        // for transient failures is a deliberate improvement.
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            match self.call_once(prompt).await {
                Ok(content) => return Ok(content),
                Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    log::warn!(
                        "Generation backend failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        MAX_RETRIES,
                        backoff,
                        err
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_returns_three_proposals() {
        let content = MockProvider.generate("ignored").await.unwrap();
        let proposals: Vec<FlashcardProposal> = serde_json::from_str(&content).unwrap();

        assert_eq!(proposals.len(), 3);
        assert_eq!(proposals[0].front, "What is the capital of France?");
        assert!(proposals[0].back.starts_with("Paris"));
    }

    #[test]
    fn test_status_transience() {
        let server = ProviderError::Status {
            status: 503,
            message: String::new(),
        };
        let client = ProviderError::Status {
            status: 401,
            message: String::new(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(!ProviderError::EmptyResponse.is_transient());
    }
}

//! Generation service: builds the prompt, calls the provider, and turns
//! the raw content into a validated [`ProposalBatch`].

use std::sync::Arc;

use thiserror::Error;

use super::models::{FlashcardProposal, ProposalBatch, BACK_MAX, FRONT_MAX};
use super::provider::{GenerationProvider, ProviderError};
use super::validator::ValidRequest;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// The backend was unreachable, timed out, or returned a non-success
    /// status. Retrying the same request may succeed.
    #[error("Generation backend failed: {0}")]
    Provider(#[from] ProviderError),

    /// The backend answered, but the content was not a JSON array of
    /// proposals. Retrying with the same prompt is unlikely to help.
    #[error("Failed to parse generated flashcards: {0}")]
    Parse(#[from] serde_json::Error),

    /// The content parsed, but an entry violated the length bounds.
    /// The whole batch is rejected.
    #[error("Invalid flashcard at index {index}: {reason}")]
    InvalidProposal { index: usize, reason: String },
}

impl GenerationError {
    /// Whether the caller can usefully retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

/// Orchestrates one generation call: prompt → provider → parsed batch.
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    /// Generate a batch of flashcard proposals for a validated request.
    ///
    /// A single malformed entry in the provider output invalidates the
    /// entire batch; the service never returns a partial result.
    pub async fn generate_flashcards(&self, request: &ValidRequest) -> Result<ProposalBatch> {
        let prompt = build_prompt(
            request.text(),
            request.count(),
            request.existing_flashcards(),
        );

        log::info!("Requesting {} flashcard proposal(s)", request.count());
        let content = self.provider.generate(&prompt).await?;

        let batch = parse_proposals(&content)?;
        log::info!("Received {} valid proposal(s)", batch.count);
        Ok(batch)
    }
}

/// Build the generation prompt deterministically from the request.
///
/// The duplicate-avoidance section is advisory: the provider is not
/// guaranteed to honor it and the service does not de-duplicate.
pub fn build_prompt(text: &str, count: u32, existing: Option<&[FlashcardProposal]>) -> String {
    let mut prompt = format!(
        "Generate {count} educational flashcards from the following text.\n\
         Each flashcard should have a front (question) and back (answer).\n\
         The front should be a clear, concise question (max {FRONT_MAX} characters).\n\
         The back should contain a complete, accurate answer (max {BACK_MAX} characters).\n\
         Format the output as a JSON array of objects with 'front' and 'back' properties.\n\
         \n\
         Text to process:\n\
         {text}"
    );

    if let Some(existing) = existing.filter(|cards| !cards.is_empty()) {
        // Serializing proposals cannot fail.
        let listing = serde_json::to_string_pretty(existing).unwrap();
        prompt.push_str(&format!(
            "\n\nAvoid generating duplicates of these existing flashcards:\n{listing}"
        ));
    }

    prompt
}

/// Parse raw provider content into proposals, rejecting the whole batch
/// on a malformed entry or a violated length bound.
fn parse_proposals(content: &str) -> Result<ProposalBatch> {
    let proposals: Vec<FlashcardProposal> = serde_json::from_str(content)?;

    for (index, proposal) in proposals.iter().enumerate() {
        if proposal.front.chars().count() > FRONT_MAX {
            return Err(GenerationError::InvalidProposal {
                index,
                reason: format!("front exceeds {} characters", FRONT_MAX),
            });
        }
        if proposal.back.chars().count() > BACK_MAX {
            return Err(GenerationError::InvalidProposal {
                index,
                reason: format!("back exceeds {} characters", BACK_MAX),
            });
        }
    }

    Ok(ProposalBatch::new(proposals))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::generation::provider::MockProvider;
    use crate::generation::validator::validate;
    use crate::generation::GenerateRequest;

    /// Provider that replays whatever content it was constructed with.
    struct CannedProvider {
        content: String,
    }

    #[async_trait]
    impl GenerationProvider for CannedProvider {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, ProviderError> {
            Ok(self.content.clone())
        }
    }

    fn valid_request(count: u32) -> ValidRequest {
        validate(GenerateRequest {
            text: "a".repeat(1000),
            count: count.into(),
            existing_flashcards: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_mock_round_trip_yields_three_proposals() {
        let service = GenerationService::new(Arc::new(MockProvider));
        let batch = service
            .generate_flashcards(&valid_request(3))
            .await
            .unwrap();

        assert_eq!(batch.count, 3);
        assert_eq!(batch.flashcards.len(), 3);
        assert_eq!(batch.flashcards[0].front, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let service = GenerationService::new(Arc::new(CannedProvider {
            content: "not json".into(),
        }));

        let err = service
            .generate_flashcards(&valid_request(3))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_single_invalid_entry_rejects_whole_batch() {
        let content = serde_json::to_string(&vec![
            FlashcardProposal::new("ok", "ok"),
            FlashcardProposal::new("q".repeat(201), "ok"),
        ])
        .unwrap();
        let service = GenerationService::new(Arc::new(CannedProvider { content }));

        let err = service
            .generate_flashcards(&valid_request(2))
            .await
            .unwrap_err();
        match err {
            GenerationError::InvalidProposal { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("front"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_object_entry_rejects_whole_batch() {
        let service = GenerationService::new(Arc::new(CannedProvider {
            content: r#"[{"front": "q", "back": "a"}, 42]"#.into(),
        }));

        let err = service
            .generate_flashcards(&valid_request(2))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn test_prompt_is_deterministic_and_mentions_duplicates() {
        let existing = vec![FlashcardProposal::new("q1", "a1")];
        let a = build_prompt("some text", 5, Some(&existing));
        let b = build_prompt("some text", 5, Some(&existing));
        assert_eq!(a, b);
        assert!(a.contains("Generate 5 educational flashcards"));
        assert!(a.contains("Avoid generating duplicates"));
        assert!(a.contains("q1"));

        let without = build_prompt("some text", 5, None);
        assert!(!without.contains("Avoid generating duplicates"));
    }
}

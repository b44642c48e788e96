//! Data models for flashcard generation

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Minimum length of the source text, in characters
pub const TEXT_MIN: usize = 1000;

/// Maximum length of the source text, in characters
pub const TEXT_MAX: usize = 10000;

/// Minimum number of flashcards per generation request
pub const COUNT_MIN: u32 = 1;

/// Maximum number of flashcards per generation request
pub const COUNT_MAX: u32 = 200;

/// Maximum length of a card front (question), in characters
pub const FRONT_MAX: usize = 200;

/// Maximum length of a card back (answer), in characters
pub const BACK_MAX: usize = 500;

/// A proposed front/back pair returned by the generation backend.
/// Ephemeral: not yet reviewed, identified, or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardProposal {
    pub front: String,
    pub back: String,
}

impl FlashcardProposal {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// A flashcard generation request as received on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Source text the cards are generated from
    pub text: String,
    /// Requested number of cards. Carried as a raw JSON number so that
    /// non-integer values reach the validator and get reported against
    /// this field instead of failing deserialization.
    pub count: Number,
    /// Already-accepted cards the backend should avoid duplicating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_flashcards: Option<Vec<FlashcardProposal>>,
}

/// A validated batch of proposals, ready for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalBatch {
    pub flashcards: Vec<FlashcardProposal>,
    pub count: usize,
}

impl ProposalBatch {
    pub fn new(flashcards: Vec<FlashcardProposal>) -> Self {
        let count = flashcards.len();
        Self { flashcards, count }
    }
}

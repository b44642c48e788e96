//! Data models for the review session

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generation::FlashcardProposal;

/// Review status of a single card within one generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    /// Freshly generated, not yet reviewed
    Pending,
    /// Open in the editor
    Editing,
    /// Approved for persistence
    Accepted,
    /// Discarded from the save payload, but still visible
    Rejected,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A proposal augmented with an identity and a review status, scoped to
/// one generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewableCard {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub status: CardStatus,
}

impl ReviewableCard {
    pub fn from_proposal(proposal: FlashcardProposal) -> Self {
        Self {
            id: Uuid::new_v4(),
            front: proposal.front,
            back: proposal.back,
            status: CardStatus::Pending,
        }
    }

    /// Strip the review status back down to a bare proposal.
    pub fn to_proposal(&self) -> FlashcardProposal {
        FlashcardProposal {
            front: self.front.clone(),
            back: self.back.clone(),
        }
    }
}

/// What a finished session hands to the persistence gateway: the accepted
/// cards stripped of review state, plus the session totals for the
/// generation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub flashcards: Vec<FlashcardProposal>,
    pub total_generated: usize,
    pub total_accepted: usize,
}

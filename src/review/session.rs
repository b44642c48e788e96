//! The review-session state machine.
//!
//! All card mutations go through methods on [`ReviewSession`] and use the
//! whole-list replace-or-map pattern, so each transition is atomic from
//! the perspective of anyone reading the list between transitions.
//!
//! Generation is a two-phase suspension point: `begin_generation` (or
//! `plan_regeneration`) hands out a token, and `install_batch` /
//! `install_regenerated` apply the response only if the token is still
//! current. A response that arrives after a newer request was started is
//! discarded instead of clobbering intervening edits.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::generation::{
    validate, FlashcardProposal, GenerationError, GenerationService, ProposalBatch, ValidRequest,
    BACK_MAX, FRONT_MAX,
};

use super::models::{CardStatus, ReviewableCard, SavePayload};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Card {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: Uuid,
        from: CardStatus,
        to: CardStatus,
    },

    #[error("Question must not exceed {FRONT_MAX} characters")]
    FrontTooLong,

    #[error("Answer must not exceed {BACK_MAX} characters")]
    BackTooLong,

    #[error("No accepted flashcards found. Accept some flashcards before regenerating.")]
    NoAcceptedCards,

    #[error("All cards are already accepted; nothing to regenerate")]
    NothingToRegenerate,

    #[error("A generation request is already in flight")]
    GenerationInFlight,
}

impl SessionError {
    /// The field an edit error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SessionError::FrontTooLong => Some("front"),
            SessionError::BackTooLong => Some("back"),
            _ => None,
        }
    }
}

/// Error from the async convenience wrappers that drive the generation
/// service on behalf of a session.
#[derive(Error, Debug)]
pub enum RegenerateError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Everything `regenerate_missing` needs to ask the service for
/// replacement cards.
#[derive(Debug, Clone)]
pub struct RegenerationPlan {
    pub token: u64,
    pub request: ValidRequest,
}

/// One generation session's worth of reviewable cards.
pub struct ReviewSession {
    cards: Vec<ReviewableCard>,
    /// Source text of the initial generation, reused for regeneration
    source_text: String,
    /// Status each card held before entering the editor
    pre_edit_status: HashMap<Uuid, CardStatus>,
    /// Monotonically increasing generation-request counter; responses
    /// carrying an older token are stale and discarded
    generation: u64,
    in_flight: bool,
    unsaved_changes: bool,
    /// Proposals generated over the whole session, for the log record
    total_generated: usize,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            source_text: String::new(),
            pre_edit_status: HashMap::new(),
            generation: 0,
            in_flight: false,
            unsaved_changes: false,
            total_generated: 0,
        }
    }

    pub fn cards(&self) -> &[ReviewableCard] {
        &self.cards
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn accepted_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.status == CardStatus::Accepted)
            .count()
    }

    // ==================== Generation ====================

    /// Start a new generation for this session. Returns the request token
    /// that the eventual response must present to `install_batch`.
    pub fn begin_generation(&mut self, request: &ValidRequest) -> Result<u64, SessionError> {
        if self.in_flight {
            return Err(SessionError::GenerationInFlight);
        }
        self.generation += 1;
        self.in_flight = true;
        self.source_text = request.text().to_string();
        Ok(self.generation)
    }

    /// Install a freshly generated batch, replacing the whole card list.
    /// Returns false (and changes nothing) if the token is stale or no
    /// request is outstanding.
    pub fn install_batch(&mut self, token: u64, batch: ProposalBatch) -> bool {
        if !self.in_flight || token != self.generation {
            log::warn!(
                "Discarding generation response with no outstanding request (token {}, current {})",
                token,
                self.generation
            );
            return false;
        }

        self.total_generated += batch.count;
        self.cards = batch
            .flashcards
            .into_iter()
            .map(ReviewableCard::from_proposal)
            .collect();
        self.pre_edit_status.clear();
        self.in_flight = false;
        self.unsaved_changes = true;
        true
    }

    /// Record that the in-flight generation failed. The card list is left
    /// intact so the user can retry without losing progress.
    pub fn generation_failed(&mut self, token: u64) {
        if token == self.generation {
            self.in_flight = false;
        }
    }

    /// Run a full generation through the service and install the result.
    pub async fn generate(
        &mut self,
        service: &GenerationService,
        request: &ValidRequest,
    ) -> Result<usize, RegenerateError> {
        let token = self.begin_generation(request)?;
        match service.generate_flashcards(request).await {
            Ok(batch) => {
                self.install_batch(token, batch);
                Ok(self.cards.len())
            }
            Err(err) => {
                self.generation_failed(token);
                Err(err.into())
            }
        }
    }

    // ==================== Per-card transitions ====================

    /// Open a card in the editor, remembering its prior status.
    pub fn begin_edit(&mut self, id: Uuid) -> Result<(), SessionError> {
        let prior = self.status_of(id)?;
        if prior == CardStatus::Editing {
            return Ok(());
        }
        self.pre_edit_status.insert(id, prior);
        self.set_status(id, CardStatus::Editing);
        self.unsaved_changes = true;
        Ok(())
    }

    /// Save an in-progress edit. On a violated bound the card stays in
    /// `Editing` with its stored content untouched; on success it returns
    /// to the status it held before the edit.
    pub fn save_edit(
        &mut self,
        id: Uuid,
        front: String,
        back: String,
    ) -> Result<(), SessionError> {
        let status = self.status_of(id)?;
        if status != CardStatus::Editing {
            return Err(SessionError::InvalidTransition {
                id,
                from: status,
                to: CardStatus::Pending,
            });
        }

        if front.chars().count() > FRONT_MAX {
            return Err(SessionError::FrontTooLong);
        }
        if back.chars().count() > BACK_MAX {
            return Err(SessionError::BackTooLong);
        }

        let restored = self
            .pre_edit_status
            .remove(&id)
            .unwrap_or(CardStatus::Pending);
        self.cards = self
            .cards
            .iter()
            .map(|card| {
                if card.id == id {
                    ReviewableCard {
                        id: card.id,
                        front: front.clone(),
                        back: back.clone(),
                        status: restored,
                    }
                } else {
                    card.clone()
                }
            })
            .collect();
        self.unsaved_changes = true;
        Ok(())
    }

    /// Explicitly accept a card.
    pub fn accept(&mut self, id: Uuid) -> Result<(), SessionError> {
        match self.status_of(id)? {
            CardStatus::Pending | CardStatus::Editing | CardStatus::Accepted => {
                self.pre_edit_status.remove(&id);
                self.set_status(id, CardStatus::Accepted);
                self.unsaved_changes = true;
                Ok(())
            }
            from @ CardStatus::Rejected => Err(SessionError::InvalidTransition {
                id,
                from,
                to: CardStatus::Accepted,
            }),
        }
    }

    /// Explicitly reject a card. Rejected is terminal for bulk operations:
    /// the card stays visible but is skipped by `accept_all`, excluded
    /// from the save payload, and replaced by `regenerate_missing`.
    /// Reopening it through `begin_edit` is the recovery path.
    pub fn reject(&mut self, id: Uuid) -> Result<(), SessionError> {
        match self.status_of(id)? {
            CardStatus::Pending | CardStatus::Editing | CardStatus::Rejected => {
                self.pre_edit_status.remove(&id);
                self.set_status(id, CardStatus::Rejected);
                self.unsaved_changes = true;
                Ok(())
            }
            from @ CardStatus::Accepted => Err(SessionError::InvalidTransition {
                id,
                from,
                to: CardStatus::Rejected,
            }),
        }
    }

    /// Accept every card that is not already rejected. Idempotent.
    pub fn accept_all(&mut self) {
        self.pre_edit_status.clear();
        self.cards = self
            .cards
            .iter()
            .map(|card| {
                let mut card = card.clone();
                if card.status != CardStatus::Rejected {
                    card.status = CardStatus::Accepted;
                }
                card
            })
            .collect();
        self.unsaved_changes = true;
    }

    // ==================== Regeneration ====================

    /// Plan a regeneration of every non-accepted card: computes how many
    /// replacements are needed and passes the accepted cards as the
    /// duplicate-avoidance set. Fails (leaving the list unchanged) when
    /// no card has been accepted yet.
    pub fn plan_regeneration(&mut self) -> Result<RegenerationPlan, SessionError> {
        if self.in_flight {
            return Err(SessionError::GenerationInFlight);
        }

        let accepted: Vec<FlashcardProposal> = self
            .cards
            .iter()
            .filter(|c| c.status == CardStatus::Accepted)
            .map(ReviewableCard::to_proposal)
            .collect();

        if accepted.is_empty() {
            return Err(SessionError::NoAcceptedCards);
        }

        let missing = self.cards.len() - accepted.len();
        if missing == 0 {
            return Err(SessionError::NothingToRegenerate);
        }

        let request = validate_regeneration(&self.source_text, missing as u32, accepted);

        self.generation += 1;
        self.in_flight = true;
        Ok(RegenerationPlan {
            token: self.generation,
            request,
        })
    }

    /// Install regenerated cards: accepted cards are retained and every
    /// other card is replaced by the new proposals, each starting at
    /// `Pending`. Returns false (and changes nothing) if the token is
    /// stale or no request is outstanding.
    pub fn install_regenerated(&mut self, token: u64, batch: ProposalBatch) -> bool {
        if !self.in_flight || token != self.generation {
            log::warn!(
                "Discarding regeneration response with no outstanding request (token {}, current {})",
                token,
                self.generation
            );
            return false;
        }

        self.total_generated += batch.count;
        let mut cards: Vec<ReviewableCard> = self
            .cards
            .iter()
            .filter(|c| c.status == CardStatus::Accepted)
            .cloned()
            .collect();
        cards.extend(batch.flashcards.into_iter().map(ReviewableCard::from_proposal));

        self.cards = cards;
        self.pre_edit_status.clear();
        self.in_flight = false;
        self.unsaved_changes = true;
        true
    }

    /// Replace all non-accepted cards with freshly generated ones.
    pub async fn regenerate_missing(
        &mut self,
        service: &GenerationService,
    ) -> Result<usize, RegenerateError> {
        let plan = self.plan_regeneration()?;
        match service.generate_flashcards(&plan.request).await {
            Ok(batch) => {
                self.install_regenerated(plan.token, batch);
                Ok(self.cards.len())
            }
            Err(err) => {
                self.generation_failed(plan.token);
                Err(err.into())
            }
        }
    }

    // ==================== Save ====================

    /// The payload handed to the persistence gateway: accepted cards
    /// stripped to bare proposals, plus the session totals for the
    /// generation log. Cards in other states are excluded but remain in
    /// the session.
    pub fn save_payload(&self) -> SavePayload {
        let flashcards: Vec<FlashcardProposal> = self
            .cards
            .iter()
            .filter(|c| c.status == CardStatus::Accepted)
            .map(ReviewableCard::to_proposal)
            .collect();
        let total_accepted = flashcards.len();

        SavePayload {
            flashcards,
            total_generated: self.total_generated,
            total_accepted,
        }
    }

    /// Clear the unsaved-changes flag after a successful save.
    pub fn mark_saved(&mut self) {
        self.unsaved_changes = false;
    }

    // ==================== Internals ====================

    fn status_of(&self, id: Uuid) -> Result<CardStatus, SessionError> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.status)
            .ok_or(SessionError::CardNotFound(id))
    }

    fn set_status(&mut self, id: Uuid, status: CardStatus) {
        self.cards = self
            .cards
            .iter()
            .map(|card| {
                let mut card = card.clone();
                if card.id == id {
                    card.status = status;
                }
                card
            })
            .collect();
    }
}

/// Build the validated regeneration request. The source text passed the
/// validator when the session began and the missing count is within
/// bounds by construction, so this cannot fail.
fn validate_regeneration(
    text: &str,
    count: u32,
    accepted: Vec<FlashcardProposal>,
) -> ValidRequest {
    validate(crate::generation::GenerateRequest {
        text: text.to_string(),
        count: count.into(),
        existing_flashcards: Some(accepted.clone()),
    })
    .unwrap_or_else(|_| ValidRequest::from_parts(text.to_string(), count, Some(accepted)))
}

//! Review-session state machine for generated flashcard proposals.
//!
//! One [`session::ReviewSession`] owns the proposals for the lifetime of a
//! generation session: cards are edited, accepted, or rejected, and on
//! save only the accepted subset is handed to the persistence gateway.

pub mod models;
pub mod session;

pub use models::{CardStatus, ReviewableCard, SavePayload};
pub use session::{RegenerateError, ReviewSession, SessionError};

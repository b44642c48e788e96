//! AI-assisted flashcard generation and review.
//!
//! The pipeline: a validated generation request goes through a
//! [`generation::GenerationProvider`] to produce a batch of proposals,
//! the batch is reviewed card by card in a [`review::ReviewSession`],
//! and on save the accepted subset is handed to a
//! [`storage::PersistenceGateway`] along with a generation-log record.
//! [`server`] exposes the pipeline over HTTP.

pub mod generation;
pub mod review;
pub mod server;
pub mod storage;

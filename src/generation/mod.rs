//! Flashcard generation pipeline: request validation, the provider
//! abstraction over the text-generation backend, and the service that
//! turns raw model output into a validated proposal batch.

pub mod models;
pub mod provider;
pub mod service;
pub mod validator;

pub use models::{
    FlashcardProposal, GenerateRequest, ProposalBatch, BACK_MAX, COUNT_MAX, COUNT_MIN, FRONT_MAX,
    TEXT_MAX, TEXT_MIN,
};
pub use provider::{GenerationProvider, MockProvider, OpenRouterProvider, ProviderError};
pub use service::{GenerationError, GenerationService};
pub use validator::{validate, ValidRequest, ValidationErrors, ValidationIssue};

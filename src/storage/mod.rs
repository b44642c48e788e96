//! Persistence for accepted flashcards: collections, flashcard rows, and
//! per-session generation logs.

pub mod gateway;
pub mod models;

pub use gateway::{JsonFileGateway, PersistenceGateway, StorageError};
pub use models::{Collection, FlashcardRecord, GenerationLog};

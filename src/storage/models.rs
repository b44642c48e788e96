//! Persisted entity models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, user-owned grouping of persisted flashcards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; deleted collections stay on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Collection {
    pub fn new(name: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            user_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// A persisted flashcard row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardRecord {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlashcardRecord {
    pub fn new(collection_id: Uuid, front: String, back: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            collection_id,
            front,
            back,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Summary of one generation session, written alongside the saved
/// collection: how many cards were generated versus accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationLog {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub user_id: String,
    pub total_generated: usize,
    pub total_accepted: usize,
    pub created_at: DateTime<Utc>,
}

impl GenerationLog {
    pub fn new(
        collection_id: Uuid,
        user_id: String,
        total_generated: usize,
        total_accepted: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection_id,
            user_id,
            total_generated,
            total_accepted,
            created_at: Utc::now(),
        }
    }
}

//! Persistence gateway for finalized review sessions.
//!
//! Directory structure under the data dir:
//! ```text
//! collections.json             # Array of all collections
//! flashcards/
//! │   └── {collection-id}.json # Cards of one collection
//! logs.json                    # Array of generation-log rows
//! ```

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::review::SavePayload;

use super::models::{Collection, FlashcardRecord, GenerationLog};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Collection not found: {0}")]
    CollectionNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Contract between the review flow and the storage backend: a finalized
/// batch goes in, collection + flashcard rows and a generation-log row
/// come out.
pub trait PersistenceGateway: Send {
    /// Persist the accepted subset of a session as a new collection and
    /// record the session's generated/accepted totals.
    fn save_batch(
        &self,
        name: &str,
        user_id: &str,
        payload: &SavePayload,
    ) -> Result<Collection>;

    /// List collections that have not been soft-deleted.
    fn list_collections(&self) -> Result<Vec<Collection>>;

    fn get_collection(&self, id: Uuid) -> Result<Collection>;

    fn list_flashcards(&self, collection_id: Uuid) -> Result<Vec<FlashcardRecord>>;

    /// Soft-delete a collection (sets `deleted_at`, keeps the rows).
    fn delete_collection(&self, id: Uuid) -> Result<()>;

    fn list_logs(&self) -> Result<Vec<GenerationLog>>;
}

/// Gateway backed by pretty-printed JSON files under a data directory.
pub struct JsonFileGateway {
    data_dir: PathBuf,
}

impl JsonFileGateway {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Default data directory (e.g. `~/.local/share/flashmind`).
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("flashmind"))
    }

    fn collections_path(&self) -> PathBuf {
        self.data_dir.join("collections.json")
    }

    fn flashcards_dir(&self) -> PathBuf {
        self.data_dir.join("flashcards")
    }

    fn flashcards_path(&self, collection_id: Uuid) -> PathBuf {
        self.flashcards_dir().join(format!("{}.json", collection_id))
    }

    fn logs_path(&self) -> PathBuf {
        self.data_dir.join("logs.json")
    }

    /// Create the directory layout and empty index files.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.flashcards_dir())?;

        if !self.collections_path().exists() {
            self.write_collections(&[])?;
        }
        if !self.logs_path().exists() {
            self.write_logs(&[])?;
        }
        Ok(())
    }

    fn read_collections(&self) -> Result<Vec<Collection>> {
        let path = self.collections_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_collections(&self, collections: &[Collection]) -> Result<()> {
        fs::write(
            self.collections_path(),
            serde_json::to_string_pretty(collections)?,
        )?;
        Ok(())
    }

    fn read_logs(&self) -> Result<Vec<GenerationLog>> {
        let path = self.logs_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_logs(&self, logs: &[GenerationLog]) -> Result<()> {
        fs::write(self.logs_path(), serde_json::to_string_pretty(logs)?)?;
        Ok(())
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn save_batch(
        &self,
        name: &str,
        user_id: &str,
        payload: &SavePayload,
    ) -> Result<Collection> {
        self.init()?;

        let collection = Collection::new(name.to_string(), user_id.to_string());

        let records: Vec<FlashcardRecord> = payload
            .flashcards
            .iter()
            .map(|card| {
                FlashcardRecord::new(collection.id, card.front.clone(), card.back.clone())
            })
            .collect();
        fs::write(
            self.flashcards_path(collection.id),
            serde_json::to_string_pretty(&records)?,
        )?;

        let mut collections = self.read_collections()?;
        collections.push(collection.clone());
        self.write_collections(&collections)?;

        let mut logs = self.read_logs()?;
        logs.push(GenerationLog::new(
            collection.id,
            user_id.to_string(),
            payload.total_generated,
            payload.total_accepted,
        ));
        self.write_logs(&logs)?;

        log::info!(
            "Saved collection '{}' ({} card(s), {} generated)",
            collection.name,
            payload.total_accepted,
            payload.total_generated
        );
        Ok(collection)
    }

    fn list_collections(&self) -> Result<Vec<Collection>> {
        let collections = self.read_collections()?;
        Ok(collections
            .into_iter()
            .filter(|c| c.deleted_at.is_none())
            .collect())
    }

    fn get_collection(&self, id: Uuid) -> Result<Collection> {
        self.read_collections()?
            .into_iter()
            .find(|c| c.id == id && c.deleted_at.is_none())
            .ok_or(StorageError::CollectionNotFound(id))
    }

    fn list_flashcards(&self, collection_id: Uuid) -> Result<Vec<FlashcardRecord>> {
        // Surface a clean not-found for unknown collections.
        self.get_collection(collection_id)?;

        let path = self.flashcards_path(collection_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn delete_collection(&self, id: Uuid) -> Result<()> {
        let mut collections = self.read_collections()?;
        let pos = collections
            .iter()
            .position(|c| c.id == id && c.deleted_at.is_none())
            .ok_or(StorageError::CollectionNotFound(id))?;

        collections[pos].deleted_at = Some(Utc::now());
        collections[pos].updated_at = Utc::now();
        self.write_collections(&collections)
    }

    fn list_logs(&self) -> Result<Vec<GenerationLog>> {
        self.read_logs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FlashcardProposal;

    fn payload(accepted: usize, generated: usize) -> SavePayload {
        SavePayload {
            flashcards: (0..accepted)
                .map(|i| FlashcardProposal::new(format!("q{i}"), format!("a{i}")))
                .collect(),
            total_generated: generated,
            total_accepted: accepted,
        }
    }

    fn gateway() -> (tempfile::TempDir, JsonFileGateway) {
        let dir = tempfile::tempdir().unwrap();
        let gateway = JsonFileGateway::new(dir.path().to_path_buf());
        gateway.init().unwrap();
        (dir, gateway)
    }

    #[test]
    fn test_save_batch_round_trip() {
        let (_dir, gateway) = gateway();

        let collection = gateway
            .save_batch("Biology", "local", &payload(2, 5))
            .unwrap();
        assert_eq!(collection.name, "Biology");

        let listed = gateway.list_collections().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, collection.id);

        let cards = gateway.list_flashcards(collection.id).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "q0");
        assert!(cards.iter().all(|c| c.collection_id == collection.id));
    }

    #[test]
    fn test_log_records_session_totals() {
        let (_dir, gateway) = gateway();

        let collection = gateway
            .save_batch("History", "local", &payload(3, 7))
            .unwrap();

        let logs = gateway.list_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].collection_id, collection.id);
        assert_eq!(logs[0].total_generated, 7);
        assert_eq!(logs[0].total_accepted, 3);
    }

    #[test]
    fn test_soft_delete_hides_collection() {
        let (_dir, gateway) = gateway();

        let collection = gateway.save_batch("Tmp", "local", &payload(1, 1)).unwrap();
        gateway.delete_collection(collection.id).unwrap();

        assert!(gateway.list_collections().unwrap().is_empty());
        assert!(matches!(
            gateway.get_collection(collection.id),
            Err(StorageError::CollectionNotFound(_))
        ));
        // Deleting twice is also not-found.
        assert!(gateway.delete_collection(collection.id).is_err());
    }

    #[test]
    fn test_unknown_collection_is_not_found() {
        let (_dir, gateway) = gateway();
        let id = Uuid::new_v4();
        assert!(matches!(
            gateway.list_flashcards(id),
            Err(StorageError::CollectionNotFound(_))
        ));
    }
}

//! Sled-based storage for summaries.
//!
//! The pipeline only needs `store(record) -> id, timestamp`; [`SummaryStore`]
//! is that seam, and [`Storage`] is the sled implementation the CLI uses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("summary not found: {0}")]
    NotFound(u64),
}

/// Fields the pipeline hands over after a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSummary {
    pub wallet_address: String,
    pub article_url: String,
    pub original_content: String,
    pub summary_content: String,
}

/// A stored summary with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSummary {
    pub id: u64,
    pub wallet_address: String,
    pub article_url: String,
    pub original_content: String,
    pub summary_content: String,
    /// When the summary was created
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSummary {
    fn new(id: u64, record: NewSummary) -> Self {
        Self {
            id,
            wallet_address: record.wallet_address,
            article_url: record.article_url,
            original_content: record.original_content,
            summary_content: record.summary_content,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Persistence collaborator for finished pipeline runs
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Persist a record, assigning its id and creation time
    async fn store(&self, record: NewSummary) -> Result<StoredSummary, StorageError>;

    /// Summaries for a wallet, newest first
    async fn list_for_wallet(&self, wallet_address: &str) -> Result<Vec<StoredSummary>, StorageError>;
}

/// Sled-based storage for summaries.
///
/// Records are keyed by their big-endian id so iteration follows insertion order.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Insert a new record
    pub fn insert(&self, record: NewSummary) -> Result<StoredSummary, StorageError> {
        // generate_id starts at 0; shift so ids are positive like a SQL serial
        let id = self.db.generate_id()? + 1;
        let stored = StoredSummary::new(id, record);
        let value = serde_json::to_vec(&stored)?;
        self.db.insert(id.to_be_bytes(), value)?;
        self.db.flush()?;
        Ok(stored)
    }

    /// Retrieve a summary by id
    pub fn get(&self, id: u64) -> Result<Option<StoredSummary>, StorageError> {
        match self.db.get(id.to_be_bytes())? {
            Some(data) => {
                let stored: StoredSummary = serde_json::from_slice(&data)?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Replace the summary text of an existing record
    pub fn update_summary(&self, id: u64, summary_content: &str) -> Result<StoredSummary, StorageError> {
        let mut stored = self.get(id)?.ok_or(StorageError::NotFound(id))?;
        stored.summary_content = summary_content.to_string();
        stored.updated_at = Some(Utc::now());
        self.db.insert(id.to_be_bytes(), serde_json::to_vec(&stored)?)?;
        self.db.flush()?;
        Ok(stored)
    }

    /// List all stored summaries, newest first
    pub fn list_all(&self) -> Result<Vec<StoredSummary>, StorageError> {
        let mut results = Vec::new();
        for item in self.db.iter() {
            let (_key, value) = item?;
            let stored: StoredSummary = serde_json::from_slice(&value)?;
            results.push(stored);
        }
        // Newest first; ids break ties within the same instant
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(results)
    }

    /// Summaries created by one wallet, newest first
    pub fn list_by_wallet(&self, wallet_address: &str) -> Result<Vec<StoredSummary>, StorageError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|s| s.wallet_address.eq_ignore_ascii_case(wallet_address))
            .collect())
    }

    /// Get the number of stored summaries
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

#[async_trait]
impl SummaryStore for Storage {
    async fn store(&self, record: NewSummary) -> Result<StoredSummary, StorageError> {
        self.insert(record)
    }

    async fn list_for_wallet(&self, wallet_address: &str) -> Result<Vec<StoredSummary>, StorageError> {
        self.list_by_wallet(wallet_address)
    }
}

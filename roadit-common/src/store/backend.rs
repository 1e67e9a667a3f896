//! Storage backends for the issue slot
//!
//! A backend holds exactly one named slot: an opaque text payload. Encoding
//! and validation of the payload belong to [`IssueStore`](super::IssueStore).

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

/// Backend failure
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage capability in this environment; callers degrade to
    /// in-memory operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlx")]
    #[error("Storage database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for a single named slot
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short description for log lines (e.g. file path, slot name)
    fn describe(&self) -> String;

    /// Read the slot; `Ok(None)` when nothing has been written yet
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the slot contents
    async fn save(&self, payload: &str) -> Result<(), StorageError>;
}

/// Process-local slot
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing payload (e.g. a fixture or a corrupted blob)
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(payload.into())),
        }
    }

    /// Current raw contents
    pub fn payload(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.payload())
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(payload.to_string());
        Ok(())
    }
}

/// Backend for headless contexts with no storage at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStorage;

#[async_trait]
impl StorageBackend for NoStorage {
    fn describe(&self) -> String {
        "none".to_string()
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("no storage backend configured".to_string()))
    }

    async fn save(&self, _payload: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("no storage backend configured".to_string()))
    }
}

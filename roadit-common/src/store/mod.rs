//! Issue Record Store
//!
//! Owns the canonical issue list. The list lives in a single slot of an
//! injected [`StorageBackend`] as a JSON array, newest issue first. Every
//! operation is a read-modify-write of the whole slot, serialized through an
//! async mutex so concurrent callers never lose each other's writes.
//!
//! Degradation rules:
//! - empty slot: seed with [`seed_issues`] and persist
//! - corrupt slot (bad JSON or broken invariants): log, reset to seed, overwrite
//! - backend [`StorageError::Unavailable`]: operate on the seed in memory,
//!   nothing is persisted
//! - any other read failure: `get_all` answers with the seed; writes fail

mod backend;
mod file;
mod seed;
#[cfg(feature = "sqlx")]
pub mod sqlite;

pub use backend::{MemoryBackend, NoStorage, StorageBackend, StorageError};
pub use file::JsonFileBackend;
pub use seed::seed_issues;
#[cfg(feature = "sqlx")]
pub use sqlite::SqliteSlotBackend;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StorageKind;
use crate::model::{Issue, IssueDraft, Status};
use crate::time::{Clock, SystemClock};
use crate::workflow::resolve_resolved_at;
use crate::{Error, Result};

/// Default slot name
pub const ISSUES_SLOT: &str = "roadit_issues";

/// Loaded list plus whether it may be written back
struct Snapshot {
    issues: Vec<Issue>,
    persistent: bool,
}

/// Encode the issue list in the slot format
pub fn encode_issues(issues: &[Issue]) -> Result<String> {
    Ok(serde_json::to_string(issues)?)
}

/// Decode and validate a slot payload
///
/// Returns a description of the problem when the payload is not a valid
/// issue list.
pub fn decode_issues(payload: &str) -> std::result::Result<Vec<Issue>, String> {
    let issues: Vec<Issue> =
        serde_json::from_str(payload).map_err(|e| format!("unparsable payload: {}", e))?;

    let mut seen = HashSet::with_capacity(issues.len());
    for issue in &issues {
        issue.check_invariants()?;
        if !seen.insert(issue.id.as_str()) {
            return Err(format!("duplicate issue id {}", issue.id));
        }
    }

    Ok(issues)
}

/// Build the configured backend for `slot` under `root`
pub async fn open_backend(
    kind: StorageKind,
    root: &Path,
    slot: &str,
) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match kind {
        StorageKind::File => Arc::new(JsonFileBackend::new(root, slot)),
        #[cfg(feature = "sqlx")]
        StorageKind::Sqlite => {
            let pool = sqlite::connect(&root.join("roadit.db"))
                .await
                .map_err(storage_error)?;
            Arc::new(SqliteSlotBackend::new(pool, slot).await.map_err(storage_error)?)
        }
        #[cfg(not(feature = "sqlx"))]
        StorageKind::Sqlite => {
            return Err(Error::Config(
                "sqlite storage requires the `sqlx` feature".to_string(),
            ))
        }
        StorageKind::Memory => Arc::new(MemoryBackend::new()),
    };

    info!(backend = %backend.describe(), "Issue storage opened");
    Ok(backend)
}

/// Milliseconds-since-epoch id, bumped until it is unused
fn next_id(issues: &[Issue], millis: i64) -> String {
    let taken: HashSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
    let mut candidate = millis;
    loop {
        let id = candidate.to_string();
        if !taken.contains(id.as_str()) {
            return id;
        }
        candidate += 1;
    }
}

/// Issue Record Store
pub struct IssueStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl IssueStore {
    /// Store on `backend` using the wall clock
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// All issues, most recently added first. Never fails.
    pub async fn get_all(&self) -> Vec<Issue> {
        let _guard = self.write_lock.lock().await;
        match self.load_snapshot().await {
            Ok(snapshot) => snapshot.issues,
            Err(e) => {
                warn!(backend = %self.backend.describe(), "Failed to read issue slot, serving seed data: {}", e);
                seed_issues()
            }
        }
    }

    /// Single issue by id
    pub async fn get(&self, id: &str) -> Option<Issue> {
        self.get_all().await.into_iter().find(|i| i.id == id)
    }

    /// Create an issue from `draft` and prepend it to the list
    pub async fn add(&self, draft: IssueDraft) -> Result<Issue> {
        if !draft.location.is_valid() {
            return Err(Error::InvalidInput(format!(
                "Location ({}, {}) is out of range.",
                draft.location.lat, draft.location.lng
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_snapshot().await.map_err(storage_error)?;

        let now = self.clock.now();
        let id = next_id(&snapshot.issues, now.timestamp_millis());
        let issue = draft.into_issue(id, now);

        snapshot.issues.insert(0, issue.clone());
        self.write_back(&snapshot).await?;

        info!(
            id = %issue.id,
            issue_type = %issue.issue_type,
            municipality = %issue.municipality,
            "Issue added"
        );
        Ok(issue)
    }

    /// Set the status of issue `id`
    ///
    /// `updatedAt` always moves to now, even when the status is unchanged.
    pub async fn update_status(&self, id: &str, status: Status) -> Result<Issue> {
        self.update_status_checked(id, status, |_, _| Ok(())).await
    }

    /// Like [`update_status`](Self::update_status), but `guard(old, new)` may
    /// veto the change before anything is written
    pub async fn update_status_checked<F>(&self, id: &str, status: Status, guard: F) -> Result<Issue>
    where
        F: FnOnce(Status, Status) -> Result<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load_snapshot().await.map_err(storage_error)?;

        let index = snapshot
            .issues
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("issue {}", id)))?;

        let current = &snapshot.issues[index];
        guard(current.status, status)?;

        let now = self.clock.now();
        let mut updated = current.clone();
        updated.resolved_at = resolve_resolved_at(current.status, status, current.resolved_at, now);
        updated.status = status;
        updated.updated_at = now;

        snapshot.issues[index] = updated.clone();
        self.write_back(&snapshot).await?;

        Ok(updated)
    }

    async fn load_snapshot(&self) -> std::result::Result<Snapshot, StorageError> {
        match self.backend.load().await {
            Ok(Some(payload)) => match decode_issues(&payload) {
                Ok(issues) => Ok(Snapshot {
                    issues,
                    persistent: true,
                }),
                Err(reason) => {
                    warn!(backend = %self.backend.describe(), "Issue slot is corrupt ({}), resetting to seed data", reason);
                    Ok(self.seed_slot().await)
                }
            },
            Ok(None) => {
                info!(backend = %self.backend.describe(), "Issue slot is empty, initializing with seed data");
                Ok(self.seed_slot().await)
            }
            Err(StorageError::Unavailable(why)) => {
                debug!("Storage unavailable ({}), using in-memory seed data", why);
                Ok(Snapshot {
                    issues: seed_issues(),
                    persistent: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Write the seed to the slot, best effort
    async fn seed_slot(&self) -> Snapshot {
        let issues = seed_issues();
        let persistent = match encode_issues(&issues) {
            Ok(payload) => match self.backend.save(&payload).await {
                Ok(()) => true,
                Err(StorageError::Unavailable(_)) => false,
                Err(e) => {
                    warn!(backend = %self.backend.describe(), "Failed to persist seed data: {}", e);
                    true
                }
            },
            Err(e) => {
                warn!("Failed to encode seed data: {}", e);
                true
            }
        };
        Snapshot { issues, persistent }
    }

    async fn write_back(&self, snapshot: &Snapshot) -> Result<()> {
        if !snapshot.persistent {
            return Ok(());
        }
        let payload = encode_issues(&snapshot.issues)?;
        match self.backend.save(&payload).await {
            Ok(()) => Ok(()),
            Err(StorageError::Unavailable(why)) => {
                debug!("Storage unavailable ({}), change kept in memory only", why);
                Ok(())
            }
            Err(e) => Err(storage_error(e)),
        }
    }
}

fn storage_error(e: StorageError) -> Error {
    Error::Storage(e.to_string())
}

//! Integration tests for the Issue Record Store
//!
//! Covers seeding, insertion order, status updates and the resolution
//! timestamp rule, persistence round trips across every backend, and the
//! degraded paths (corrupt slot, missing storage).

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use roadit_common::store::{
    decode_issues, encode_issues, seed_issues, IssueStore, JsonFileBackend, MemoryBackend,
    NoStorage, SqliteSlotBackend, StorageBackend, StorageError,
};
use roadit_common::time::{Clock, ManualClock};
use roadit_common::{Error, IssueDraft, IssueType, Location, Municipality, Severity, Status};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper: store on a fresh memory backend with a controllable clock
fn setup_store() -> (IssueStore, Arc<MemoryBackend>, Arc<ManualClock>) {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap(),
    ));
    let store = IssueStore::with_clock(backend.clone(), clock.clone());
    (store, backend, clock)
}

fn pothole_draft() -> IssueDraft {
    let mut draft = IssueDraft::new(
        IssueType::Pothole,
        Severity::Minor,
        Location::new(10.0, 20.0),
        Municipality::Ndmc,
    );
    draft.description = "Pothole near the bus stop".to_string();
    draft.photo_url = "https://placehold.co/600x400.png".to_string();
    draft
}

// =============================================================================
// Seeding
// =============================================================================

#[tokio::test]
async fn test_first_read_returns_and_persists_seed() {
    let (store, backend, _) = setup_store();

    let issues = store.get_all().await;

    assert_eq!(issues.len(), 4);
    let ids: Vec<&str> = issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    let types: Vec<IssueType> = issues.iter().map(|i| i.issue_type).collect();
    assert_eq!(
        types,
        vec![
            IssueType::Pothole,
            IssueType::Waterlogging,
            IssueType::BrokenRoad,
            IssueType::Pothole
        ]
    );
    assert_eq!(issues[1].status, Status::UnderReview);

    let persisted = backend.payload().expect("seed should be persisted");
    assert_eq!(decode_issues(&persisted).unwrap(), issues);
}

#[tokio::test]
async fn test_existing_slot_is_not_reseeded() {
    let (store, backend, _) = setup_store();
    let added = store.add(pothole_draft()).await.unwrap();

    // New store over the same backend sees the added issue
    let reopened = IssueStore::new(backend.clone());
    let issues = reopened.get_all().await;
    assert_eq!(issues.len(), 5);
    assert_eq!(issues[0], added);
}

// =============================================================================
// Add
// =============================================================================

#[tokio::test]
async fn test_add_prepends_new_issue() {
    let (store, _, _) = setup_store();
    let before = store.get_all().await.len();

    let issue = store.add(pothole_draft()).await.unwrap();

    let after = store.get_all().await;
    assert_eq!(after.len(), before + 1);
    assert_eq!(after[0].id, issue.id);
    assert_eq!(issue.submitted_at, issue.updated_at);
    assert!(issue.resolved_at.is_none());
    assert_eq!(issue.status, Status::Received);
}

// =============================================================================
// Status updates
// =============================================================================

#[tokio::test]
async fn test_same_status_update_still_advances_updated_at() {
    let (store, _, clock) = setup_store();
    let original = store.get("1").await.unwrap();
    assert_eq!(original.status, Status::Received);

    clock.advance(Duration::seconds(30));
    let updated = store.update_status("1", Status::Received).await.unwrap();

    assert_eq!(updated.status, Status::Received);
    assert_eq!(updated.updated_at, clock.now());
    assert!(updated.updated_at > original.updated_at);
    assert_eq!(updated.submitted_at, original.submitted_at);
}

#[tokio::test]
async fn test_resolved_timestamp_rule() {
    let (store, _, clock) = setup_store();
    let prior = store.get("2").await.unwrap();

    clock.advance(Duration::minutes(10));
    let resolved = store.update_status("2", Status::Resolved).await.unwrap();

    let resolved_at = resolved.resolved_at.expect("resolvedAt should be set");
    assert!(resolved_at >= prior.updated_at);
    assert_eq!(resolved_at, resolved.updated_at);

    clock.advance(Duration::minutes(10));
    let reopened = store.update_status("2", Status::UnderReview).await.unwrap();

    assert!(reopened.resolved_at.is_none());
    assert_eq!(reopened.submitted_at, prior.submitted_at);
}

#[tokio::test]
async fn test_resolved_again_keeps_first_resolution_time() {
    let (store, _, clock) = setup_store();
    let seeded = store.get("3").await.unwrap();

    clock.advance(Duration::hours(1));
    let again = store.update_status("3", Status::Resolved).await.unwrap();

    assert_eq!(again.resolved_at, seeded.resolved_at);
    assert_eq!(again.updated_at, clock.now());
}

#[tokio::test]
async fn test_unknown_id_is_not_found_and_changes_nothing() {
    let (store, backend, _) = setup_store();
    let before = store.get_all().await;
    let payload_before = backend.payload();

    let result = store.update_status("nonexistent-id", Status::Resolved).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(store.get_all().await, before);
    assert_eq!(backend.payload(), payload_before);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_round_trip_is_exact() {
    let (store, _, clock) = setup_store();
    store.add(pothole_draft()).await.unwrap();
    clock.advance(Duration::milliseconds(1234));
    store.update_status("4", Status::Resolved).await.unwrap();

    let issues = store.get_all().await;
    let payload = encode_issues(&issues).unwrap();
    let reloaded = decode_issues(&payload).unwrap();

    assert_eq!(reloaded, issues);
    for (a, b) in issues.iter().zip(&reloaded) {
        assert_eq!(a.submitted_at, b.submitted_at);
        assert_eq!(a.updated_at, b.updated_at);
        assert_eq!(a.resolved_at, b.resolved_at);
    }
    assert_eq!(encode_issues(&reloaded).unwrap(), payload);
}

#[tokio::test]
async fn test_slot_layout_uses_iso_strings_and_omits_absent_fields() {
    let (store, backend, _) = setup_store();
    store.get_all().await;

    let payload: serde_json::Value = serde_json::from_str(&backend.payload().unwrap()).unwrap();
    let first = &payload[0];
    assert_eq!(first["submittedAt"], "2025-07-15T10:00:00.000Z");
    assert!(first.get("resolvedAt").is_none());
    assert_eq!(payload[2]["resolvedAt"], "2025-07-18T16:45:00.000Z");
    assert_eq!(payload[2]["type"], "Broken Road");
}

#[tokio::test]
async fn test_json_file_backend_survives_restart() {
    let dir = TempDir::new().unwrap();
    let backend: Arc<dyn StorageBackend> =
        Arc::new(JsonFileBackend::new(dir.path(), "roadit_issues"));
    let store = IssueStore::new(backend.clone());
    let added = store.add(pothole_draft()).await.unwrap();
    drop(store);

    let reopened = IssueStore::new(Arc::new(JsonFileBackend::new(dir.path(), "roadit_issues")));
    let issues = reopened.get_all().await;
    assert_eq!(issues.len(), 5);
    assert_eq!(issues[0], added);
}

#[tokio::test]
async fn test_sqlite_backend_survives_new_store() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let backend = Arc::new(SqliteSlotBackend::new(pool, "roadit_issues").await.unwrap());

    let store = IssueStore::new(backend.clone());
    store.update_status("1", Status::RepairScheduled).await.unwrap();

    let reopened = IssueStore::new(backend);
    assert_eq!(reopened.get("1").await.unwrap().status, Status::RepairScheduled);
}

// =============================================================================
// Degraded paths
// =============================================================================

#[tokio::test]
async fn test_corrupt_slot_is_reset_to_seed() {
    let backend = Arc::new(MemoryBackend::with_payload("{not json"));
    let store = IssueStore::new(backend.clone());

    let issues = store.get_all().await;

    assert_eq!(issues, seed_issues());
    assert_eq!(decode_issues(&backend.payload().unwrap()).unwrap(), seed_issues());
}

#[tokio::test]
async fn test_sub_millisecond_timestamps_load_truncated() {
    let payload = encode_issues(&seed_issues())
        .unwrap()
        .replace("2025-07-15T10:00:00.000Z", "2025-07-15T10:00:00.000789Z");
    assert!(payload.contains(".000789Z"));
    let backend = Arc::new(MemoryBackend::with_payload(payload));
    let store = IssueStore::new(backend.clone());

    let issues = store.get_all().await;

    assert_eq!(issues, seed_issues());
    assert_eq!(
        issues[0].submitted_at,
        Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_slot_violating_invariants_is_reset() {
    let mut broken = seed_issues();
    broken[0].resolved_at = Some(broken[0].updated_at); // status is Received
    let backend = Arc::new(MemoryBackend::with_payload(encode_issues(&broken).unwrap()));
    let store = IssueStore::new(backend.clone());

    assert_eq!(store.get_all().await, seed_issues());
}

#[tokio::test]
async fn test_no_storage_serves_seed_and_accepts_writes_in_memory() {
    let store = IssueStore::new(Arc::new(NoStorage));

    assert_eq!(store.get_all().await.len(), 4);

    let added = store.add(pothole_draft()).await.unwrap();
    assert_eq!(added.status, Status::Received);

    let updated = store.update_status("2", Status::Resolved).await.unwrap();
    assert!(updated.resolved_at.is_some());

    // Nothing persisted: every call starts again from the seed
    assert_eq!(store.get_all().await, seed_issues());
}

/// Slot that reads fine but refuses every write
struct ReadOnlySlot {
    inner: MemoryBackend,
}

impl ReadOnlySlot {
    fn seeded() -> Self {
        let payload = encode_issues(&seed_issues()).unwrap();
        Self {
            inner: MemoryBackend::with_payload(payload),
        }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlySlot {
    fn describe(&self) -> String {
        "read-only".to_string()
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        self.inner.load().await
    }

    async fn save(&self, _payload: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "slot is read-only",
        )))
    }
}

#[tokio::test]
async fn test_failed_write_is_storage_error_and_leaves_slot_unchanged() {
    let backend = Arc::new(ReadOnlySlot::seeded());
    let before = backend.inner.payload();
    let store = IssueStore::new(backend.clone());

    let err = store.add(pothole_draft()).await.unwrap_err();
    assert!(matches!(err, Error::Storage(ref m) if m.contains("read-only")));

    let err = store.update_status("1", Status::Resolved).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    assert_eq!(backend.inner.payload(), before);
    let issues = store.get_all().await;
    assert_eq!(issues, seed_issues());
    assert_eq!(issues[0].status, Status::Received);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_adds_are_all_kept() {
    let store = Arc::new(IssueStore::new(Arc::new(MemoryBackend::new())));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.add(pothole_draft()).await.unwrap() })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 10);
    assert_eq!(store.get_all().await.len(), 14);
}

//! Rollback engine.
//!
//! A rollback copies a stored payload back onto a document and saves it with
//! a rollback marker, so the restore itself shows up in history as a
//! `roll-back` snapshot pointing at its source.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::collection::VersionedCollection;
use crate::error::RewindResult;
use crate::hooks::SaveContext;
use crate::types::{Document, Payload, SnapshotId, SnapshotRecord};

/// Result of a rollback request.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackOutcome {
    /// The document was restored and saved.
    RolledBack {
        /// Snapshot whose state was restored.
        target: SnapshotId,
        /// The roll-back snapshot written by the save.
        snapshot: SnapshotRecord,
    },
    /// No matching snapshot; the document and history are unchanged.
    NothingToRollBack,
}

impl RollbackOutcome {
    /// Whether anything was restored.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. })
    }

    /// The roll-back snapshot, if one was written.
    pub fn snapshot(&self) -> Option<&SnapshotRecord> {
        match self {
            Self::RolledBack { snapshot, .. } => Some(snapshot),
            Self::NothingToRollBack => None,
        }
    }
}

/// Fold payloads oldest to newest into one.
///
/// Later values win. Nested objects are merged key by key; arrays and
/// scalars are replaced wholesale.
pub fn merge_payloads<'a, I>(payloads: I) -> Payload
where
    I: IntoIterator<Item = &'a Payload>,
{
    let mut merged = Payload::new();
    for payload in payloads {
        merge_into(&mut merged, payload);
    }
    merged
}

fn merge_into(dest: &mut Payload, src: &Payload) {
    for (key, value) in src {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (dest.get_mut(key), value) {
            merge_into(existing, incoming);
            continue;
        }
        dest.insert(key.clone(), value.clone());
    }
}

impl VersionedCollection {
    /// Restore a document to the snapshot `snapshot_id`.
    ///
    /// Only snapshots of this document are considered. An unknown id is not
    /// an error: the document is left alone and
    /// [`RollbackOutcome::NothingToRollBack`] is returned. On a storage error
    /// the in-memory document may already carry the restored fields.
    pub async fn rollback_to(
        &self,
        document: &mut Document,
        snapshot_id: SnapshotId,
    ) -> RewindResult<RollbackOutcome> {
        let store = self.history_store().await?;
        let Some(target) = store.find_by_id(snapshot_id, &document.id).await? else {
            debug!(
                "No snapshot {} for {} '{}', nothing to roll back",
                snapshot_id, self.model.model_name, document.id
            );
            return Ok(RollbackOutcome::NothingToRollBack);
        };

        // Delete tombstones restore nothing but still record the rollback.
        let payload = target.payload.unwrap_or_default();
        self.restore(document, &payload, target.id).await
    }

    /// Restore a document to its state as of `until`.
    ///
    /// Payloads of every snapshot taken at or before `until` are merged
    /// oldest first (see [`merge_payloads`]); the newest of them becomes the
    /// rollback target.
    pub async fn rollback_to_time(
        &self,
        document: &mut Document,
        until: DateTime<Utc>,
    ) -> RewindResult<RollbackOutcome> {
        let store = self.history_store().await?;
        let records = store.find_range(&document.id, until).await?;
        let Some(last) = records.last() else {
            debug!(
                "No snapshots of {} '{}' before {}, nothing to roll back",
                self.model.model_name, document.id, until
            );
            return Ok(RollbackOutcome::NothingToRollBack);
        };

        let target = last.id;
        let merged = merge_payloads(records.iter().filter_map(|r| r.payload.as_ref()));
        self.restore(document, &merged, target).await
    }

    async fn restore(
        &self,
        document: &mut Document,
        payload: &Payload,
        target: SnapshotId,
    ) -> RewindResult<RollbackOutcome> {
        debug!(
            "Rolling back {} '{}' to snapshot {}",
            self.model.model_name, document.id, target
        );
        document.apply_payload(payload);
        let snapshot = self
            .save_with(document, SaveContext::rollback(target))
            .await?;
        Ok(RollbackOutcome::RolledBack { target, snapshot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdType;
    use crate::error::{ErrorCode, RewindError};
    use crate::hooks::LifecycleHooks;
    use crate::history::HistoryRegistry;
    use crate::memory::{InMemoryDocumentStore, InMemoryHistoryBackend};
    use crate::projection::Projection;
    use crate::traits::{DocumentStore, HistoryBackend, HistoryStore};
    use crate::types::SnapshotAction;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use mockall::mock;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    mock! {
        pub Store {}

        #[async_trait]
        impl HistoryStore for Store {
            async fn insert(&self, record: &SnapshotRecord) -> RewindResult<()>;
            async fn find_by_id(&self, id: SnapshotId, entity_id: &str) -> RewindResult<Option<SnapshotRecord>>;
            async fn find_range(&self, entity_id: &str, until: DateTime<Utc>) -> RewindResult<Vec<SnapshotRecord>>;
            async fn list(&self, entity_id: &str) -> RewindResult<Vec<SnapshotRecord>>;
            async fn delete_all(&self) -> RewindResult<usize>;
            async fn count(&self) -> RewindResult<usize>;
        }
    }

    struct FixedBackend(Arc<dyn HistoryStore>);

    #[async_trait]
    impl HistoryBackend for FixedBackend {
        async fn open(&self, _store_name: &str, _model_name: &str) -> RewindResult<Arc<dyn HistoryStore>> {
            Ok(self.0.clone())
        }
    }

    fn collection_over(
        backend: Arc<dyn HistoryBackend>,
    ) -> (VersionedCollection, Arc<InMemoryDocumentStore>) {
        let documents = Arc::new(InMemoryDocumentStore::new("User", "users"));
        let registry = Arc::new(HistoryRegistry::new(backend, "-history"));
        let hooks = Arc::new(LifecycleHooks::new(
            registry,
            Arc::new(Projection::Full),
            IdType::String,
        ));
        (VersionedCollection::new(documents.clone(), hooks), documents)
    }

    fn users() -> VersionedCollection {
        collection_over(Arc::new(InMemoryHistoryBackend::new())).0
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let s1 = payload(json!({"a": 1, "tags": ["x"]}));
        let s2 = payload(json!({"b": 2, "tags": ["y", "z"]}));

        let merged = merge_payloads([&s1, &s2]);
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2, "tags": ["y", "z"]}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let s1 = payload(json!({"address": {"city": "Oslo", "zip": "0150"}}));
        let s2 = payload(json!({"address": {"city": "Bergen"}, "name": null}));

        let merged = merge_payloads([&s1, &s2]);
        assert_eq!(
            Value::Object(merged),
            json!({"address": {"city": "Bergen", "zip": "0150"}, "name": null})
        );
    }

    #[tokio::test]
    async fn test_alice_bob_rollback_scenario() {
        let users = users();
        let mut doc = Document::new("u1").with_field("name", "Alice");

        let first = users.save(&mut doc).await.unwrap();
        doc.set("name", "Bob");
        let second = users.save(&mut doc).await.unwrap();
        assert_eq!(second.payload.as_ref().unwrap()["name"], "Bob");

        let outcome = users.rollback_to(&mut doc, first.id).await.unwrap();
        assert!(outcome.is_rolled_back());
        assert_eq!(doc.get_str("name"), Some("Alice"));

        let history = users.history("u1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].action, SnapshotAction::RollBack);
        assert_eq!(history[2].rollback_of, Some(first.id));
        assert_eq!(outcome.snapshot(), Some(&history[2]));

        let stored = users.find("u1").await.unwrap().unwrap();
        assert_eq!(stored.get_str("name"), Some("Alice"));
        assert!(stored.get("rollback_of").is_none());
    }

    #[tokio::test]
    async fn test_next_save_after_rollback_is_update() {
        let users = users();
        let mut doc = Document::new("u1").with_field("name", "Alice");
        let first = users.save(&mut doc).await.unwrap();

        users.rollback_to(&mut doc, first.id).await.unwrap();
        let next = users.save(&mut doc).await.unwrap();

        assert_eq!(next.action, SnapshotAction::Update);
        assert!(next.rollback_of.is_none());
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_snapshot_is_noop() {
        let users = users();
        let mut alice = Document::new("u1").with_field("name", "Alice");
        let mut bob = Document::new("u2").with_field("name", "Bob");
        users.save(&mut alice).await.unwrap();
        let bobs = users.save(&mut bob).await.unwrap();

        let before = alice.clone();
        let outcome = users.rollback_to(&mut alice, bobs.id).await.unwrap();
        assert_eq!(outcome, RollbackOutcome::NothingToRollBack);

        let outcome = users.rollback_to(&mut alice, Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, RollbackOutcome::NothingToRollBack);

        assert_eq!(alice, before);
        assert_eq!(users.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_keeps_fields_missing_from_payload() {
        let users = users();
        let mut doc = Document::new("u1").with_field("name", "Alice");
        let first = users.save(&mut doc).await.unwrap();

        doc.set("name", "Bob");
        doc.set("age", 30);
        users.save(&mut doc).await.unwrap();

        users.rollback_to(&mut doc, first.id).await.unwrap();
        assert_eq!(doc.get_str("name"), Some("Alice"));
        assert_eq!(doc.get("age"), Some(&json!(30)));
    }

    #[tokio::test]
    async fn test_rollback_to_time_merges_payloads() {
        let users = users();
        let store = users.history_store().await.unwrap();
        let t = |secs| Utc.timestamp_opt(secs, 0).unwrap();

        let s1 = SnapshotRecord::created("e1", payload(json!({"a": 1, "tags": ["x"]})))
            .with_timestamp(t(1));
        let s2 = SnapshotRecord::updated("e1", payload(json!({"b": 2, "tags": ["y", "z"]})))
            .with_timestamp(t(2));
        store.insert(&s1).await.unwrap();
        store.insert(&s2).await.unwrap();

        let mut doc = Document::loaded("e1", Payload::new());
        let outcome = users.rollback_to_time(&mut doc, t(3)).await.unwrap();

        match outcome {
            RollbackOutcome::RolledBack { target, snapshot } => {
                assert_eq!(target, s2.id);
                assert_eq!(snapshot.rollback_of, Some(s2.id));
                assert_eq!(
                    snapshot.payload.map(Value::Object),
                    Some(json!({"a": 1, "b": 2, "tags": ["y", "z"]}))
                );
            }
            RollbackOutcome::NothingToRollBack => panic!("expected a rollback"),
        }
        assert_eq!(Value::Object(doc.fields.clone()), json!({"a": 1, "b": 2, "tags": ["y", "z"]}));
    }

    #[tokio::test]
    async fn test_rollback_to_time_respects_upper_bound() {
        let users = users();
        let store = users.history_store().await.unwrap();
        let now = Utc::now();

        let old = SnapshotRecord::created("e1", payload(json!({"v": 1})))
            .with_timestamp(now - Duration::hours(2));
        let new = SnapshotRecord::updated("e1", payload(json!({"v": 2})))
            .with_timestamp(now - Duration::minutes(5));
        store.insert(&old).await.unwrap();
        store.insert(&new).await.unwrap();

        let mut doc = Document::loaded("e1", payload(json!({"v": 2})));
        let outcome = users
            .rollback_to_time(&mut doc, now - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(outcome.snapshot().unwrap().rollback_of, Some(old.id));
        assert_eq!(doc.get("v"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_rollback_to_time_before_history_is_noop() {
        let users = users();
        let mut doc = Document::new("u1");
        users.save(&mut doc).await.unwrap();

        let outcome = users
            .rollback_to_time(&mut doc, Utc::now() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(outcome, RollbackOutcome::NothingToRollBack);
        assert_eq!(users.history("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_error_reaches_caller() {
        let mut store = MockStore::new();
        store.expect_find_by_id().returning(|_, _| {
            Err(RewindError::Storage {
                message: "history unreadable".to_string(),
                code: ErrorCode::StoReadFailed,
                source: None,
            })
        });
        store.expect_insert().never();
        let (users, _) = collection_over(Arc::new(FixedBackend(Arc::new(store))));

        let mut doc = Document::loaded("u1", payload(json!({"name": "Bob"})));
        let before = doc.clone();
        let err = users.rollback_to(&mut doc, Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::StoReadFailed);
        assert_eq!(doc, before);
    }

    #[tokio::test]
    async fn test_failed_rollback_save_leaves_primary_store() {
        let target = SnapshotRecord::created("u1", payload(json!({"name": "Alice"})));
        let target_id = target.id;

        let mut store = MockStore::new();
        store
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(target.clone())));
        store
            .expect_insert()
            .withf(|record| record.action == SnapshotAction::RollBack)
            .returning(|_| Err(RewindError::storage("history unavailable")));
        let (users, documents) = collection_over(Arc::new(FixedBackend(Arc::new(store))));

        let mut doc = Document::loaded("u1", payload(json!({"name": "Bob"})));
        documents.save(&doc).await.unwrap();

        let err = users.rollback_to(&mut doc, target_id).await.unwrap_err();
        assert!(err.is_storage());

        let stored = documents.find("u1").await.unwrap().unwrap();
        assert_eq!(stored.get_str("name"), Some("Bob"));
        // The in-memory document already carries the restored fields.
        assert_eq!(doc.get_str("name"), Some("Alice"));
    }

    #[tokio::test]
    async fn test_rollback_to_tombstone_keeps_fields() {
        let users = users();
        let mut doc = Document::new("u1").with_field("name", "Alice");
        users.save(&mut doc).await.unwrap();
        let tombstone = users.remove(&doc).await.unwrap();

        let outcome = users.rollback_to(&mut doc, tombstone.id).await.unwrap();
        let snapshot = outcome.snapshot().cloned().unwrap();

        assert_eq!(doc.get_str("name"), Some("Alice"));
        assert_eq!(snapshot.action, SnapshotAction::RollBack);
        assert_eq!(snapshot.rollback_of, Some(tombstone.id));
        // The snapshot holds the saved state, nothing was restored over it.
        assert_eq!(snapshot.payload, Some(doc.fields.clone()));

        let stored = users.find("u1").await.unwrap().unwrap();
        assert_eq!(stored.get_str("name"), Some("Alice"));
        assert_eq!(users.history("u1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rollback_to_time_over_tombstones_only() {
        let users = users();
        let store = users.history_store().await.unwrap();
        let t = |secs| Utc.timestamp_opt(secs, 0).unwrap();

        let first = SnapshotRecord::deleted("u1").with_timestamp(t(1));
        let second = SnapshotRecord::deleted("u1").with_timestamp(t(2));
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let mut doc = Document::loaded("u1", Payload::new());
        let outcome = users.rollback_to_time(&mut doc, t(3)).await.unwrap();

        match outcome {
            RollbackOutcome::RolledBack { target, snapshot } => {
                assert_eq!(target, second.id);
                assert_eq!(snapshot.rollback_of, Some(second.id));
                assert_eq!(snapshot.payload, Some(Payload::new()));
            }
            RollbackOutcome::NothingToRollBack => panic!("expected a rollback"),
        }
        assert!(doc.fields.is_empty());
        assert!(users.find("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_to_max_time() {
        let users = users();
        let mut doc = Document::new("u1").with_field("name", "Alice");
        let created = users.save(&mut doc).await.unwrap();

        let outcome = users
            .rollback_to_time(&mut doc, DateTime::<Utc>::MAX_UTC)
            .await
            .unwrap();
        assert_eq!(outcome.snapshot().unwrap().rollback_of, Some(created.id));
    }
}

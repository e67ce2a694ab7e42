//! Sync Module Tests
//!
//! ## Test Scopes
//! - **Handlers**: Idempotent create, replace-not-merge update, no-op repeated delete.
//! - **Failures**: Index errors surface unchanged and are not retried by the handler.
//! - **Registry**: Registration, lookup and dispatch by `<collection>.<kind>`.
//! - **Dispatcher**: End-to-end propagation from the change feed to the index, redelivery,
//!   dead letters and the health report.

#[cfg(test)]
mod tests {
    use crate::error::{Result, SyncError};
    use crate::projection::types::{Fields, IndexEntry, RecordSchema, SchemaCatalog};
    use crate::storage::memory::{MemoryDocumentStore, MemorySearchIndex};
    use crate::storage::provider::{ChangeSource, SearchHit, SearchIndex};
    use crate::sync::dispatcher::{DeliveryPolicy, SyncDispatcher, handle_health};
    use crate::sync::handlers::{SyncHandler, register_sync_handlers};
    use crate::sync::registry::SyncHandlerRegistry;
    use crate::sync::types::{ChangeEvent, ChangeKind};
    use async_trait::async_trait;
    use axum::Extension;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::new()
            .with(RecordSchema::questions("questions"))
            .with(RecordSchema::users("users"))
    }

    /// Index whose write calls fail a fixed number of times before succeeding.
    struct FlakyIndex {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
        inner: Arc<MemorySearchIndex>,
    }

    impl FlakyIndex {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
                inner: MemorySearchIndex::new(),
            })
        }

        fn fail_once(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(SyncError::index("503 Service Unavailable"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SearchIndex for FlakyIndex {
        async fn upsert(&self, index: &str, entry: IndexEntry) -> Result<()> {
            self.fail_once()?;
            self.inner.upsert(index, entry).await
        }

        async fn delete(&self, index: &str, key: &str) -> Result<()> {
            self.fail_once()?;
            self.inner.delete(index, key).await
        }

        async fn query(&self, index: &str, text: &str, filter: Option<&str>) -> Result<Vec<SearchHit>> {
            self.inner.query(index, text, filter).await
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    // ============================================================
    // HANDLER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_created_event_upserts_projection() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::questions("questions"), index.clone());

        let event = ChangeEvent::created(
            "questions",
            "q1",
            fields(json!({"question": "Why?", "description": "Because", "categories": ["math"], "votes": 3})),
        );
        handler.handle(&event).await.unwrap();

        let entry = index.get_entry("questions", "q1").unwrap();
        assert_eq!(entry.fields["question"], "Why?");
        assert!(!entry.fields.contains_key("votes"));
    }

    #[tokio::test]
    async fn test_duplicate_created_event_is_idempotent() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::users("users"), index.clone());
        let event = ChangeEvent::created("users", "u1", fields(json!({"displayName": "Ada"})));

        handler.handle(&event).await.unwrap();
        let once = index.get_entry("users", "u1");

        handler.handle(&event).await.unwrap();

        assert_eq!(index.entry_count("users"), 1);
        assert_eq!(index.get_entry("users", "u1"), once);
    }

    #[tokio::test]
    async fn test_update_replaces_entry_instead_of_merging() {
        let index = MemorySearchIndex::new();
        let schema = RecordSchema::new("notes", "notes", &["a", "b"]);
        let handler = SyncHandler::new(schema, index.clone());

        let before = fields(json!({"a": 1, "b": 2}));
        handler
            .handle(&ChangeEvent::created("notes", "n1", before.clone()))
            .await
            .unwrap();

        handler
            .handle(&ChangeEvent::updated("notes", "n1", before, fields(json!({"a": 1}))))
            .await
            .unwrap();

        let entry = index.get_entry("notes", "n1").unwrap();
        assert_eq!(entry.fields["a"], 1);
        // "b" is no longer in the record, so the entry does not keep its old value
        assert_eq!(entry.fields["b"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_for_absent_entry_creates_it() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::users("users"), index.clone());

        let event = ChangeEvent::updated(
            "users",
            "u2",
            fields(json!({"displayName": "Old"})),
            fields(json!({"displayName": "New"})),
        );
        handler.handle(&event).await.unwrap();

        assert_eq!(index.get_entry("users", "u2").unwrap().fields["displayName"], "New");
    }

    #[tokio::test]
    async fn test_delete_after_delete_is_noop() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::users("users"), index.clone());

        handler
            .handle(&ChangeEvent::created("users", "u3", fields(json!({"displayName": "Lin"}))))
            .await
            .unwrap();

        let delete = ChangeEvent::deleted("users", "u3", None);
        handler.handle(&delete).await.unwrap();
        handler.handle(&delete).await.unwrap();

        assert!(index.get_entry("users", "u3").is_none());
        assert_eq!(index.entry_count("users"), 0);
    }

    #[tokio::test]
    async fn test_created_event_without_snapshot_is_invalid() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::users("users"), index.clone());

        let mut event = ChangeEvent::created("users", "u4", Fields::new());
        event.after = None;

        let result = handler.handle(&event).await;
        assert!(matches!(result, Err(SyncError::InvalidEvent { .. })));
        assert_eq!(index.entry_count("users"), 0);
    }

    #[tokio::test]
    async fn test_event_for_other_collection_is_configuration_error() {
        let index = MemorySearchIndex::new();
        let handler = SyncHandler::new(RecordSchema::users("users"), index);

        let event = ChangeEvent::deleted("questions", "q1", None);
        let result = handler.handle(&event).await;

        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_index_failure_surfaces_without_retry() {
        let index = FlakyIndex::new(1);
        let handler = SyncHandler::new(RecordSchema::users("users"), index.clone());

        let event = ChangeEvent::created("users", "u5", fields(json!({"displayName": "Kay"})));
        let result = handler.handle(&event).await;

        assert!(matches!(result, Err(SyncError::ExternalService { .. })));
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.inner.entry_count("users"), 0);
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[tokio::test]
    async fn test_register_sync_handlers_covers_every_kind() {
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), MemorySearchIndex::new());

        assert_eq!(registry.handler_count(), 6);
        assert_eq!(
            registry.list_handlers(),
            vec![
                "questions.created",
                "questions.deleted",
                "questions.updated",
                "users.created",
                "users.deleted",
                "users.updated",
            ]
        );
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_event_name() {
        let registry = SyncHandlerRegistry::new();
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        registry.register("users.deleted", move |event| {
            let count = call_count_clone.clone();
            async move {
                assert_eq!(event.kind, ChangeKind::Deleted);
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        registry
            .dispatch(&ChangeEvent::deleted("users", "u1", None))
            .await
            .unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registered_handlers_apply_each_kind() {
        let index = MemorySearchIndex::new();
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());

        let created = ChangeEvent::created("users", "u1", fields(json!({"displayName": "Ada"})));
        registry.dispatch(&created).await.unwrap();
        assert_eq!(index.get_entry("users", "u1").unwrap().fields["displayName"], "Ada");

        let updated = ChangeEvent::updated(
            "users",
            "u1",
            fields(json!({"displayName": "Ada"})),
            fields(json!({"displayName": "Ada L."})),
        );
        registry.dispatch(&updated).await.unwrap();
        assert_eq!(index.get_entry("users", "u1").unwrap().fields["displayName"], "Ada L.");

        registry
            .dispatch(&ChangeEvent::deleted("users", "u1", None))
            .await
            .unwrap();
        assert!(index.get_entry("users", "u1").is_none());
    }

    #[tokio::test]
    async fn test_registry_unknown_handler_returns_error() {
        let registry = SyncHandlerRegistry::new();

        let result = registry
            .dispatch(&ChangeEvent::deleted("answers", "a1", None))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("Unknown sync handler"));
    }

    // ============================================================
    // DISPATCHER TESTS
    // ============================================================

    fn fast_policy(max_attempts: usize) -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_worker_assignment_is_stable() {
        let dispatcher = SyncDispatcher::new(SyncHandlerRegistry::new(), 8, fast_policy(1));

        for i in 0..100 {
            let key = format!("q{}", i);
            let worker = dispatcher.worker_for("questions", &key);
            assert!(worker < 8);
            assert_eq!(worker, dispatcher.worker_for("questions", &key));
        }
    }

    #[tokio::test]
    async fn test_deliver_retries_retryable_failures() {
        let index = FlakyIndex::new(2);
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());
        let dispatcher = SyncDispatcher::new(registry, 1, fast_policy(3));

        let event = ChangeEvent::created("users", "u1", fields(json!({"displayName": "Ada"})));
        dispatcher.deliver(&event).await.unwrap();

        assert_eq!(index.calls.load(Ordering::SeqCst), 3);
        assert!(index.inner.get_entry("users", "u1").is_some());
    }

    #[tokio::test]
    async fn test_deliver_gives_up_after_max_attempts() {
        let index = FlakyIndex::new(10);
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());
        let dispatcher = SyncDispatcher::new(registry, 1, fast_policy(2));

        let event = ChangeEvent::deleted("users", "u1", None);
        let result = dispatcher.deliver(&event).await;

        assert!(result.is_err());
        assert_eq!(index.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_events_are_dead_lettered() {
        let store = MemoryDocumentStore::new();
        let index = FlakyIndex::new(usize::MAX);
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());

        let dispatcher = SyncDispatcher::new(registry, 2, fast_policy(2));
        let _handle = dispatcher.clone().start(store.subscribe());

        let event = store.put("users", "u1", fields(json!({"displayName": "Ada"})));
        wait_for(|| dispatcher.dead_letter_count() == 1).await;

        let letters = dispatcher.dead_letters();
        assert_eq!(letters[0].event, event);
        assert!(letters[0].error.contains("503"));
        assert_eq!(index.calls.load(Ordering::SeqCst), 2);

        let health = handle_health(Extension(dispatcher)).await;
        assert_eq!(health.0.status, "degraded");
        assert_eq!(health.0.dead_letters, 1);
    }

    #[tokio::test]
    async fn test_health_is_ok_without_dead_letters() {
        let dispatcher = SyncDispatcher::new(SyncHandlerRegistry::new(), 1, fast_policy(1));

        let health = handle_health(Extension(dispatcher)).await;

        assert_eq!(health.0.status, "ok");
        assert_eq!(health.0.dead_letters, 0);
    }

    #[tokio::test]
    async fn test_deliver_does_not_retry_invalid_events() {
        let index = FlakyIndex::new(0);
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());
        let dispatcher = SyncDispatcher::new(registry, 1, fast_policy(5));

        let mut event = ChangeEvent::created("users", "u1", Fields::new());
        event.after = None;

        let result = dispatcher.deliver(&event).await;
        assert!(matches!(result, Err(SyncError::InvalidEvent { .. })));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatcher_propagates_store_changes_to_index() {
        let store = MemoryDocumentStore::new();
        let index = MemorySearchIndex::new();
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());

        let dispatcher = SyncDispatcher::new(registry, 4, fast_policy(3));
        let _handle = dispatcher.start(store.subscribe());

        store.put("users", "u1", fields(json!({"displayName": "Ada", "email": "a@x.io"})));
        store.put("users", "u2", fields(json!({"displayName": "Bob"})));
        store.put("answers", "a1", fields(json!({"body": "not synchronized"})));

        wait_for(|| index.entry_count("users") == 2).await;

        store.put("users", "u1", fields(json!({"displayName": "Ada L."})));
        wait_for(|| {
            index
                .get_entry("users", "u1")
                .map(|entry| entry.fields["displayName"] == "Ada L.")
                .unwrap_or(false)
        })
        .await;

        store.remove("users", "u2");
        wait_for(|| index.get_entry("users", "u2").is_none()).await;

        let entry = index.get_entry("users", "u1").unwrap();
        assert!(!entry.fields.contains_key("email"));
        assert_eq!(index.entry_count("answers"), 0);
    }

    #[tokio::test]
    async fn test_writes_before_dispatcher_start_are_not_lost() {
        let store = MemoryDocumentStore::new();
        let index = MemorySearchIndex::new();
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());

        // ARRANGE: a burst of writes queued before anything consumes the feed
        let feed = store.subscribe();
        for i in 0..500 {
            store.put("users", &format!("u{}", i), fields(json!({"displayName": i})));
        }
        for i in 0..100 {
            store.remove("users", &format!("u{}", i));
        }

        // ACT
        let dispatcher = SyncDispatcher::new(registry, 4, fast_policy(1));
        let _handle = dispatcher.clone().start(feed);

        // ASSERT
        wait_for(|| {
            index.entry_count("users") == 400
                && (0..100).all(|i| index.get_entry("users", &format!("u{}", i)).is_none())
        })
        .await;
        assert_eq!(store.len("users"), 400);
        assert!(index.get_entry("users", "u0").is_none());
        assert!(index.get_entry("users", "u499").is_some());
        assert_eq!(dispatcher.dead_letter_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatcher_keeps_per_key_order() {
        let store = MemoryDocumentStore::new();
        let index = MemorySearchIndex::new();
        let registry = SyncHandlerRegistry::new();
        register_sync_handlers(&registry, &catalog(), index.clone());

        let dispatcher = SyncDispatcher::new(registry, 4, fast_policy(1));
        let _handle = dispatcher.start(store.subscribe());

        for version in 0..50 {
            store.put(
                "users",
                "u1",
                fields(json!({"displayName": format!("v{}", version)})),
            );
        }

        wait_for(|| {
            index
                .get_entry("users", "u1")
                .map(|entry| entry.fields["displayName"] == "v49")
                .unwrap_or(false)
        })
        .await;
    }
}

//! In-memory document stores for fast, deterministic tests.
//!
//! - [`InMemoryDocumentStore`]: one mutex over every collection, so each
//!   operation (including a conditional update) is atomic
//! - [`RecordingDocumentStore`]: wraps any store and counts calls per
//!   collection

use rsvp_core::store::{
    BoxFuture, Collection, Document, DocumentStore, Patch, Preconditions, Query, StoreError,
    apply_patch,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Collections = HashMap<&'static str, BTreeMap<String, Document>>;

/// In-memory document store.
///
/// Clones share the same data. Every operation yields to the scheduler once
/// before taking the lock, so concurrent tests actually interleave.
///
/// # Example
///
/// ```
/// use rsvp_testing::InMemoryDocumentStore;
/// use rsvp_core::{DocumentStore, Preconditions, StoreError, collections};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), StoreError> {
/// let store = InMemoryDocumentStore::new();
/// store.create(collections::REGISTRATIONS, "R1".into(), json!({ "status": "confirmed" })).await?;
///
/// let guard = Preconditions::new().field_eq("status", json!("confirmed"));
/// let updated = store
///     .update(collections::REGISTRATIONS, "R1".into(), json!({ "status": "checked-in" }), guard.clone())
///     .await?;
/// assert_eq!(updated.version, 2);
///
/// // Same guard again: the document is no longer confirmed
/// let again = store
///     .update(collections::REGISTRATIONS, "R1".into(), json!({ "status": "checked-in" }), guard)
///     .await;
/// assert!(matches!(again, Err(StoreError::PreconditionFailed { .. })));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    data: Arc<Mutex<Collections>>,
    unavailable: Arc<AtomicBool>,
    unavailable_collections: Arc<Mutex<HashSet<&'static str>>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StoreError::Database`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make operations on `collection` alone fail with `StoreError::Database`.
    ///
    /// The inspection helpers ([`len`](Self::len), [`document`](Self::document))
    /// keep working.
    pub fn set_collection_unavailable(&self, collection: Collection, unavailable: bool) {
        if let Ok(mut down) = self.unavailable_collections.lock() {
            if unavailable {
                down.insert(collection.name);
            } else {
                down.remove(collection.name);
            }
        }
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .map(|data| data.get(collection.name).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Returns `true` if `collection` holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    /// Read a document without going through the async interface.
    #[must_use]
    pub fn document(&self, collection: Collection, id: &str) -> Option<Document> {
        self.lock()
            .ok()
            .and_then(|data| data.get(collection.name)?.get(id).cloned())
    }

    /// Every document in `collection`, ordered by id.
    #[must_use]
    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.lock()
            .map(|data| {
                data.get(collection.name)
                    .map(|docs| docs.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unavailable".to_string()));
        }
        self.data
            .lock()
            .map_err(|_| StoreError::Database("store mutex poisoned".to_string()))
    }

    fn lock_for(&self, collection: Collection) -> Result<MutexGuard<'_, Collections>, StoreError> {
        let down = self
            .unavailable_collections
            .lock()
            .is_ok_and(|down| down.contains(collection.name));
        if down {
            return Err(StoreError::Database(format!("{} unavailable", collection.name)));
        }
        self.lock()
    }

    fn find_unique_conflict(
        docs: &BTreeMap<String, Document>,
        collection: Collection,
        id: &str,
        data: &Value,
    ) -> Option<&'static str> {
        collection.unique_fields.iter().copied().find(|field| {
            data.get(*field).is_some_and(|value| {
                !value.is_null()
                    && docs
                        .values()
                        .any(|other| other.id != id && other.field(field) == Some(value))
            })
        })
    }

    fn get_now(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let data = self.lock_for(collection)?;
        Ok(data.get(collection.name).and_then(|docs| docs.get(id)).cloned())
    }

    fn query_now(&self, collection: Collection, query: &Query) -> Result<Vec<Document>, StoreError> {
        let data = self.lock_for(collection)?;
        let docs = data
            .get(collection.name)
            .map(|docs| docs.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    fn create_now(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> Result<Document, StoreError> {
        let mut all = self.lock_for(collection)?;
        let docs = all.entry(collection.name).or_default();
        if docs.contains_key(&id) {
            return Err(StoreError::Duplicate {
                collection: collection.name,
                field: "id".to_string(),
            });
        }
        if let Some(field) = Self::find_unique_conflict(docs, collection, &id, &data) {
            return Err(StoreError::Duplicate {
                collection: collection.name,
                field: field.to_string(),
            });
        }
        let doc = Document {
            id: id.clone(),
            version: 1,
            data,
        };
        docs.insert(id, doc.clone());
        Ok(doc)
    }

    fn update_now(
        &self,
        collection: Collection,
        id: &str,
        patch: &Patch,
        preconditions: &Preconditions,
    ) -> Result<Document, StoreError> {
        let mut all = self.lock_for(collection)?;
        let docs = all.entry(collection.name).or_default();
        let current = docs.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: collection.entity,
            id: id.to_string(),
        })?;
        if !preconditions.is_satisfied_by(&current) {
            return Err(StoreError::PreconditionFailed {
                current: Box::new(current),
            });
        }

        let mut updated = current;
        apply_patch(&mut updated.data, patch);
        if let Some(field) = Self::find_unique_conflict(docs, collection, id, &updated.data) {
            return Err(StoreError::Duplicate {
                collection: collection.name,
                field: field.to_string(),
            });
        }
        updated.version += 1;
        docs.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    fn delete_now(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut all = self.lock_for(collection)?;
        Ok(all
            .get_mut(collection.name)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(
        &self,
        collection: Collection,
        id: String,
    ) -> BoxFuture<'_, Result<Option<Document>, StoreError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.get_now(collection, &id)
        })
    }

    fn query(
        &self,
        collection: Collection,
        query: Query,
    ) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.query_now(collection, &query)
        })
    }

    fn create(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.create_now(collection, id, data)
        })
    }

    fn update(
        &self,
        collection: Collection,
        id: String,
        patch: Patch,
        preconditions: Preconditions,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.update_now(collection, &id, &patch, &preconditions)
        })
    }

    fn delete(&self, collection: Collection, id: String) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.delete_now(collection, &id)
        })
    }
}

/// Kind of store call recorded by [`RecordingDocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get`
    Get,
    /// `query`
    Query,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

/// Wraps a store and counts every call per collection.
///
/// ```
/// use rsvp_testing::{InMemoryDocumentStore, RecordingDocumentStore};
/// use rsvp_core::{DocumentStore, collections};
///
/// # async fn example() -> Result<(), rsvp_core::StoreError> {
/// let store = RecordingDocumentStore::new(InMemoryDocumentStore::new());
/// store.get(collections::REGISTRATIONS, "R1".into()).await?;
/// assert_eq!(store.calls(collections::REGISTRATIONS), 1);
/// assert_eq!(store.calls(collections::EVENTS), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RecordingDocumentStore<S> {
    inner: S,
    counts: Arc<Mutex<HashMap<(&'static str, Operation), usize>>>,
}

impl<S: DocumentStore> RecordingDocumentStore<S> {
    /// Record calls made through `inner`.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of `operation` calls against `collection`.
    #[must_use]
    pub fn count(&self, collection: Collection, operation: Operation) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(&(collection.name, operation)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total calls of any kind against `collection`.
    #[must_use]
    pub fn calls(&self, collection: Collection) -> usize {
        [
            Operation::Get,
            Operation::Query,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
        ]
            .into_iter()
            .map(|op| self.count(collection, op))
            .sum()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.clear();
        }
    }

    fn record(&self, collection: Collection, operation: Operation) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry((collection.name, operation)).or_insert(0) += 1;
        }
    }
}

impl<S: DocumentStore> DocumentStore for RecordingDocumentStore<S> {
    fn get(
        &self,
        collection: Collection,
        id: String,
    ) -> BoxFuture<'_, Result<Option<Document>, StoreError>> {
        self.record(collection, Operation::Get);
        self.inner.get(collection, id)
    }

    fn query(
        &self,
        collection: Collection,
        query: Query,
    ) -> BoxFuture<'_, Result<Vec<Document>, StoreError>> {
        self.record(collection, Operation::Query);
        self.inner.query(collection, query)
    }

    fn create(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        self.record(collection, Operation::Create);
        self.inner.create(collection, id, data)
    }

    fn update(
        &self,
        collection: Collection,
        id: String,
        patch: Patch,
        preconditions: Preconditions,
    ) -> BoxFuture<'_, Result<Document, StoreError>> {
        self.record(collection, Operation::Update);
        self.inner.update(collection, id, patch, preconditions)
    }

    fn delete(&self, collection: Collection, id: String) -> BoxFuture<'_, Result<bool, StoreError>> {
        self.record(collection, Operation::Delete);
        self.inner.delete(collection, id)
    }
}

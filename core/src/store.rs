//! Document store abstraction.
//!
//! Every persisted entity is a JSON document with a string id and a version
//! counter, grouped into a [`Collection`]. The store offers plain reads and
//! writes plus one capability the engine depends on for correctness: an
//! [`update`](DocumentStore::update) whose [`Preconditions`] are checked and
//! applied as a single atomic step.
//!
//! # Example
//!
//! ```no_run
//! use rsvp_core::store::{collections, DocumentStore, Preconditions, StoreError};
//! use serde_json::json;
//!
//! async fn example<S: DocumentStore>(store: &S) -> Result<(), StoreError> {
//!     let doc = store
//!         .create(collections::REGISTRATIONS, "R1".into(), json!({ "status": "confirmed" }))
//!         .await?;
//!
//!     // Only succeeds while the registration is still confirmed
//!     let patch = json!({ "status": "checked-in" });
//!     let conditions = Preconditions::new().field_eq("status", json!("confirmed"));
//!     store
//!         .update(collections::REGISTRATIONS, doc.id, patch, conditions)
//!         .await?;
//!     Ok(())
//! }
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`DocumentStore`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A named group of documents and the top-level fields that must be unique
/// within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    /// Storage name
    pub name: &'static str,
    /// Entity name used in not-found errors
    pub entity: &'static str,
    /// Top-level fields with a uniqueness constraint
    pub unique_fields: &'static [&'static str],
}

/// The collections this platform persists.
pub mod collections {
    use super::Collection;

    /// User records: `{ id, email, displayName, memberships }`
    pub const USERS: Collection = Collection {
        name: "users",
        entity: "User",
        unique_fields: &[],
    };

    /// Externally issued sessions keyed by bearer-token digest
    pub const SESSIONS: Collection = Collection {
        name: "sessions",
        entity: "Session",
        unique_fields: &[],
    };

    /// Organizations; slugs are globally unique
    pub const ORGANIZATIONS: Collection = Collection {
        name: "organizations",
        entity: "Organization",
        unique_fields: &["slug"],
    };

    /// Events
    pub const EVENTS: Collection = Collection {
        name: "events",
        entity: "Event",
        unique_fields: &[],
    };

    /// Registrations; QR hashes are globally unique
    pub const REGISTRATIONS: Collection = Collection {
        name: "registrations",
        entity: "Registration",
        unique_fields: &["qrHash"],
    };

    /// Every collection, for migrations and test stores.
    pub const ALL: [Collection; 5] = [USERS, SESSIONS, ORGANIZATIONS, EVENTS, REGISTRATIONS];
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id, unique within its collection
    pub id: String,
    /// Starts at 1; incremented by every successful update
    pub version: u64,
    /// Document body (a JSON object)
    pub data: Value,
}

impl Document {
    /// Deserialize the body into a typed record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| StoreError::Serialization(format!("document {}: {e}", self.id)))
    }

    /// A top-level field of the body.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Shallow patch: top-level fields replace the stored ones.
pub type Patch = Value;

/// Merge `patch` into `data` one top-level field at a time.
///
/// Non-object patches are ignored.
pub fn apply_patch(data: &mut Value, patch: &Patch) {
    let Some(patch) = patch.as_object() else {
        return;
    };
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }
    if let Some(target) = data.as_object_mut() {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Total order over JSON scalars used for sorting and keyset cursors.
///
/// `null < bool < number < string`; arrays and objects sort last and compare
/// equal to each other.
#[must_use]
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A filtered, ordered, paginated query over one collection.
///
/// Results are ordered ascending by the `order_by` field, ties broken by
/// document id; without `order_by` they are ordered by id alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Equality filters on top-level fields, all of which must match
    pub filters: Vec<(String, Value)>,
    /// Field to order by (ascending)
    pub order_by: Option<String>,
    /// Maximum number of documents to return
    pub limit: Option<usize>,
    /// Keyset cursor: only documents strictly after `(value, id)`
    pub start_after: Option<(Value, String)>,
}

impl Query {
    /// An unfiltered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Order ascending by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Return at most `limit` documents.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the document with sort key `value` and id `id`.
    ///
    /// Without `order_by`, `value` is ignored and the cursor is the id alone.
    #[must_use]
    pub fn start_after(mut self, value: Value, id: impl Into<String>) -> Self {
        self.start_after = Some((value, id.into()));
        self
    }

    /// The sort key of `doc` under this query.
    #[must_use]
    pub fn sort_key(&self, doc: &Document) -> Value {
        self.order_by
            .as_deref()
            .and_then(|field| doc.field(field).cloned())
            .unwrap_or(Value::Null)
    }

    /// Returns `true` if `doc` passes the filters and lies after the cursor.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let filters_match = self
            .filters
            .iter()
            .all(|(field, expected)| doc.field(field) == Some(expected));
        if !filters_match {
            return false;
        }
        match &self.start_after {
            None => true,
            Some((value, id)) => self.compare(doc, value, id) == Ordering::Greater,
        }
    }

    /// Filter, sort and truncate `docs` as the query describes.
    ///
    /// Reference semantics for stores that evaluate queries in memory.
    #[must_use]
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();
        selected.sort_by(|a, b| {
            let key = self.sort_key(b);
            self.compare(a, &key, &b.id)
        });
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }

    fn compare(&self, doc: &Document, key: &Value, id: &str) -> Ordering {
        let by_key = if self.order_by.is_some() {
            compare_json(&self.sort_key(doc), key)
        } else {
            Ordering::Equal
        };
        by_key.then_with(|| doc.id.as_str().cmp(id))
    }
}

/// Conditions a document must meet for an update to be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preconditions {
    /// Exact version the document must be at
    pub version: Option<u64>,
    /// Top-level fields that must equal one of the listed values
    pub fields: Vec<(String, Vec<Value>)>,
}

impl Preconditions {
    /// No conditions: an unconditional update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the document to be at `version`.
    #[must_use]
    pub const fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Require `field == value`.
    #[must_use]
    pub fn field_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.field_one_of(field, vec![value])
    }

    /// Require `field` to equal one of `values`.
    #[must_use]
    pub fn field_one_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields.push((field.into(), values));
        self
    }

    /// Returns `true` if `doc` meets every condition.
    #[must_use]
    pub fn is_satisfied_by(&self, doc: &Document) -> bool {
        self.version.is_none_or(|v| v == doc.version)
            && self.fields.iter().all(|(field, allowed)| {
                doc.field(field)
                    .is_some_and(|actual| allowed.iter().any(|v| v == actual))
            })
    }
}

/// Errors that can occur during document store operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// No document with this id.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name of the collection
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// Id or unique field already taken.
    #[error("Duplicate {field} in {collection}")]
    Duplicate {
        /// Collection name
        collection: &'static str,
        /// `id` or the unique field that collided
        field: String,
    },

    /// The document exists but did not meet the update's conditions.
    #[error("Precondition failed for document {} at version {}", .current.id, .current.version)]
    PreconditionFailed {
        /// The document as it was when the conditions were checked
        current: Box<Document>,
    },

    /// Connection, timeout or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Document store abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// request handler.
///
/// # Implementations
///
/// - **`PostgresDocumentStore`** (production): JSONB rows, conditional `UPDATE`
/// - **`InMemoryDocumentStore`** (testing): one mutex over all collections
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the engine can hold an
/// `Arc<dyn DocumentStore>`.
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    ///
    /// # Errors
    ///
    /// - `Database`: storage unavailable
    fn get(
        &self,
        collection: Collection,
        id: String,
    ) -> BoxFuture<'_, Result<Option<Document>, StoreError>>;

    /// Run a query (see [`Query`] for ordering semantics).
    ///
    /// # Errors
    ///
    /// - `Database`: storage unavailable
    fn query(
        &self,
        collection: Collection,
        query: Query,
    ) -> BoxFuture<'_, Result<Vec<Document>, StoreError>>;

    /// Insert a new document at version 1.
    ///
    /// # Errors
    ///
    /// - `Duplicate`: the id or one of the collection's unique fields is taken
    /// - `Database`: storage unavailable
    fn create(
        &self,
        collection: Collection,
        id: String,
        data: Value,
    ) -> BoxFuture<'_, Result<Document, StoreError>>;

    /// Shallow-merge `patch` into a document if `preconditions` hold.
    ///
    /// The check and the write are one atomic step: concurrent updates with the
    /// same preconditions cannot both succeed. Returns the updated document,
    /// whose version is one higher.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such document
    /// - `PreconditionFailed`: the conditions did not hold; carries the current document
    /// - `Duplicate`: the patch would violate a unique field
    /// - `Database`: storage unavailable
    fn update(
        &self,
        collection: Collection,
        id: String,
        patch: Patch,
        preconditions: Preconditions,
    ) -> BoxFuture<'_, Result<Document, StoreError>>;

    /// Remove a document, releasing its unique fields. Returns `false` if
    /// there was nothing to remove.
    ///
    /// # Errors
    ///
    /// - `Database`: storage unavailable
    fn delete(&self, collection: Collection, id: String) -> BoxFuture<'_, Result<bool, StoreError>>;
}

// ============================================================================
// Entity Store - Schemaless Persistence Layer
// ============================================================================
//
// Generic persistence infrastructure shared by every domain component.
// Records are grouped under ancestor-style keys (Member -> Enrollment) so a
// conditional create touches exactly one entity group.
//
// Backends:
// - memory       - in-process map, used by tests and local development
// - scylla_store - ScyllaDB lightweight transactions (INSERT ... IF NOT EXISTS)
//
// ============================================================================

mod entity;
mod error;
mod key;
pub mod memory;
pub mod scylla_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use entity::{create_entity, from_record, load_entity, query_entities, to_record, Entity};
pub use error::{StoreError, StoreFailure};
pub use key::EntityKey;
pub use memory::{Fault, InMemoryStore, StoreOp};
pub use scylla_store::ScyllaStore;

/// A persisted record: its key, the JSON document, and the timestamp queries
/// order by.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: EntityKey,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created,
    /// The key was already taken; carries the record that holds it.
    AlreadyExists(StoredRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Kind-scoped query. `ancestor == None` selects root entities of the kind,
/// otherwise the direct children of `ancestor`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub ancestor: Option<EntityKey>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Query {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    pub fn ancestor(mut self, ancestor: EntityKey) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort by timestamp (key path breaks ties) and apply the limit.
    pub(crate) fn finish(&self, mut records: Vec<StoredRecord>) -> Vec<StoredRecord> {
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.key.path().cmp(&b.key.path()))
        });
        if self.order == SortOrder::Descending {
            records.reverse();
        }
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}

/// Access pattern every backend must provide.
///
/// `conditional_create` is the only synchronization primitive the domain
/// relies on: for a given key, concurrent calls must be linearized so that
/// exactly one observes `Created`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get(&self, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError>;

    async fn conditional_create(&self, record: StoredRecord) -> Result<CreateOutcome, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<StoredRecord>, StoreError>;

    /// Unconditional upsert. Only profile updates use this.
    async fn put(&self, record: StoredRecord) -> Result<(), StoreError>;
}

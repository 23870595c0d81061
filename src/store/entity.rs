use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CreateOutcome, EntityKey, EntityStore, Query, StoreError, StoredRecord};

// ============================================================================
// Typed Entities
// ============================================================================
//
// Domain types implement `Entity` to be stored as JSON documents. The helpers
// below are the only place payloads cross between serde_json::Value and the
// domain structs.
//
// ============================================================================

pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn kind() -> &'static str
    where
        Self: Sized;

    fn key(&self) -> EntityKey;

    /// Timestamp that queries order by.
    fn timestamp(&self) -> DateTime<Utc>;
}

pub fn to_record<E: Entity>(entity: &E) -> Result<StoredRecord, StoreError> {
    let key = entity.key();
    let payload = serde_json::to_value(entity)
        .map_err(|e| StoreError::InvalidRequest(format!("cannot encode {}: {}", key, e)))?;

    Ok(StoredRecord {
        key,
        payload,
        timestamp: entity.timestamp(),
    })
}

pub fn from_record<E: Entity>(record: StoredRecord) -> Result<E, StoreError> {
    serde_json::from_value(record.payload).map_err(|e| StoreError::Corrupt {
        key: record.key.path(),
        reason: e.to_string(),
    })
}

pub async fn load_entity<E: Entity>(
    store: &dyn EntityStore,
    key: &EntityKey,
) -> Result<Option<E>, StoreError> {
    store.get(key).await?.map(from_record).transpose()
}

/// Insert-if-absent. `None` means this call created the entity; otherwise
/// returns the entity that already holds the key.
pub async fn create_entity<E: Entity>(
    store: &dyn EntityStore,
    entity: &E,
) -> Result<Option<E>, StoreError> {
    match store.conditional_create(to_record(entity)?).await? {
        CreateOutcome::Created => Ok(None),
        CreateOutcome::AlreadyExists(existing) => from_record(existing).map(Some),
    }
}

pub async fn query_entities<E: Entity>(
    store: &dyn EntityStore,
    query: &Query,
) -> Result<Vec<E>, StoreError> {
    store
        .query(query)
        .await?
        .into_iter()
        .map(from_record)
        .collect()
}

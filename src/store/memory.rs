use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CreateOutcome, EntityKey, EntityStore, Query, StoreError, StoredRecord};

// ============================================================================
// In-Memory Entity Store
// ============================================================================
//
// Every operation runs under one lock, so conditional_create is trivially
// linearizable. Faults can be queued per operation to simulate a flaky
// backend, including the ambiguous case where a write commits but the caller
// still sees an error.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    ConditionalCreate,
    Query,
    Put,
}

#[derive(Debug, Clone)]
pub struct Fault {
    pub op: StoreOp,
    pub error: StoreError,
    /// Apply the operation first, then report `error`.
    pub after_commit: bool,
}

#[derive(Default)]
struct Inner {
    records: HashMap<EntityKey, StoredRecord>,
    faults: VecDeque<Fault>,
}

impl Inner {
    fn take_fault(&mut self, op: StoreOp, after_commit: bool) -> Option<StoreError> {
        let index = self
            .faults
            .iter()
            .position(|f| f.op == op && f.after_commit == after_commit)?;
        self.faults.remove(index).map(|f| f.error)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn inject(&self, fault: Fault) {
        self.inner.lock().await.faults.push_back(fault);
    }

    /// Fail the next `op` before it touches any data.
    pub async fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.inject(Fault {
            op,
            error,
            after_commit: false,
        })
        .await;
    }

    /// Let the next `op` commit, then report `error` to the caller.
    pub async fn fail_after_commit(&self, op: StoreOp, error: StoreError) {
        self.inject(Fault {
            op,
            error,
            after_commit: true,
        })
        .await;
    }

    pub async fn count_kind(&self, kind: &str) -> usize {
        self.inner
            .lock()
            .await
            .records
            .keys()
            .filter(|k| k.kind == kind)
            .count()
    }

    pub async fn pending_faults(&self) -> usize {
        self.inner.lock().await.faults.len()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get(&self, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner.take_fault(StoreOp::Get, false) {
            return Err(error);
        }
        Ok(inner.records.get(key).cloned())
    }

    async fn conditional_create(&self, record: StoredRecord) -> Result<CreateOutcome, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner.take_fault(StoreOp::ConditionalCreate, false) {
            return Err(error);
        }

        if let Some(existing) = inner.records.get(&record.key) {
            return Ok(CreateOutcome::AlreadyExists(existing.clone()));
        }
        inner.records.insert(record.key.clone(), record);

        match inner.take_fault(StoreOp::ConditionalCreate, true) {
            Some(error) => Err(error),
            None => Ok(CreateOutcome::Created),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredRecord>, StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner.take_fault(StoreOp::Query, false) {
            return Err(error);
        }

        let matched = inner
            .records
            .values()
            .filter(|r| r.key.kind == query.kind && r.key.parent() == query.ancestor.as_ref())
            .cloned()
            .collect();

        Ok(query.finish(matched))
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner.take_fault(StoreOp::Put, false) {
            return Err(error);
        }
        inner.records.insert(record.key.clone(), record);

        match inner.take_fault(StoreOp::Put, true) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortOrder;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn record(key: EntityKey, offset_secs: i64) -> StoredRecord {
        StoredRecord {
            key,
            payload: json!({ "n": offset_secs }),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_conditional_create_keeps_first_record() {
        let store = InMemoryStore::new();
        let key = EntityKey::root("Member", "u1");

        let first = record(key.clone(), 0);
        let second = record(key.clone(), 5);

        assert_eq!(store.conditional_create(first.clone()).await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            store.conditional_create(second).await.unwrap(),
            CreateOutcome::AlreadyExists(first.clone())
        );
        assert_eq!(store.get(&key).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_concurrent_creates_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let key = EntityKey::root("Member", "u1");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store.conditional_create(record(key, i)).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == CreateOutcome::Created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.count_kind("Member").await, 1);
    }

    #[tokio::test]
    async fn test_query_scopes_to_ancestor_and_orders() {
        let store = InMemoryStore::new();
        let u1 = EntityKey::root("Member", "u1");
        let u2 = EntityKey::root("Member", "u2");

        store.put(record(u1.child("Enrollment", "b"), 10)).await.unwrap();
        store.put(record(u1.child("Enrollment", "a"), 20)).await.unwrap();
        store.put(record(u2.child("Enrollment", "c"), 0)).await.unwrap();
        store.put(record(u1.clone(), 0)).await.unwrap();

        let asc = store
            .query(&Query::kind("Enrollment").ancestor(u1.clone()))
            .await
            .unwrap();
        let names: Vec<_> = asc.iter().map(|r| r.key.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let desc = store
            .query(&Query::kind("Enrollment").ancestor(u1).order(SortOrder::Descending).limit(1))
            .await
            .unwrap();
        assert_eq!(desc.len(), 1);
        assert_eq!(desc[0].key.name, "a");

        let roots = store.query(&Query::kind("Member")).await.unwrap();
        assert_eq!(roots.len(), 1);
    }

    #[tokio::test]
    async fn test_fault_before_commit_leaves_no_record() {
        let store = InMemoryStore::new();
        let key = EntityKey::root("Member", "u1");

        store
            .fail_next(StoreOp::ConditionalCreate, StoreError::Timeout("injected".into()))
            .await;

        let result = store.conditional_create(record(key.clone(), 0)).await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
        assert_eq!(store.get(&key).await.unwrap(), None);
        assert_eq!(store.pending_faults().await, 0);
    }

    #[tokio::test]
    async fn test_fault_after_commit_persists_record() {
        let store = InMemoryStore::new();
        let key = EntityKey::root("Member", "u1");

        store
            .fail_after_commit(StoreOp::ConditionalCreate, StoreError::Timeout("ack lost".into()))
            .await;

        let result = store.conditional_create(record(key.clone(), 0)).await;
        assert!(result.is_err());
        assert!(store.get(&key).await.unwrap().is_some());
    }
}

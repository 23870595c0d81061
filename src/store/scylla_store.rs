use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::unprepared::Statement;
use scylla::statement::Consistency;
use scylla::value::{CqlValue, Row};

use super::{CreateOutcome, EntityKey, EntityStore, Query, StoreError, StoredRecord};

// ============================================================================
// ScyllaDB Entity Store
// ============================================================================
//
// Table layout:
//
//   entities ((kind, ancestor), name) -> payload, ts
//
// A partition holds every entity of one kind under one parent, so all of a
// member's enrollments share a partition and root events share another.
// conditional_create uses INSERT ... IF NOT EXISTS, a Paxos-backed
// lightweight transaction that is linearizable per partition. When it is not
// applied the response carries the winning row, which is decoded directly.
// Queries are paged; with a limit only the best `limit` rows are kept.
//
// ============================================================================

const SELECT_ONE: &str =
    "SELECT payload, ts FROM entities WHERE kind = ? AND ancestor = ? AND name = ?";
const SELECT_CHILDREN: &str =
    "SELECT name, payload, ts FROM entities WHERE kind = ? AND ancestor = ?";
const INSERT_IF_ABSENT: &str =
    "INSERT INTO entities (kind, ancestor, name, payload, ts) VALUES (?, ?, ?, ?, ?) IF NOT EXISTS";
const UPSERT: &str = "INSERT INTO entities (kind, ancestor, name, payload, ts) VALUES (?, ?, ?, ?, ?)";

const QUERY_PAGE_SIZE: i32 = 100;

pub struct ScyllaStore {
    session: Arc<Session>,
}

impl ScyllaStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connect, then create the keyspace and table if they are missing.
    pub async fn connect(uri: &str, keyspace: &str) -> Result<Self> {
        tracing::info!(uri = %uri, keyspace = %keyspace, "Connecting to ScyllaDB...");
        let session: Session = SessionBuilder::new().known_node(uri).build().await?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await?;
        session.use_keyspace(keyspace, false).await?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS entities (
                    kind text,
                    ancestor text,
                    name text,
                    payload text,
                    ts timestamp,
                    PRIMARY KEY ((kind, ancestor), name)
                )",
                &[],
            )
            .await?;

        tracing::info!(keyspace = %keyspace, "✅ Entity table ready");
        Ok(Self::new(Arc::new(session)))
    }

    fn row_values(record: &StoredRecord) -> Result<(String, String, String, String, DateTime<Utc>), StoreError> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
        Ok((
            record.key.kind.clone(),
            record.key.ancestor_path(),
            record.key.name.clone(),
            payload,
            record.timestamp,
        ))
    }

    fn decode(key: EntityKey, payload: &str, timestamp: DateTime<Utc>) -> Result<StoredRecord, StoreError> {
        let payload = serde_json::from_str(payload).map_err(|e| StoreError::Corrupt {
            key: key.path(),
            reason: e.to_string(),
        })?;
        Ok(StoredRecord {
            key,
            payload,
            timestamp,
        })
    }

    /// Point read at SERIAL consistency, so an in-flight Paxos commit is
    /// completed before the row is returned.
    async fn get_serial(&self, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError> {
        let mut statement = Statement::new(SELECT_ONE);
        statement.set_consistency(Consistency::Serial);
        self.read_one(statement, key).await
    }

    async fn read_one(&self, statement: Statement, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError> {
        let result = self
            .session
            .query_unpaged(statement, (&key.kind, key.ancestor_path(), &key.name))
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(|e| corrupt(key, e))?;
        match rows
            .maybe_first_row::<(String, DateTime<Utc>)>()
            .map_err(|e| corrupt(key, e))?
        {
            Some((payload, ts)) => Self::decode(key.clone(), &payload, ts).map(Some),
            None => Ok(None),
        }
    }
}

/// Accumulates streamed rows. With a limit, the buffer is trimmed back to the
/// best `limit` rows whenever it fills, so memory stays bounded regardless of
/// partition size.
struct PageCollector<'q> {
    query: &'q Query,
    records: Vec<StoredRecord>,
    scanned: usize,
}

impl<'q> PageCollector<'q> {
    fn new(query: &'q Query) -> Self {
        Self {
            query,
            records: Vec::new(),
            scanned: 0,
        }
    }

    fn capacity(&self) -> Option<usize> {
        self.query
            .limit
            .map(|limit| limit.saturating_mul(2).max(QUERY_PAGE_SIZE as usize))
    }

    fn push(&mut self, record: StoredRecord) {
        self.records.push(record);
        self.scanned += 1;

        if self.capacity().is_some_and(|cap| self.records.len() >= cap) {
            let buffered = std::mem::take(&mut self.records);
            self.records = self.query.finish(buffered);
        }
    }

    fn finish(self) -> Vec<StoredRecord> {
        self.query.finish(self.records)
    }
}

#[derive(Debug, PartialEq)]
enum LwtOutcome {
    Applied,
    /// Not applied; the response carried the row that holds the key.
    Existing(StoredRecord),
    /// Not applied and the response did not include the existing row.
    NotApplied,
}

/// Interpret an `INSERT ... IF NOT EXISTS` response row. `[applied]` comes
/// first; on conflict the existing row's columns follow, by name.
fn decode_lwt_response(key: &EntityKey, columns: &[String], row: Row) -> Result<LwtOutcome, StoreError> {
    let mut values = columns.iter().map(String::as_str).zip(row.columns);

    match values.next() {
        Some((_, Some(CqlValue::Boolean(true)))) => return Ok(LwtOutcome::Applied),
        Some((_, Some(CqlValue::Boolean(false)))) => {}
        _ => return Err(corrupt(key, "missing [applied] column")),
    }

    let mut payload = None;
    let mut timestamp = None;
    for (name, value) in values {
        match (name, value) {
            ("payload", Some(CqlValue::Text(text))) => payload = Some(text),
            ("ts", Some(CqlValue::Timestamp(ts))) => {
                timestamp = Some(
                    DateTime::<Utc>::from_timestamp_millis(ts.0)
                        .ok_or_else(|| corrupt(key, "timestamp out of range"))?,
                )
            }
            _ => {}
        }
    }

    match (payload, timestamp) {
        (Some(payload), Some(ts)) => Ok(LwtOutcome::Existing(ScyllaStore::decode(key.clone(), &payload, ts)?)),
        _ => Ok(LwtOutcome::NotApplied),
    }
}

// Driver execution errors are treated as transient; the domain only ever
// issues idempotent writes, so retrying them is safe.
fn unavailable(error: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

fn corrupt(key: &EntityKey, error: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        key: key.path(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl EntityStore for ScyllaStore {
    async fn get(&self, key: &EntityKey) -> Result<Option<StoredRecord>, StoreError> {
        let record = self.read_one(Statement::new(SELECT_ONE), key).await?;
        if record.is_some() {
            tracing::debug!(key = %key, "Loaded entity");
        }
        Ok(record)
    }

    async fn conditional_create(&self, record: StoredRecord) -> Result<CreateOutcome, StoreError> {
        let values = Self::row_values(&record)?;
        let result = self
            .session
            .query_unpaged(INSERT_IF_ABSENT, values)
            .await
            .map_err(unavailable)?;

        let rows = result.into_rows_result().map_err(|e| corrupt(&record.key, e))?;
        let columns: Vec<String> = rows
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();
        let row = rows
            .maybe_first_row::<Row>()
            .map_err(|e| corrupt(&record.key, e))?
            .ok_or_else(|| corrupt(&record.key, "empty lightweight transaction response"))?;

        match decode_lwt_response(&record.key, &columns, row)? {
            LwtOutcome::Applied => Ok(CreateOutcome::Created),
            LwtOutcome::Existing(existing) => Ok(CreateOutcome::AlreadyExists(existing)),
            LwtOutcome::NotApplied => match self.get_serial(&record.key).await? {
                Some(existing) => Ok(CreateOutcome::AlreadyExists(existing)),
                // The retry policy re-reads once the winner's commit settles.
                None => Err(StoreError::Contention(record.key.group_root().path())),
            },
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredRecord>, StoreError> {
        let ancestor_path = query
            .ancestor
            .as_ref()
            .map(EntityKey::path)
            .unwrap_or_default();

        let mut statement = Statement::new(SELECT_CHILDREN);
        statement.set_page_size(QUERY_PAGE_SIZE);

        let scope = EntityKey {
            kind: query.kind.clone(),
            name: String::new(),
            parent: query.ancestor.clone().map(Box::new),
        };

        let mut rows = self
            .session
            .query_iter(statement, (&query.kind, &ancestor_path))
            .await
            .map_err(unavailable)?
            .rows_stream::<(String, String, DateTime<Utc>)>()
            .map_err(|e| corrupt(&scope, e))?;

        let mut collector = PageCollector::new(query);
        while let Some((name, payload, ts)) = rows.try_next().await.map_err(unavailable)? {
            let key = EntityKey {
                name,
                ..scope.clone()
            };
            collector.push(Self::decode(key, &payload, ts)?);
        }

        tracing::debug!(
            kind = %query.kind,
            ancestor = %ancestor_path,
            scanned = collector.scanned,
            "Queried entities"
        );
        Ok(collector.finish())
    }

    async fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        let values = Self::row_values(&record)?;
        self.session
            .query_unpaged(UPSERT, values)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortOrder;
    use scylla::value::CqlTimestamp;

    fn columns() -> Vec<String> {
        ["[applied]", "kind", "ancestor", "name", "payload", "ts"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn key() -> EntityKey {
        EntityKey::root("Member", "u1").child("Enrollment", "picnic-2024")
    }

    fn event_record(i: i64) -> StoredRecord {
        StoredRecord {
            key: EntityKey::root("Event", format!("event-{:04}", i)),
            payload: serde_json::json!({ "n": i }),
            timestamp: DateTime::<Utc>::from_timestamp_millis(i * 1000).unwrap(),
        }
    }

    #[test]
    fn test_limited_query_keeps_buffer_bounded() {
        let query = Query::kind("Event").order(SortOrder::Descending).limit(5);
        let mut collector = PageCollector::new(&query);

        // Interleave old and new rows, as partition order is by name, not time.
        for i in (0..1000).map(|i| if i % 2 == 0 { i } else { 1999 - i }) {
            collector.push(event_record(i));
            assert!(collector.records.len() <= QUERY_PAGE_SIZE as usize);
        }
        assert_eq!(collector.scanned, 1000);

        let newest: Vec<i64> = collector
            .finish()
            .iter()
            .map(|r| r.payload["n"].as_i64().unwrap())
            .collect();
        assert_eq!(newest, vec![1998, 1996, 1994, 1992, 1990]);
    }

    #[test]
    fn test_unlimited_query_keeps_everything() {
        let query = Query::kind("Event");
        let mut collector = PageCollector::new(&query);
        for i in (0..250).rev() {
            collector.push(event_record(i));
        }

        let records = collector.finish();
        assert_eq!(records.len(), 250);
        assert_eq!(records[0].payload["n"], 0);
    }

    #[test]
    fn test_applied_insert_is_created() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(true))],
        };
        assert_eq!(
            decode_lwt_response(&key(), &columns()[..1], row).unwrap(),
            LwtOutcome::Applied
        );
    }

    #[test]
    fn test_conflict_decodes_existing_row_from_response() {
        let row = Row {
            columns: vec![
                Some(CqlValue::Boolean(false)),
                Some(CqlValue::Text("Enrollment".into())),
                Some(CqlValue::Text("Member:u1".into())),
                Some(CqlValue::Text("picnic-2024".into())),
                Some(CqlValue::Text(r#"{"comments":"bringing salad"}"#.into())),
                Some(CqlValue::Timestamp(CqlTimestamp(1_700_000_000_000))),
            ],
        };

        let existing = match decode_lwt_response(&key(), &columns(), row).unwrap() {
            LwtOutcome::Existing(record) => record,
            other => panic!("expected Existing, got {:?}", other),
        };

        assert_eq!(existing.key, key());
        assert_eq!(existing.payload["comments"], "bringing salad");
        assert_eq!(existing.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_conflict_without_row_needs_serial_read() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(false))],
        };
        assert_eq!(
            decode_lwt_response(&key(), &columns()[..1], row).unwrap(),
            LwtOutcome::NotApplied
        );
    }

    #[test]
    fn test_missing_applied_flag_is_corrupt() {
        let row = Row { columns: vec![] };
        assert!(matches!(
            decode_lwt_response(&key(), &[], row),
            Err(StoreError::Corrupt { .. })
        ));
    }
}

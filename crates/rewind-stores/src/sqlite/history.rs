//! SQLite history backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rewind_core::error::{ErrorCode, RewindError, RewindResult};
use rewind_core::traits::{HistoryBackend, HistoryStore};
use rewind_core::types::{Payload, SnapshotAction, SnapshotId, SnapshotRecord};
use rusqlite::{params, Connection, Params, Row};
use tracing::debug;
use uuid::Uuid;

use super::{lock, open_connection, quote_ident, sql_error, SharedConnection};

/// Backend opening one table per history store.
pub struct SqliteHistoryBackend {
    conn: SharedConnection,
}

impl SqliteHistoryBackend {
    /// Open (or create) a database at `path`.
    pub fn new(path: impl AsRef<Path>) -> RewindResult<Self> {
        let conn = open_connection(path.as_ref())?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> RewindResult<Self> {
        Self::new(":memory:")
    }

    /// Use an existing connection.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// The underlying connection, for stores that share the database.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

#[async_trait]
impl HistoryBackend for SqliteHistoryBackend {
    async fn open(&self, store_name: &str, model_name: &str) -> RewindResult<Arc<dyn HistoryStore>> {
        let store = SqliteHistoryStore::open(self.conn.clone(), store_name)?;
        debug!(
            "Opened SQLite history table '{}' for model '{}'",
            store_name, model_name
        );
        Ok(Arc::new(store))
    }
}

/// History store backed by one SQLite table.
///
/// Timestamps are stored as microseconds since the epoch; `seq` records
/// insertion order and breaks timestamp ties.
pub struct SqliteHistoryStore {
    conn: SharedConnection,
    name: String,
    table: String,
}

impl SqliteHistoryStore {
    /// Open the table `store_name`, creating it and its indexes if missing.
    pub fn open(conn: Arc<Mutex<Connection>>, store_name: &str) -> RewindResult<Self> {
        let store = Self {
            conn,
            name: store_name.to_string(),
            table: quote_ident(store_name),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn init_schema(&self) -> RewindResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                entity_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                action TEXT NOT NULL
                    CHECK (action IN ('create', 'update', 'roll-back', 'delete')),
                rollback_of TEXT,
                payload TEXT,
                CHECK ((action = 'roll-back') = (rollback_of IS NOT NULL)),
                CHECK ((action = 'delete') = (payload IS NULL))
            );

            CREATE INDEX IF NOT EXISTS {entity_idx}
                ON {table}(entity_id, timestamp);

            CREATE INDEX IF NOT EXISTS {time_idx}
                ON {table}(timestamp);
            "#,
            table = self.table,
            entity_idx = quote_ident(&format!("idx_{}_entity", self.name)),
            time_idx = quote_ident(&format!("idx_{}_timestamp", self.name)),
        ))
        .map_err(sql_error(ErrorCode::StoOpenFailed, "Failed to create history table"))?;

        debug!("History table {} ready", self.table);
        Ok(())
    }

    fn select<P: Params>(&self, filter: &str, params: P) -> RewindResult<Vec<SnapshotRecord>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT id, entity_id, timestamp, action, rollback_of, payload
                   FROM {}
                   {}
                   ORDER BY timestamp ASC, seq ASC"#,
                self.table, filter
            ))
            .map_err(sql_error(ErrorCode::StoReadFailed, "Failed to prepare snapshot query"))?;

        let rows = stmt
            .query_map(params, RawSnapshot::from_row)
            .map_err(sql_error(ErrorCode::StoReadFailed, "Failed to query snapshots"))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(sql_error(ErrorCode::StoReadFailed, "Failed to read snapshot row"))?;
            records.push(raw.into_record()?);
        }
        Ok(records)
    }
}

/// Row as stored, before parsing.
struct RawSnapshot {
    id: String,
    entity_id: String,
    timestamp: i64,
    action: String,
    rollback_of: Option<String>,
    payload: Option<String>,
}

impl RawSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_id: row.get(1)?,
            timestamp: row.get(2)?,
            action: row.get(3)?,
            rollback_of: row.get(4)?,
            payload: row.get(5)?,
        })
    }

    fn into_record(self) -> RewindResult<SnapshotRecord> {
        let timestamp = DateTime::from_timestamp_micros(self.timestamp).ok_or_else(|| {
            RewindError::validation(format!("Invalid snapshot timestamp {}", self.timestamp))
        })?;

        Ok(SnapshotRecord {
            id: parse_snapshot_id(&self.id)?,
            entity_id: self.entity_id,
            timestamp,
            action: SnapshotAction::parse(&self.action)?,
            rollback_of: self
                .rollback_of
                .as_deref()
                .map(parse_snapshot_id)
                .transpose()?,
            payload: self
                .payload
                .as_deref()
                .map(serde_json::from_str::<Payload>)
                .transpose()?,
        })
    }
}

fn parse_snapshot_id(s: &str) -> RewindResult<SnapshotId> {
    Uuid::parse_str(s)
        .map_err(|e| RewindError::validation(format!("Invalid snapshot id '{}': {}", s, e)))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert(&self, record: &SnapshotRecord) -> RewindResult<()> {
        record.validate()?;

        let payload = record
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = lock(&self.conn)?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}
                   (id, entity_id, timestamp, action, rollback_of, payload)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                self.table
            ),
            params![
                record.id.to_string(),
                record.entity_id,
                record.timestamp.timestamp_micros(),
                record.action.as_str(),
                record.rollback_of.map(|id| id.to_string()),
                payload,
            ],
        )
        .map_err(sql_error(ErrorCode::StoWriteFailed, "Failed to insert snapshot"))?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SnapshotId,
        entity_id: &str,
    ) -> RewindResult<Option<SnapshotRecord>> {
        let records = self.select(
            "WHERE id = ?1 AND entity_id = ?2",
            params![id.to_string(), entity_id],
        )?;
        Ok(records.into_iter().next())
    }

    async fn find_range(
        &self,
        entity_id: &str,
        until: DateTime<Utc>,
    ) -> RewindResult<Vec<SnapshotRecord>> {
        self.select(
            "WHERE entity_id = ?1 AND timestamp <= ?2",
            params![entity_id, until.timestamp_micros()],
        )
    }

    async fn list(&self, entity_id: &str) -> RewindResult<Vec<SnapshotRecord>> {
        self.select("WHERE entity_id = ?1", params![entity_id])
    }

    async fn delete_all(&self) -> RewindResult<usize> {
        let conn = lock(&self.conn)?;
        conn.execute(&format!("DELETE FROM {}", self.table), [])
            .map_err(sql_error(ErrorCode::StoDeleteFailed, "Failed to clear history"))
    }

    async fn count(&self) -> RewindResult<usize> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })
            .map_err(sql_error(ErrorCode::StoReadFailed, "Failed to count snapshots"))?;
        Ok(count as usize)
    }
}

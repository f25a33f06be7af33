//! SQLite document store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rewind_core::error::{ErrorCode, RewindResult};
use rewind_core::traits::DocumentStore;
use rewind_core::types::{Document, Payload};
use rusqlite::{params, Connection, OptionalExtension};

use super::{lock, open_connection, quote_ident, sql_error, SharedConnection};

/// Primary store keeping each document as a JSON row.
pub struct SqliteDocumentStore {
    conn: SharedConnection,
    model_name: String,
    collection_name: String,
    table: String,
}

impl SqliteDocumentStore {
    /// Open (or create) a database at `path`.
    pub fn new(
        path: impl AsRef<Path>,
        model_name: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> RewindResult<Self> {
        let conn = open_connection(path.as_ref())?;
        Self::from_connection(Arc::new(Mutex::new(conn)), model_name, collection_name)
    }

    /// Store documents in an existing database, e.g. the history database.
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        model_name: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> RewindResult<Self> {
        let collection_name = collection_name.into();
        let store = Self {
            conn,
            model_name: model_name.into(),
            table: quote_ident(&collection_name),
            collection_name,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> RewindResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                fields TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
            self.table
        ))
        .map_err(sql_error(ErrorCode::StoOpenFailed, "Failed to create document table"))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn find(&self, id: &str) -> RewindResult<Option<Document>> {
        let conn = lock(&self.conn)?;
        let fields: Option<String> = conn
            .query_row(
                &format!("SELECT fields FROM {} WHERE id = ?1", self.table),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error(ErrorCode::StoReadFailed, "Failed to load document"))?;

        match fields {
            Some(json) => {
                let fields: Payload = serde_json::from_str(&json)?;
                Ok(Some(Document::loaded(id, fields)))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, document: &Document) -> RewindResult<()> {
        let fields = serde_json::to_string(&document.fields)?;
        let conn = lock(&self.conn)?;
        conn.execute(
            &format!(
                r#"INSERT INTO {} (id, fields, updated_at) VALUES (?1, ?2, ?3)
                   ON CONFLICT(id) DO UPDATE SET
                       fields = excluded.fields,
                       updated_at = excluded.updated_at"#,
                self.table
            ),
            params![
                document.id,
                fields,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
            ],
        )
        .map_err(sql_error(ErrorCode::StoWriteFailed, "Failed to save document"))?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> RewindResult<bool> {
        let conn = lock(&self.conn)?;
        let removed = conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", self.table), params![id])
            .map_err(sql_error(ErrorCode::StoDeleteFailed, "Failed to remove document"))?;
        Ok(removed > 0)
    }
}

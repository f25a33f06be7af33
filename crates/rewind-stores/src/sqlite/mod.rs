//! SQLite-backed history and document stores.
//!
//! Every history store is its own table inside one database. Document stores
//! may share the connection so documents and their history live in the same
//! file.

mod documents;
mod history;

pub use documents::SqliteDocumentStore;
pub use history::{SqliteHistoryBackend, SqliteHistoryStore};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rewind_core::error::{ErrorCode, RewindError, RewindResult};
use rusqlite::Connection;

/// Connection shared by the stores of one database.
pub(crate) type SharedConnection = Arc<Mutex<Connection>>;

/// Open a database file, creating parent directories. `:memory:` opens a
/// private in-memory database.
pub(crate) fn open_connection(path: &Path) -> RewindResult<Connection> {
    if path.as_os_str() == ":memory:" {
        return Connection::open_in_memory().map_err(|e| {
            RewindError::storage_with_source(
                ErrorCode::StoOpenFailed,
                format!("Failed to open in-memory database: {}", e),
                e,
            )
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Connection::open(path).map_err(|e| {
        RewindError::storage_with_source(
            ErrorCode::StoOpenFailed,
            format!("Failed to open database {}: {}", path.display(), e),
            e,
        )
    })
}

pub(crate) fn lock(conn: &SharedConnection) -> RewindResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RewindError::internal(format!("Failed to acquire connection lock: {}", e)))
}

/// Map a rusqlite error to a storage error with `code`.
pub(crate) fn sql_error(
    code: ErrorCode,
    context: &'static str,
) -> impl FnOnce(rusqlite::Error) -> RewindError {
    move |e| RewindError::storage_with_source(code, format!("{}: {}", context, e), e)
}

/// Quote an identifier for use as a table or index name.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub mod cascade;
pub mod error;
pub mod history;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notifications;
mod notify;
pub mod queries;

pub use cascade::CascadeReport;
pub use error::{DbError, DbResult};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Longest message body accepted on create or edit, in bytes.
pub const MAX_CONTENT_LEN: usize = 4000;

/// The entity store. Every write runs in its own SQLite transaction that
/// either commits fully or rolls back when any step fails.
///
/// The raw connection never leaves this crate, so message content can only
/// change through the edit-recording paths:
///
/// ```compile_fail
/// let db = parley_db::Database::open_in_memory().unwrap();
/// db.with_tx(|tx| {
///     tx.execute("UPDATE messages SET content = 'tampered'", [])?;
///     Ok(())
/// })
/// .unwrap();
/// ```
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database; used by tests and throwaway tooling.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        // Foreign keys stay enforced but never cascade on their own:
        // dependents are removed explicitly by the cascade module.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Run a read-only closure against the connection.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits on `Ok`; the transaction is
    /// dropped (rolled back) on `Err`.
    pub(crate) fn with_tx<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> DbResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Current UTC time as stored in every timestamp column. Fixed-width
/// microsecond RFC 3339, so text order matches time order.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

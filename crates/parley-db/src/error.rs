use thiserror::Error;

pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The entity the caller asked to act on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any transaction was opened.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The acting user may not touch this entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Store failure: constraint violation, busy database, I/O. Not retried.
    #[error("transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when a UNIQUE constraint rejected the write, e.g. a taken username.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Transaction(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

use crate::models::{MessageHistoryRow, MessageRow, NewUser, NotificationRow, Table, UserRow};
use crate::{Database, DbError, DbResult, new_id, now_timestamp};
use rusqlite::{Connection, Row};
use tracing::info;

pub(crate) const USER_COLUMNS: &str = "id, username, email, role, password, created_at";
pub(crate) const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, created_at, edited";
pub(crate) const HISTORY_COLUMNS: &str = "id, message_id, old_content, editor_id, edited_at";
pub(crate) const NOTIFICATION_COLUMNS: &str = "id, user_id, message_id, is_read, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> DbResult<UserRow> {
        if user.username.trim().is_empty() {
            return Err(DbError::Validation("username must not be empty".into()));
        }

        let row = UserRow {
            id: new_id(),
            username: user.username.to_string(),
            email: user.email.to_string(),
            role: user.role.to_string(),
            password: user.password_hash.to_string(),
            created_at: now_timestamp(),
        };

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, username, email, role, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (&row.id, &row.username, &row.email, &row.role, &row.password, &row.created_at),
            )?;
            Ok(())
        })?;

        info!("Created user {} ({})", row.username, row.id);
        Ok(row)
    }

    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
            conn.query_row(&sql, [username], map_user).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_username_by_id(&self, id: &str) -> DbResult<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT username FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or_else(|| DbError::not_found("user", id))
        })
    }

    /// Total number of rows in one table.
    pub fn count_rows(&self, table: Table) -> DbResult<u64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", table.name());
            let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> DbResult<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [id], map_user).optional()
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn query_message_by_id(conn: &Connection, id: &str) -> DbResult<Option<MessageRow>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    conn.query_row(&sql, [id], map_message).optional()
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        password: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        edited: row.get(5)?,
    })
}

pub(crate) fn map_history(row: &Row<'_>) -> rusqlite::Result<MessageHistoryRow> {
    Ok(MessageHistoryRow {
        id: row.get(0)?,
        message_id: row.get(1)?,
        old_content: row.get(2)?,
        editor_id: row.get(3)?,
        edited_at: row.get(4)?,
    })
}

pub(crate) fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message_id: row.get(2)?,
        is_read: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

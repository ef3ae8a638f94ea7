//! Edit capture for message content.
//!
//! [`record_edit`] is the only code that writes `messages.content` after
//! creation. It runs inside the caller's transaction: it reads the committed
//! content, and when the candidate differs it appends a `message_history` row
//! holding the *previous* content before applying the update. Both writes land
//! in the same transaction, so a history row never exists without its edit
//! and vice versa.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::models::{MessageHistoryRow, MessageRow};
use crate::queries::{self, HISTORY_COLUMNS, map_history};
use crate::{Database, DbError, DbResult, new_id, now_timestamp};

/// What [`record_edit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// No message with that id; nothing was written.
    Missing,
    /// Candidate content equals the committed content; nothing was written.
    Unchanged(MessageRow),
    /// A history row was appended and the message updated.
    Recorded {
        message: MessageRow,
        history: MessageHistoryRow,
    },
}

/// Compare `new_content` with the committed content of `message_id` and,
/// if it differs, snapshot the old content and apply the update.
///
/// `editor` is the user to attribute the edit to. `None` attributes it to the
/// message's sender and logs a warning, since nothing else can say who made
/// the change.
pub fn record_edit(
    conn: &Connection,
    message_id: &str,
    new_content: &str,
    editor: Option<&str>,
) -> DbResult<EditOutcome> {
    let Some(current) = queries::query_message_by_id(conn, message_id)? else {
        debug!("Edit of missing message {} skipped", message_id);
        return Ok(EditOutcome::Missing);
    };

    if current.content == new_content {
        return Ok(EditOutcome::Unchanged(current));
    }

    let editor_id = match editor {
        Some(id) => {
            if !queries::user_exists(conn, id)? {
                return Err(DbError::not_found("user", id));
            }
            id.to_string()
        }
        None => {
            warn!(
                "Message {} edited without an editor; attributing to sender {}",
                message_id, current.sender_id
            );
            current.sender_id.clone()
        }
    };

    let history = MessageHistoryRow {
        id: new_id(),
        message_id: current.id.clone(),
        old_content: current.content.clone(),
        editor_id,
        edited_at: now_timestamp(),
    };

    conn.execute(
        "INSERT INTO message_history (id, message_id, old_content, editor_id, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &history.id,
            &history.message_id,
            &history.old_content,
            &history.editor_id,
            &history.edited_at,
        ),
    )?;

    conn.execute(
        "UPDATE messages SET content = ?1, edited = 1 WHERE id = ?2",
        (new_content, message_id),
    )?;

    debug!(
        "Recorded edit {} of message {} by {}",
        history.id, message_id, history.editor_id
    );

    let message = MessageRow {
        content: new_content.to_string(),
        edited: true,
        ..current
    };
    Ok(EditOutcome::Recorded { message, history })
}

/// History rows of one message, newest first. Rows sharing a timestamp fall
/// back to insertion order.
pub(crate) fn query_history(
    conn: &Connection,
    message_id: &str,
) -> DbResult<Vec<MessageHistoryRow>> {
    let sql = format!(
        "SELECT {} FROM message_history
         WHERE message_id = ?1
         ORDER BY edited_at DESC, rowid DESC",
        HISTORY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([message_id], map_history)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl Database {
    /// Edit timeline of a message, newest first.
    pub fn get_history(&self, message_id: &str) -> DbResult<Vec<MessageHistoryRow>> {
        self.with_conn(|conn| {
            if queries::query_message_by_id(conn, message_id)?.is_none() {
                return Err(DbError::not_found("message", message_id));
            }
            query_history(conn, message_id)
        })
    }
}

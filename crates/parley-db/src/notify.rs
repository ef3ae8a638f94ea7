use rusqlite::Connection;
use tracing::debug;

use crate::models::{MessageRow, NotificationRow};
use crate::{DbResult, new_id, now_timestamp};

/// Create the single notification owed for a newly inserted message.
///
/// Must run in the same transaction as the message insert; only
/// `Database::create_message` calls it.
pub(crate) fn dispatch_new_message(
    conn: &Connection,
    message: &MessageRow,
) -> DbResult<NotificationRow> {
    let notification = NotificationRow {
        id: new_id(),
        user_id: message.receiver_id.clone(),
        message_id: message.id.clone(),
        is_read: false,
        created_at: now_timestamp(),
    };

    conn.execute(
        "INSERT INTO notifications (id, user_id, message_id, is_read, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        (
            &notification.id,
            &notification.user_id,
            &notification.message_id,
            &notification.created_at,
        ),
    )?;

    debug!(
        "Notification {} queued for {} about message {} from {}",
        notification.id, message.receiver_id, message.id, message.sender_id
    );
    Ok(notification)
}

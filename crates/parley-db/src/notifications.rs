use tracing::debug;

use crate::models::NotificationRow;
use crate::queries::{NOTIFICATION_COLUMNS, OptionalExt, map_notification};
use crate::{Database, DbError, DbResult};

impl Database {
    /// Notifications addressed to a user, newest first.
    pub fn get_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> DbResult<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let filter = if unread_only { "AND is_read = 0" } else { "" };
            let sql = format!(
                "SELECT {} FROM notifications
                 WHERE user_id = ?1 {}
                 ORDER BY created_at DESC, rowid DESC",
                NOTIFICATION_COLUMNS, filter
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark one of the user's notifications as read. Already-read
    /// notifications are returned as they are. Another user's notification
    /// is reported as missing so its id is not confirmed.
    pub fn mark_read(&self, notification_id: &str, user_id: &str) -> DbResult<NotificationRow> {
        self.with_tx(|tx| {
            let sql = format!(
                "SELECT {} FROM notifications WHERE id = ?1 AND user_id = ?2",
                NOTIFICATION_COLUMNS
            );
            let mut notification = tx
                .query_row(&sql, [notification_id, user_id], map_notification)
                .optional()?
                .ok_or_else(|| DbError::not_found("notification", notification_id))?;

            if !notification.is_read {
                tx.execute(
                    "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                    [notification_id],
                )?;
                notification.is_read = true;
                debug!("Notification {} marked read", notification_id);
            }
            Ok(notification)
        })
    }

    pub fn unread_count(&self, user_id: &str) -> DbResult<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }
}

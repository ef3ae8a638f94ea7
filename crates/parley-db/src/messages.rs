use rusqlite::Connection;
use tracing::info;

use crate::history::{self, EditOutcome};
use crate::models::MessageRow;
use crate::queries::{self, MESSAGE_COLUMNS, map_message};
use crate::{Database, DbError, DbResult, MAX_CONTENT_LEN, new_id, notify, now_timestamp};

impl Database {
    /// Insert a message and its receiver's notification in one transaction.
    pub fn create_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> DbResult<MessageRow> {
        validate_content(content)?;

        let message = self.with_tx(|tx| {
            for id in [sender_id, receiver_id] {
                if !queries::user_exists(tx, id)? {
                    return Err(DbError::not_found("user", id));
                }
            }

            let message = MessageRow {
                id: new_id(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                content: content.to_string(),
                created_at: now_timestamp(),
                edited: false,
            };
            tx.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, created_at, edited)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                (
                    &message.id,
                    &message.sender_id,
                    &message.receiver_id,
                    &message.content,
                    &message.created_at,
                ),
            )?;

            notify::dispatch_new_message(tx, &message)?;
            Ok(message)
        })?;

        info!("Message {} sent from {} to {}", message.id, sender_id, receiver_id);
        Ok(message)
    }

    /// Replace a message's content on behalf of `editor_id`.
    ///
    /// The previous content is kept as a history row attributed to the
    /// editor. Saving identical content returns the message untouched.
    pub fn edit_content(
        &self,
        message_id: &str,
        new_content: &str,
        editor_id: &str,
    ) -> DbResult<MessageRow> {
        validate_content(new_content)?;

        let outcome = self.with_tx(|tx| {
            history::record_edit(tx, message_id, new_content, Some(editor_id))
        })?;

        match outcome {
            EditOutcome::Missing => Err(DbError::not_found("message", message_id)),
            EditOutcome::Unchanged(message) => Ok(message),
            EditOutcome::Recorded { message, history } => {
                info!(
                    "Message {} edited by {} (history {})",
                    message.id, editor_id, history.id
                );
                Ok(message)
            }
        }
    }

    /// Content update with no known editor. The edit is still recorded but
    /// attributed to the sender. Prefer [`Database::edit_content`].
    ///
    /// Returns `None` if the message no longer exists.
    pub fn update_message_content(
        &self,
        message_id: &str,
        new_content: &str,
    ) -> DbResult<Option<MessageRow>> {
        validate_content(new_content)?;

        let outcome =
            self.with_tx(|tx| history::record_edit(tx, message_id, new_content, None))?;

        Ok(match outcome {
            EditOutcome::Missing => None,
            EditOutcome::Unchanged(message) | EditOutcome::Recorded { message, .. } => {
                Some(message)
            }
        })
    }

    pub fn get_message(&self, message_id: &str) -> DbResult<Option<MessageRow>> {
        self.with_conn(|conn| queries::query_message_by_id(conn, message_id))
    }

    /// Messages the user sent or received, newest first.
    pub fn list_messages_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages_for_user(conn, user_id, limit))
    }
}

fn query_messages_for_user(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> DbResult<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {} FROM messages
         WHERE sender_id = ?1 OR receiver_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn validate_content(content: &str) -> DbResult<()> {
    if content.trim().is_empty() {
        return Err(DbError::Validation("message content cannot be empty".into()));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(DbError::Validation(format!(
            "message content exceeds {} bytes",
            MAX_CONTENT_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Table};

    fn setup() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let user = db
                .create_user(&NewUser {
                    username: name,
                    email: "x@y",
                    role: "guest",
                    password_hash: "h",
                })
                .unwrap();
            ids.push(user.id);
        }
        let b = ids.pop().unwrap();
        let a = ids.pop().unwrap();
        (db, a, b)
    }

    #[test]
    fn create_fans_out_one_notification() {
        let (db, a, b) = setup();
        let msg = db.create_message(&a, &b, "hi").unwrap();

        assert!(!msg.edited);
        let notes = db.get_notifications(&b, false).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message_id, msg.id);
        assert!(!notes[0].is_read);
        assert!(db.get_notifications(&a, false).unwrap().is_empty());
    }

    #[test]
    fn self_message_notifies_once() {
        let (db, a, _) = setup();
        db.create_message(&a, &a, "memo").unwrap();
        assert_eq!(db.get_notifications(&a, false).unwrap().len(), 1);
        assert_eq!(db.count_rows(Table::Notifications).unwrap(), 1);
    }

    #[test]
    fn unknown_receiver_creates_nothing() {
        let (db, a, _) = setup();
        let err = db.create_message(&a, "ghost", "hi").unwrap_err();

        assert!(matches!(err, DbError::NotFound { entity: "user", .. }));
        assert_eq!(db.count_rows(Table::Messages).unwrap(), 0);
        assert_eq!(db.count_rows(Table::Notifications).unwrap(), 0);
    }

    #[test]
    fn failed_notification_rolls_back_the_message() {
        let (db, a, b) = setup();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_notify BEFORE INSERT ON notifications
                 BEGIN SELECT RAISE(ABORT, 'notifications offline'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let err = db.create_message(&a, &b, "hi").unwrap_err();
        assert!(matches!(err, DbError::Transaction(_)));
        assert_eq!(db.count_rows(Table::Messages).unwrap(), 0);
        assert_eq!(db.count_rows(Table::Notifications).unwrap(), 0);
        assert!(db.list_messages_for_user(&b, 50).unwrap().is_empty());
    }

    #[test]
    fn invalid_content_is_rejected_up_front() {
        let (db, a, b) = setup();
        assert!(matches!(db.create_message(&a, &b, "   "), Err(DbError::Validation(_))));

        let too_long = "x".repeat(MAX_CONTENT_LEN + 1);
        assert!(matches!(
            db.create_message(&a, &b, &too_long),
            Err(DbError::Validation(_))
        ));

        let msg = db.create_message(&a, &b, "hi").unwrap();
        assert!(matches!(db.edit_content(&msg.id, "", &a), Err(DbError::Validation(_))));
        assert_eq!(db.get_message(&msg.id).unwrap().unwrap().content, "hi");
        assert_eq!(db.count_rows(Table::MessageHistory).unwrap(), 0);
    }

    #[test]
    fn edits_never_add_notifications() {
        let (db, a, b) = setup();
        let msg = db.create_message(&a, &b, "one").unwrap();
        db.edit_content(&msg.id, "two", &a).unwrap();
        db.edit_content(&msg.id, "three", &a).unwrap();

        assert_eq!(db.count_rows(Table::Notifications).unwrap(), 1);
    }

    #[test]
    fn history_is_newest_first() {
        let (db, a, b) = setup();
        let msg = db.create_message(&a, &b, "c0").unwrap();
        for c in ["c1", "c2", "c3", "c4"] {
            db.edit_content(&msg.id, c, &a).unwrap();
        }

        let olds: Vec<String> = db
            .get_history(&msg.id)
            .unwrap()
            .into_iter()
            .map(|h| h.old_content)
            .collect();
        assert_eq!(olds, ["c3", "c2", "c1", "c0"]);
        assert_eq!(db.get_message(&msg.id).unwrap().unwrap().content, "c4");
    }

    #[test]
    fn identical_edit_is_idempotent() {
        let (db, a, b) = setup();
        let msg = db.create_message(&a, &b, "same").unwrap();

        let returned = db.edit_content(&msg.id, "same", &b).unwrap();
        assert_eq!(returned, msg);
        assert_eq!(db.count_rows(Table::MessageHistory).unwrap(), 0);
    }

    #[test]
    fn editing_a_missing_message_is_reported() {
        let (db, a, _) = setup();
        assert!(matches!(
            db.edit_content("gone", "new", &a),
            Err(DbError::NotFound { entity: "message", .. })
        ));
    }

    #[test]
    fn unattributed_update_credits_the_sender() {
        let (db, a, b) = setup();
        let msg = db.create_message(&a, &b, "draft").unwrap();

        let updated = db.update_message_content(&msg.id, "final").unwrap().unwrap();
        assert!(updated.edited);
        assert_eq!(db.get_history(&msg.id).unwrap()[0].editor_id, a);

        assert!(db.update_message_content("gone", "x").unwrap().is_none());
    }

    #[test]
    fn listing_covers_both_directions() {
        let (db, a, b) = setup();
        db.create_message(&a, &b, "out").unwrap();
        db.create_message(&b, &a, "in").unwrap();

        let listed = db.list_messages_for_user(&a, 50).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "in");
        assert_eq!(db.list_messages_for_user(&a, 1).unwrap().len(), 1);
    }
}

//! Explicit cascade deletion.
//!
//! The schema declares no `ON DELETE CASCADE`, so this module is the only
//! place dependents are removed. Every step is a set-based
//! `DELETE ... WHERE`, which makes the whole purge idempotent: a second run,
//! or a run for a user with no rows, affects nothing and succeeds.

use rusqlite::Connection;
use tracing::info;

use crate::{Database, DbError, DbResult};

/// Rows removed by one cascade.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    pub messages: u64,
    pub notifications: u64,
    pub histories: u64,
    /// Surviving messages whose last history row was removed and which
    /// therefore lost their `edited` flag.
    pub messages_unflagged: u64,
    pub user_removed: bool,
}

impl CascadeReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which messages a message-level delete targets.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MessageScope<'a> {
    One(&'a str),
    /// Every message the user sent or received.
    Involving(&'a str),
}

impl MessageScope<'_> {
    fn predicate(&self) -> &'static str {
        match self {
            Self::One(_) => "id = ?1",
            Self::Involving(_) => "sender_id = ?1 OR receiver_id = ?1",
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::One(id) | Self::Involving(id) => id,
        }
    }
}

/// Delete messages and everything a message owns: its history rows and its
/// notification. Owned rows go first so the foreign keys never dangle.
pub(crate) fn delete_messages(
    conn: &Connection,
    scope: MessageScope<'_>,
) -> DbResult<CascadeReport> {
    let owned_by = format!("SELECT id FROM messages WHERE {}", scope.predicate());
    let key = scope.key();

    let histories = conn.execute(
        &format!("DELETE FROM message_history WHERE message_id IN ({})", owned_by),
        [key],
    )?;
    let notifications = conn.execute(
        &format!("DELETE FROM notifications WHERE message_id IN ({})", owned_by),
        [key],
    )?;
    let messages = conn.execute(
        &format!("DELETE FROM messages WHERE {}", scope.predicate()),
        [key],
    )?;

    Ok(CascadeReport {
        messages: messages as u64,
        notifications: notifications as u64,
        histories: histories as u64,
        ..Default::default()
    })
}

/// Remove a user and every row that depends on it. Must run inside one
/// transaction together with nothing else; any error leaves the user and all
/// dependents in place.
pub(crate) fn purge_user(conn: &Connection, user_id: &str) -> DbResult<CascadeReport> {
    // 1. Messages sent or received, with their histories and notifications.
    let mut report = delete_messages(conn, MessageScope::Involving(user_id))?;

    // 2. Notifications addressed to the user that survived step 1.
    report.notifications +=
        conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])? as u64;

    // 3. Edits the user made to other people's messages. Messages left with
    //    no history at all are no longer edited.
    report.messages_unflagged = conn.execute(
        "UPDATE messages SET edited = 0
         WHERE id IN (SELECT message_id FROM message_history WHERE editor_id = ?1)
           AND NOT EXISTS (
               SELECT 1 FROM message_history h
               WHERE h.message_id = messages.id AND h.editor_id != ?1
           )",
        [user_id],
    )? as u64;
    report.histories +=
        conn.execute("DELETE FROM message_history WHERE editor_id = ?1", [user_id])? as u64;

    // 4. The user row itself.
    report.user_removed = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])? > 0;

    Ok(report)
}

impl Database {
    /// Delete a user together with all messages they sent or received,
    /// notifications addressed to them and history rows they authored.
    /// Deleting an unknown user succeeds with an empty report.
    pub fn delete_user(&self, user_id: &str) -> DbResult<CascadeReport> {
        let report = self.with_tx(|tx| purge_user(tx, user_id))?;

        if report.is_empty() {
            info!("Delete of user {} found nothing to remove", user_id);
        } else {
            info!(
                "Deleted user {}: {} messages, {} notifications, {} histories ({} unflagged)",
                user_id,
                report.messages,
                report.notifications,
                report.histories,
                report.messages_unflagged
            );
        }
        Ok(report)
    }

    /// Delete one message with its history and notification.
    /// Only the sender may delete a message.
    pub fn delete_message(
        &self,
        message_id: &str,
        acting_user_id: &str,
    ) -> DbResult<CascadeReport> {
        let report = self.with_tx(|tx| {
            let message = crate::queries::query_message_by_id(tx, message_id)?
                .ok_or_else(|| DbError::not_found("message", message_id))?;
            if message.sender_id != acting_user_id {
                return Err(DbError::Forbidden("only the sender can delete a message".into()));
            }
            delete_messages(tx, MessageScope::One(message_id))
        })?;

        info!(
            "Deleted message {} ({} history rows, {} notifications)",
            message_id, report.histories, report.notifications
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Table, UserRow};

    fn user(db: &Database, name: &str) -> UserRow {
        db.create_user(&NewUser {
            username: name,
            email: "u@example.com",
            role: "guest",
            password_hash: "h",
        })
        .unwrap()
    }

    fn totals(db: &Database) -> [u64; 4] {
        [
            db.count_rows(Table::Users).unwrap(),
            db.count_rows(Table::Messages).unwrap(),
            db.count_rows(Table::MessageHistory).unwrap(),
            db.count_rows(Table::Notifications).unwrap(),
        ]
    }

    fn references_to(db: &Database, user_id: &str) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE sender_id = ?1 OR receiver_id = ?1)
                  + (SELECT COUNT(*) FROM notifications WHERE user_id = ?1)
                  + (SELECT COUNT(*) FROM message_history WHERE editor_id = ?1)",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(n)
        })
        .unwrap()
    }

    #[test]
    fn removes_every_edge_into_the_user() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        let c = user(&db, "c");

        let ab = db.create_message(&a.id, &b.id, "a to b").unwrap();
        db.edit_content(&ab.id, "a to b, edited", &a.id).unwrap();
        db.create_message(&b.id, &a.id, "b to a").unwrap();
        db.create_message(&a.id, &a.id, "note to self").unwrap();

        // c -> b survives, but carries one edit by a and one by c.
        let cb = db.create_message(&c.id, &b.id, "c to b").unwrap();
        db.edit_content(&cb.id, "c to b v2", &a.id).unwrap();
        db.edit_content(&cb.id, "c to b v3", &c.id).unwrap();

        // b -> c survives with a single edit by a, which goes away.
        let bc = db.create_message(&b.id, &c.id, "b to c").unwrap();
        db.edit_content(&bc.id, "b to c v2", &a.id).unwrap();

        assert_eq!(totals(&db), [3, 5, 4, 5]);

        let report = db.delete_user(&a.id).unwrap();
        assert_eq!(
            report,
            CascadeReport {
                messages: 3,
                notifications: 3,
                histories: 3,
                messages_unflagged: 1,
                user_removed: true,
            }
        );

        assert_eq!(references_to(&db, &a.id), 0);
        assert_eq!(totals(&db), [2, 2, 1, 2]);
        assert!(db.get_message(&cb.id).unwrap().unwrap().edited);
        assert!(!db.get_message(&bc.id).unwrap().unwrap().edited);
        assert!(db.get_user_by_id(&b.id).unwrap().is_some());
    }

    #[test]
    fn second_run_is_a_noop() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        db.create_message(&a.id, &b.id, "hi").unwrap();

        assert!(db.delete_user(&a.id).unwrap().user_removed);
        let before = totals(&db);

        let again = db.delete_user(&a.id).unwrap();
        assert!(again.is_empty());
        assert_eq!(totals(&db), before);
    }

    #[test]
    fn user_without_dependents() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");

        let report = db.delete_user(&a.id).unwrap();
        assert_eq!(
            report,
            CascadeReport {
                user_removed: true,
                ..Default::default()
            }
        );
        assert!(db.delete_user("never-existed").unwrap().is_empty());
    }

    #[test]
    fn failed_step_rolls_back_everything() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        db.create_message(&a.id, &b.id, "hi").unwrap();
        let before = totals(&db);

        let err = db
            .with_tx(|tx| {
                purge_user(tx, &a.id)?;
                Err::<(), _>(DbError::Validation("abort".into()))
            })
            .unwrap_err();

        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(totals(&db), before);
        assert!(db.get_user_by_id(&a.id).unwrap().is_some());
    }

    #[test]
    fn skipping_a_dependent_trips_the_foreign_key() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        db.create_message(&a.id, &b.id, "hi").unwrap();

        let err = db
            .with_tx(|tx| {
                tx.execute("DELETE FROM users WHERE id = ?1", [&a.id])?;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, DbError::Transaction(_)));
        assert!(db.get_user_by_id(&a.id).unwrap().is_some());
    }

    #[test]
    fn delete_message_takes_owned_rows() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a");
        let b = user(&db, "b");
        let msg = db.create_message(&a.id, &b.id, "hi").unwrap();
        db.edit_content(&msg.id, "hi!", &a.id).unwrap();

        assert!(matches!(
            db.delete_message(&msg.id, &b.id),
            Err(DbError::Forbidden(_))
        ));

        let report = db.delete_message(&msg.id, &a.id).unwrap();
        assert_eq!((report.messages, report.histories, report.notifications), (1, 1, 1));
        assert_eq!(totals(&db), [2, 0, 0, 0]);

        assert!(matches!(
            db.delete_message(&msg.id, &a.id),
            Err(DbError::NotFound { entity: "message", .. })
        ));
    }
}

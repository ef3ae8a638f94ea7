//! Row → API model conversion. Corrupt ids or timestamps are logged and
//! replaced with defaults rather than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::{MessageHistoryRow, MessageRow, NotificationRow, UserRow};
use parley_types::api::HistoryEntry;
use parley_types::models::{Message, MessageHistory, Notification, Role, User};

fn parse_id(value: &str, field: &str, owner: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", field, value, owner, e);
        Uuid::default()
    })
}

fn parse_timestamp(value: &str, field: &str, owner: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on '{}': {}", field, value, owner, e);
            DateTime::default()
        })
}

pub fn user(row: UserRow) -> User {
    let role = row.role.parse::<Role>().unwrap_or_else(|e| {
        warn!("Corrupt role on user '{}': {}", row.id, e);
        Role::default()
    });
    User {
        id: parse_id(&row.id, "id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        username: row.username,
        email: row.email,
        role,
    }
}

pub fn message(row: MessageRow) -> Message {
    Message {
        id: parse_id(&row.id, "id", &row.id),
        sender_id: parse_id(&row.sender_id, "sender_id", &row.id),
        receiver_id: parse_id(&row.receiver_id, "receiver_id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        edited: row.edited,
        content: row.content,
    }
}

pub fn history(row: MessageHistoryRow) -> MessageHistory {
    MessageHistory {
        id: parse_id(&row.id, "id", &row.id),
        message_id: parse_id(&row.message_id, "message_id", &row.id),
        editor_id: parse_id(&row.editor_id, "editor_id", &row.id),
        edited_at: parse_timestamp(&row.edited_at, "edited_at", &row.id),
        old_content: row.old_content,
    }
}

pub fn history_entry(row: MessageHistoryRow, editor_username: String) -> HistoryEntry {
    HistoryEntry {
        entry: history(row),
        editor_username,
    }
}

pub fn notification(row: NotificationRow) -> Notification {
    Notification {
        id: parse_id(&row.id, "id", &row.id),
        user_id: parse_id(&row.user_id, "user_id", &row.id),
        message_id: parse_id(&row.message_id, "message_id", &row.id),
        is_read: row.is_read,
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
    }
}

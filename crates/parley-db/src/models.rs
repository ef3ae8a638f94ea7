/// Database row types — these map directly to SQLite rows.
/// Distinct from parley-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: String,
    pub edited: bool,
}

impl MessageRow {
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHistoryRow {
    pub id: String,
    pub message_id: String,
    pub old_content: String,
    pub editor_id: String,
    pub edited_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub is_read: bool,
    pub created_at: String,
}

/// Fields needed to register a user. `password` is already hashed.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Messages,
    MessageHistory,
    Notifications,
}

impl Table {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Messages => "messages",
            Self::MessageHistory => "message_history",
            Self::Notifications => "notifications",
        }
    }
}

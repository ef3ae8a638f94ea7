use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageHistory, Role};

// -- JWT Claims --

/// JWT claims issued by the auth endpoints and checked by the
/// bearer middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    /// Username of the recipient.
    pub receiver: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

/// One history row with the editor's name resolved for display.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: MessageHistory,
    pub editor_username: String,
}

/// Edit timeline of one message, newest entry first.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub message: Message,
    pub history: Vec<HistoryEntry>,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

// -- Account --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteAccountRequest {
    /// Must be the literal word `delete`.
    pub confirmation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    pub messages_removed: u64,
    pub notifications_removed: u64,
    pub histories_removed: u64,
}

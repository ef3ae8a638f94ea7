use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use parley_db::DbError;
use parley_db::models::MessageRow;
use parley_types::api::{Claims, EditMessageRequest, HistoryResponse, SendMessageRequest};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, blocking};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// Load a message the caller takes part in. Outsiders get 403, like the
/// web views this API replaces.
fn load_for_participant(
    db: &parley_db::Database,
    message_id: &str,
    user_id: &str,
) -> Result<MessageRow, DbError> {
    let message = db.get_message(message_id)?.ok_or_else(|| DbError::NotFound {
        entity: "message",
        id: message_id.to_string(),
    })?;
    if !message.involves(user_id) {
        return Err(DbError::Forbidden("you are not part of this conversation".into()));
    }
    Ok(message)
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender_id = claims.sub.to_string();

    let row = blocking(&state, move |db| {
        let receiver = db.get_user_by_username(&req.receiver)?.ok_or_else(|| DbError::NotFound {
            entity: "user",
            id: req.receiver.clone(),
        })?;
        db.create_message(&sender_id, &receiver.id, &req.content)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let limit = query.limit.min(200);

    let rows = blocking(&state, move |db| db.list_messages_for_user(&user_id, limit)).await?;

    Ok(Json(rows.into_iter().map(convert::message).collect::<Vec<_>>()))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        load_for_participant(db, &message_id.to_string(), &user_id)
    })
    .await?;

    Ok(Json(convert::message(row)))
}

/// Only the sender may edit; every change is kept in the message history.
pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let editor_id = claims.sub.to_string();
    let content = req.content.trim().to_string();

    let row = blocking(&state, move |db| {
        let mid = message_id.to_string();
        let message = load_for_participant(db, &mid, &editor_id)?;
        if message.sender_id != editor_id {
            return Err(DbError::Forbidden("you can only edit your own messages".into()));
        }
        db.edit_content(&mid, &content, &editor_id)
    })
    .await?;

    Ok(Json(convert::message(row)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    blocking(&state, move |db| db.delete_message(&message_id.to_string(), &user_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let (message, rows, editors) = blocking(&state, move |db| {
        let mid = message_id.to_string();
        let message = load_for_participant(db, &mid, &user_id)?;
        let rows = db.get_history(&mid)?;

        let mut editors: HashMap<String, String> = HashMap::new();
        for row in &rows {
            if !editors.contains_key(&row.editor_id) {
                let name = db.get_username_by_id(&row.editor_id)?;
                editors.insert(row.editor_id.clone(), name);
            }
        }
        Ok((message, rows, editors))
    })
    .await?;

    let history = rows
        .into_iter()
        .map(|row| {
            let username = editors.get(&row.editor_id).cloned().unwrap_or_default();
            convert::history_entry(row, username)
        })
        .collect();

    Ok(Json(HistoryResponse {
        message: convert::message(message),
        history,
    }))
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::api::{Claims, UnreadCountResponse};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, blocking};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.get_notifications(&user_id, query.unread)).await?;

    Ok(Json(rows.into_iter().map(convert::notification).collect::<Vec<_>>()))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let unread = blocking(&state, move |db| db.unread_count(&user_id)).await?;

    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        db.mark_read(&notification_id.to_string(), &user_id)
    })
    .await?;

    Ok(Json(convert::notification(row)))
}

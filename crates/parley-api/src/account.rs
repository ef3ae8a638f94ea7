use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use parley_types::api::{Claims, DeleteAccountRequest, DeleteAccountResponse};

use parley_db::DbError;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, blocking};

/// The caller's own profile.
pub async fn get_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        db.get_user_by_id(&user_id)?.ok_or(DbError::NotFound {
            entity: "user",
            id: user_id,
        })
    })
    .await?;

    Ok(Json(convert::user(row)))
}

/// Delete the caller's account and everything that depends on it.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.confirmation.trim().to_lowercase() != "delete" {
        return Err(ApiError::BadRequest("type 'delete' to confirm account deletion".into()));
    }

    let user_id = claims.sub.to_string();
    let report = blocking(&state, move |db| db.delete_user(&user_id)).await?;

    info!("Account {} ({}) deleted", claims.username, claims.sub);
    Ok(Json(DeleteAccountResponse {
        messages_removed: report.messages,
        notifications_removed: report.notifications,
        histories_removed: report.histories,
    }))
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use parley_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};

/// Extract and validate JWT from Authorization header.
///
/// Tokens of deleted accounts are rejected even if not yet expired.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    let user_id = token_data.claims.sub.to_string();
    let exists =
        blocking(&state, move |db| db.get_user_by_id(&user_id).map(|u| u.is_some())).await?;
    if !exists {
        debug!("Rejected token for deleted user {}", token_data.claims.sub);
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

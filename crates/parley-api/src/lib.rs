pub mod account;
pub mod auth;
pub mod convert;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All routes, without transport layers (CORS, tracing); the server adds those.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/messages", get(messages::list_messages).post(messages::send_message))
        .route(
            "/messages/{message_id}",
            get(messages::get_message)
                .patch(messages::edit_message)
                .delete(messages::delete_message),
        )
        .route("/messages/{message_id}/history", get(messages::get_history))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/account", get(account::get_account).delete(account::delete_account))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

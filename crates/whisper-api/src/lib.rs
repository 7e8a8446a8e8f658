pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notifications;
pub mod prayers;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::error;

use whisper_db::Database;
use whisper_notify::Notifier;

use crate::error::ApiError;
use crate::middleware::require_auth;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub notifier: Notifier,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String) -> AppState {
        let notifier = Notifier::new(db.clone());
        Arc::new(Self {
            db,
            notifier,
            jwt_secret,
        })
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> whisper_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(e)
        })?
        .map_err(ApiError::from)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/me", get(users::me).patch(users::update_settings))
        .route("/prayers", get(prayers::list).post(prayers::create))
        .route("/prayers/{id}", get(prayers::detail))
        .route("/prayers/{id}/respond", post(prayers::respond))
        .route("/prayers/{id}/updates", post(prayers::post_update))
        .route("/prayers/{id}/close", post(prayers::close))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

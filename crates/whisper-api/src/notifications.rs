use axum::{Extension, Json, extract::State, response::IntoResponse};

use whisper_types::api::Claims;

use crate::error::ApiError;
use crate::extract::PathId;
use crate::{AppState, blocking, convert};

/// Caller's notifications, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let rows = blocking(move || db.list_notifications(&user_id)).await?;

    Ok(Json(
        rows.into_iter()
            .map(convert::notification)
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    PathId(notification_id): PathId,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let row =
        blocking(move || db.mark_notification_read(&notification_id.to_string(), &user_id))
            .await?;

    Ok(Json(convert::notification(row)?))
}

use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use whisper_db::Error as StoreError;
use whisper_types::api::{Claims, UpdateSettingsRequest};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::{AppState, blocking, convert};

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let user = blocking(move || db.get_user_by_id(&user_id))
        .await?
        .ok_or(StoreError::NotFound("user"))?;

    Ok(Json(convert::user_profile(user)?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let volunteered = req.volunteered_to_pray;
    let user = blocking(move || db.set_volunteered_to_pray(&user_id, volunteered)).await?;

    info!(user_id = %claims.sub, volunteered, "Settings updated");
    Ok(Json(convert::user_profile(user)?))
}

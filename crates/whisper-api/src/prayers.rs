use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use whisper_types::api::{
    Claims, CreatePrayerRequest, FeedQuery, PostUpdateRequest, RespondRequest,
};

use crate::error::ApiError;
use crate::extract::{JsonBody, PathId};
use crate::{AppState, blocking, convert};

// Every mutating handler follows the same shape: run the unit of work on the
// blocking pool, and only once it has committed hand its payload to the
// notifier.

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreatePrayerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let requester_id = claims.sub.to_string();
    let (prayer, fan_out) =
        blocking(move || db.create_prayer(&requester_id, req.title.as_deref(), &req.body)).await?;

    state.notifier.fan_out(fan_out).await;

    Ok((StatusCode::CREATED, Json(convert::prayer_summary(prayer)?)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let viewer_id = claims.sub.to_string();
    let rows = blocking(move || db.list_prayers(&viewer_id, query.include_closed)).await?;

    Ok(Json(
        rows.into_iter()
            .map(convert::prayer_summary)
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

pub async fn detail(
    State(state): State<AppState>,
    PathId(prayer_id): PathId,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let viewer_id = claims.sub.to_string();
    let detail =
        blocking(move || db.get_prayer_detail(&prayer_id.to_string(), &viewer_id)).await?;

    Ok(Json(convert::prayer_detail(detail)?))
}

/// The body is optional: an empty body is a quick "praying" response.
pub async fn respond(
    State(state): State<AppState>,
    PathId(prayer_id): PathId,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: RespondRequest = if body.is_empty() {
        RespondRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?
    };

    let db = state.db.clone();
    let actor_id = claims.sub.to_string();
    let (response, fan_out) = blocking(move || {
        db.respond(&actor_id, &prayer_id.to_string(), req.message.as_deref())
    })
    .await?;

    state.notifier.fan_out(fan_out).await;

    Ok((StatusCode::CREATED, Json(convert::prayer_response(response)?)))
}

pub async fn post_update(
    State(state): State<AppState>,
    PathId(prayer_id): PathId,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let actor_id = claims.sub.to_string();
    let (update, fan_out) =
        blocking(move || db.post_update(&actor_id, &prayer_id.to_string(), &req.body)).await?;

    state.notifier.fan_out(fan_out).await;

    Ok((StatusCode::CREATED, Json(convert::prayer_update(update)?)))
}

pub async fn close(
    State(state): State<AppState>,
    PathId(prayer_id): PathId,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let actor_id = claims.sub.to_string();
    let (prayer, fan_out) =
        blocking(move || db.close_prayer(&actor_id, &prayer_id.to_string())).await?;

    state.notifier.fan_out(fan_out).await;

    Ok(Json(convert::prayer_summary(prayer)?))
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use whisper_db::Error as StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn internal(e: impl Into<anyhow::Error>) -> Self {
        Self::Internal(e.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                StoreError::Validation(_)
                | StoreError::ClosedRequest
                | StoreError::AlreadyClosed
                | StoreError::SelfResponse => StatusCode::BAD_REQUEST,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::DuplicateResponse | StoreError::EmailTaken => StatusCode::CONFLICT,
                StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) | Self::Store(StoreError::Internal(e)) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let cases = [
            (StoreError::Validation("x"), StatusCode::BAD_REQUEST),
            (StoreError::NotFound("prayer request"), StatusCode::NOT_FOUND),
            (StoreError::Forbidden("x"), StatusCode::FORBIDDEN),
            (StoreError::ClosedRequest, StatusCode::BAD_REQUEST),
            (StoreError::AlreadyClosed, StatusCode::BAD_REQUEST),
            (StoreError::SelfResponse, StatusCode::BAD_REQUEST),
            (StoreError::DuplicateResponse, StatusCode::CONFLICT),
            (StoreError::EmailTaken, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = ApiError::from(StoreError::Internal(anyhow::anyhow!("disk I/O error")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

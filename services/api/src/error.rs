use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forge_core::ForgeError;
use serde_json::json;

/// Errors a handler can return; rendered as `{"detail": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Core(#[from] ForgeError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(ForgeError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(
                ForgeError::InvalidScore(_)
                | ForgeError::InvalidTopic(_)
                | ForgeError::NoTopicsAvailable,
            ) => StatusCode::BAD_REQUEST,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors_to_status_codes() {
        let cases = [
            (ForgeError::SessionNotFound("sess_x".into()), StatusCode::NOT_FOUND),
            (ForgeError::InvalidScore(11.0), StatusCode::BAD_REQUEST),
            (ForgeError::InvalidTopic(String::new()), StatusCode::BAD_REQUEST),
            (
                ForgeError::UpstreamUnavailable("redis".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
        assert_eq!(
            ApiError::BadRequest("user_id is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ShellError
///
/// Failures of the `/shell/*` control API. Responses only carry a short message,
/// never upstream payloads.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("no page is registered at {0}")]
    UnknownRoute(String),

    #[error("{0}")]
    Logout(String),
}

impl IntoResponse for ShellError {
    fn into_response(self) -> Response {
        let status = match self {
            ShellError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
            ShellError::Logout { .. } => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

//! Pieces shared by the manager and worker HTTP surfaces.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Error body returned by both APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrResponse {
    #[serde(rename = "HTTPStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "Message")]
    pub message: String,
}

impl ErrResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ErrResponse {
            http_status_code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Every body decoding failure is a 400, whatever axum classified it as.
pub fn decode_error(rejection: JsonRejection) -> ErrResponse {
    let message = format!("error decoding body: {}", rejection.body_text());
    warn!(%message, "rejected request body");
    ErrResponse::new(StatusCode::BAD_REQUEST, message)
}

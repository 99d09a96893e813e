//! Request-level errors for the HTTP layer.
//!
//! The triage and dispatch core never fails. These errors cover transport
//! problems only, such as a multipart body that cannot be read.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The multipart report form could not be read.
    #[error("Malformed report form: {0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Multipart(e) => e.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

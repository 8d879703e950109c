//! HTTP-facing errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers
#[derive(Error, Debug)]
pub enum WebError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure the user cannot fix; details are only shown in debug mode
    #[error("{message}")]
    Internal { message: String, expose: bool },
}

impl WebError {
    pub fn internal(err: impl fmt::Display, production: bool) -> Self {
        WebError::Internal {
            message: err.to_string(),
            expose: !production,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not Found: {}", what)).into_response(),
            WebError::Internal { message, expose } => {
                error!(error = %message, "Request failed");
                let body = if expose {
                    format!("Internal Server Error: {}", message)
                } else {
                    "Internal Server Error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

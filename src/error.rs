//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::state::ClientId;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Realm advertised to callers that fail authentication
const AUTH_CHALLENGE: &str = "Basic realm=\"Login Required\"";

/// Application-level error types
///
/// Every failure of a command request is represented by this enum and turned
/// into a response at the dispatch boundary; none of them stop the server.
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential check failed
    #[error("Unauthorized")]
    Unauthorized,

    /// Command line is missing the tokens its command requires
    #[error("Invalid command format: {0}")]
    MalformedRequest(String),

    /// Command line is well formed but names no known command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Client with the given ID is not registered
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownCommand(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ClientNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        let mut response = (status, body).into_response();
        if matches!(self, AppError::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_CHALLENGE),
            );
        }
        response
    }
}

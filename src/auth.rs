//! Request authentication
//!
//! Every command request must carry HTTP Basic credentials matching the
//! single shared credential pair from the configuration. The check itself is
//! behind the `Authenticator` trait so the router never looks at raw
//! credentials.

use crate::config::AuthConfig;
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::sync::Arc;
use tracing::warn;

/// Decides whether a request is authorized
pub trait Authenticator: Send + Sync {
    /// `authorization` is the raw `Authorization` header, if present
    fn authorize(&self, authorization: Option<&str>) -> bool;
}

/// Authenticator shared by the router
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// HTTP Basic check against one username/password pair
#[derive(Clone)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    /// Create an authenticator accepting exactly this pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create an authenticator from the loaded configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl Authenticator for BasicAuthenticator {
    fn authorize(&self, authorization: Option<&str>) -> bool {
        let Some(encoded) = authorization.and_then(|value| value.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };

        match decoded.split_once(':') {
            Some((username, password)) => username == self.username && password == self.password,
            None => false,
        }
    }
}

/// Middleware rejecting requests that fail the credential check
pub async fn require_auth(
    State(authenticator): State<SharedAuthenticator>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !authenticator.authorize(authorization) {
        warn!(
            uri = %request.uri(),
            header_present = authorization.is_some(),
            "Authentication failed"
        );
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

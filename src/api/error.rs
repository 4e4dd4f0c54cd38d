use crate::application_port::*;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// True when the session was torn down and the user has to sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Gateway(GatewayError::SessionExpired { .. }))
    }
}

/// Reasons the authenticated gateway could not be set up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid refresh path {path:?}: {source}")]
    RefreshPath {
        path: String,
        source: url::ParseError,
    },
    #[error("invalid header name {0:?}")]
    HeaderName(String),
    #[error("invalid upstream status {0}")]
    Status(u16),
}

use crate::domain_model::*;
use crate::domain_port::*;
use reqwest::StatusCode;
use reqwest::header::HeaderName;
use url::Url;

pub const DEFAULT_REFRESH_TOKEN_HEADER: &str = "x-refresh-token";
pub const DEFAULT_ROTATED_ACCESS_TOKEN_HEADER: &str = "x-access-token";
pub const DEFAULT_ROTATED_REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// Side-channel header carrying the refresh token on outgoing requests.
    pub refresh_token: HeaderName,
    pub rotated_access_token: HeaderName,
    pub rotated_refresh_token: HeaderName,
}

impl Default for AuthHeaders {
    fn default() -> Self {
        Self {
            refresh_token: HeaderName::from_static(DEFAULT_REFRESH_TOKEN_HEADER),
            rotated_access_token: HeaderName::from_static(DEFAULT_ROTATED_ACCESS_TOKEN_HEADER),
            rotated_refresh_token: HeaderName::from_static(DEFAULT_ROTATED_REFRESH_TOKEN_HEADER),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub refresh_url: Url,
    pub headers: AuthHeaders,
    /// Statuses reported to the user as "upstream unavailable".
    pub upstream_unavailable: Vec<StatusCode>,
}

impl GatewayConfig {
    pub fn new(refresh_url: Url) -> Self {
        Self {
            refresh_url,
            headers: AuthHeaders::default(),
            upstream_unavailable: vec![StatusCode::BAD_GATEWAY],
        }
    }
}

/// Profile fields returned alongside a refreshed token pair.
#[derive(Debug, Clone, Default)]
pub struct RefreshedSession {
    pub user_id: Option<serde_json::Value>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("no access or refresh token to refresh with")]
    MissingCredentials,
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error("could not encode refresh request: {0}")]
    Encode(String),
    #[error("malformed refresh response: {0}")]
    MalformedBody(String),
    #[error("refresh transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("session store error: {0}")]
    Store(String),
    #[error("token refresh is not available on this client")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session expired ({}): {cause}", .response.status)]
    SessionExpired {
        response: ApiResponse,
        cause: String,
    },
}

#[async_trait::async_trait]
pub trait RequestGateway: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;
    async fn refresh_tokens(&self) -> Result<RefreshedSession, RefreshError>;
    fn has_auth_middleware(&self) -> bool;
}

use crate::api::*;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_reqwest::*;
use reqwest::header::HeaderName;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Refresh endpoint, relative to the base URL.
    pub refresh_path: String,
    pub timeout: Duration,
    pub upstream_unavailable: Vec<u16>,
    pub refresh_token_header: String,
    pub rotated_access_token_header: String,
    pub rotated_refresh_token_header: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            upstream_unavailable: vec![StatusCode::BAD_GATEWAY.as_u16()],
            refresh_token_header: DEFAULT_REFRESH_TOKEN_HEADER.to_string(),
            rotated_access_token_header: DEFAULT_ROTATED_ACCESS_TOKEN_HEADER.to_string(),
            rotated_refresh_token_header: DEFAULT_ROTATED_REFRESH_TOKEN_HEADER.to_string(),
        }
    }
}

/// Request-issuing client with the authenticated gateway installed.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Option<Url>,
    gateway: Arc<dyn RequestGateway>,
}

impl ApiClient {
    /// Never fails: a configuration the gateway cannot use yields a client
    /// that sends requests without auth middleware.
    pub fn new(
        base_url: &str,
        options: ClientOptions,
        session_store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(options.timeout));
        Self::with_transport(base_url, options, transport, session_store, notifier)
    }

    pub fn with_transport(
        base_url: &str,
        options: ClientOptions,
        transport: Arc<dyn HttpTransport>,
        session_store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let parsed = parse_base_url(base_url);
        let config = parsed
            .as_ref()
            .map_err(|e| SetupError::BaseUrl {
                url: base_url.to_string(),
                source: *e,
            })
            .and_then(|base| gateway_config(base, &options));

        match config {
            Ok(config) => {
                info!(base_url, refresh_url = %config.refresh_url, "api client ready");
                Self {
                    base_url: parsed.ok(),
                    gateway: Arc::new(AuthenticatedGateway::new(
                        transport,
                        session_store,
                        notifier,
                        config,
                    )),
                }
            }
            Err(e) => {
                warn!(error = %e, "gateway setup failed; sending requests without auth middleware");
                Self {
                    base_url: parsed.ok(),
                    gateway: Arc::new(PassthroughGateway::new(transport)),
                }
            }
        }
    }

    pub fn has_auth_middleware(&self) -> bool {
        self.gateway.has_auth_middleware()
    }

    /// Absolute URLs pass through; anything else is joined onto the base.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::InvalidUrl(e.to_string()));
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| ApiError::InvalidUrl(format!("no usable base url for {path}")))?;
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn refresh_tokens(&self) -> Result<RefreshedSession, RefreshError> {
        self.gateway.refresh_tokens().await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = ApiRequest::get(self.url(path)?);
        self.fetch_json(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json_request(Method::POST, path, body).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json_request(Method::PUT, path, body).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json_request(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::new(Method::DELETE, self.url(path)?);
        ensure_success(self.send(request).await?)
    }

    async fn json_request<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(method, self.url(path)?)
            .with_json_body(body)
            .map_err(ApiError::Encode)?;
        self.fetch_json(request).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = ensure_success(self.send(request).await?)?;
        // Empty bodies decode as `null` so `()` and `Option<_>` work.
        let body: &[u8] = if response.body.is_empty() {
            b"null"
        } else {
            &response.body
        };
        serde_json::from_slice(body).map_err(ApiError::Decode)
    }
}

fn ensure_success(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::Status {
        status: response.status,
        body: response.text().into_owned(),
    })
}

/// The base always ends in `/` so joined paths extend it instead of
/// replacing its last segment.
fn parse_base_url(base_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn gateway_config(base: &Url, options: &ClientOptions) -> Result<GatewayConfig, SetupError> {
    let refresh_url = base
        .join(options.refresh_path.trim_start_matches('/'))
        .map_err(|source| SetupError::RefreshPath {
            path: options.refresh_path.clone(),
            source,
        })?;

    let headers = AuthHeaders {
        refresh_token: header_name(&options.refresh_token_header)?,
        rotated_access_token: header_name(&options.rotated_access_token_header)?,
        rotated_refresh_token: header_name(&options.rotated_refresh_token_header)?,
    };

    let upstream_unavailable = options
        .upstream_unavailable
        .iter()
        .map(|code| StatusCode::from_u16(*code).map_err(|_| SetupError::Status(*code)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GatewayConfig {
        refresh_url,
        headers,
        upstream_unavailable,
    })
}

fn header_name(name: &str) -> Result<HeaderName, SetupError> {
    HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| SetupError::HeaderName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::*;
    use reqwest::header::AUTHORIZATION;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Profile {
        name: String,
    }

    fn client(base_url: &str, options: ClientOptions, transport: FakeTransport) -> (ApiClient, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        let store = Arc::new(MemorySessionStore::with_credentials(Credentials::new(
            AccessToken::new("access-1"),
            RefreshToken::new("refresh-1"),
        )));
        let client = ApiClient::with_transport(
            base_url,
            options,
            transport.clone(),
            store,
            Arc::new(RecordingNotifier::new()),
        );
        (client, transport)
    }

    #[test]
    fn paths_extend_the_base_url() {
        let (client, _) = client("https://api.example.com/v1", ClientOptions::default(), FakeTransport::new());
        assert!(client.has_auth_middleware());
        assert_eq!(
            client.url("/users/me").unwrap().as_str(),
            "https://api.example.com/v1/users/me"
        );
        assert_eq!(
            client.url("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn invalid_base_url_degrades_to_passthrough() {
        let (client, _) = client("not a url", ClientOptions::default(), FakeTransport::new());
        assert!(!client.has_auth_middleware());
        assert!(matches!(client.url("/users"), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn invalid_header_name_degrades_to_passthrough() {
        let options = ClientOptions {
            refresh_token_header: "bad header".to_string(),
            ..ClientOptions::default()
        };
        let (client, _) = client("https://api.example.com", options, FakeTransport::new());
        assert!(!client.has_auth_middleware());
        assert!(client.url("/users").is_ok());
    }

    #[tokio::test]
    async fn passthrough_client_sends_without_credentials() {
        let options = ClientOptions {
            upstream_unavailable: vec![42],
            ..ClientOptions::default()
        };
        let transport = FakeTransport::new().route(Method::GET, "/ping", |_| {
            ApiResponse::new(StatusCode::OK).into()
        });
        let (client, transport) = client("https://api.example.com", options, transport);

        let _: Option<serde_json::Value> = client.get("/ping").await.unwrap();
        assert!(transport.requests()[0].headers.get(AUTHORIZATION).is_none());
        assert!(matches!(
            client.refresh_tokens().await,
            Err(RefreshError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn get_decodes_json_and_sends_bearer() {
        let transport = FakeTransport::new().route(Method::GET, "/users/me", |_| {
            ApiResponse::new(StatusCode::OK)
                .with_json(&json!({ "name": "ada" }))
                .into()
        });
        let (client, transport) = client("https://api.example.com", ClientOptions::default(), transport);

        let profile: Profile = client.get("/users/me").await.unwrap();
        assert_eq!(profile.name, "ada");
        assert_eq!(transport.requests()[0].bearer_token(), Some("access-1"));
    }

    #[tokio::test]
    async fn post_sends_json_body_and_accepts_empty_reply() {
        let transport = FakeTransport::new().route(Method::POST, "/notes", |_| {
            ApiResponse::new(StatusCode::NO_CONTENT).into()
        });
        let (client, transport) = client("https://api.example.com", ClientOptions::default(), transport);

        let () = client.post("/notes", &json!({ "text": "hi" })).await.unwrap();
        let sent = &transport.requests()[0];
        assert_eq!(sent.header_str("content-type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some(br#"{"text":"hi"}"#.as_slice()));
    }

    #[tokio::test]
    async fn non_success_status_becomes_status_error() {
        let transport = FakeTransport::new().route(Method::DELETE, "/notes/1", |_| {
            ApiResponse::new(StatusCode::NOT_FOUND).with_body("gone").into()
        });
        let (client, _) = client("https://api.example.com", ClientOptions::default(), transport);

        match client.delete("/notes/1").await {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "gone");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

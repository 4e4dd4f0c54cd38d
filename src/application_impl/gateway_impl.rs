use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::FutureExt;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequestBody<'a> {
    token: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshEnvelope {
    data: RefreshPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    role: Option<String>,
}

/// Attaches credentials to every request and hides recoverable
/// authentication failures from callers by refreshing and replaying.
pub struct AuthenticatedGateway {
    transport: Arc<dyn HttpTransport>,
    session_store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    config: Arc<GatewayConfig>,
    coordinator: RefreshCoordinator,
}

impl AuthenticatedGateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session_store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            transport,
            session_store,
            notifier,
            config: Arc::new(config),
            coordinator: RefreshCoordinator::new(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    pub async fn attach_credentials(&self, request: &mut ApiRequest) {
        if !request.headers.contains_key(CONTENT_TYPE) {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let credentials = match self.session_store.credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "could not read credentials; sending unauthenticated");
                return;
            }
        };

        if let Some(access) = &credentials.access_token {
            match HeaderValue::from_str(&format!("Bearer {}", access.as_str())) {
                Ok(value) => {
                    request.headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("access token is not a valid header value; skipping"),
            }
        }
        if let Some(refresh) = &credentials.refresh_token {
            match HeaderValue::from_str(refresh.as_str()) {
                Ok(value) => {
                    request
                        .headers
                        .insert(self.config.headers.refresh_token.clone(), value);
                }
                Err(_) => warn!("refresh token is not a valid header value; skipping"),
            }
        }
    }

    pub async fn on_response(
        &self,
        request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ApiResponse, GatewayError> {
        self.observe_rotated_tokens(&response).await;

        match classify(&response, &self.config.upstream_unavailable) {
            ResponseClass::Pass => Ok(response),
            ResponseClass::UpstreamUnavailable => {
                self.report_upstream_unavailable(&response);
                Ok(response)
            }
            ResponseClass::Forbidden => {
                info!(url = %request.url, "forbidden, not authentication related");
                Ok(response)
            }
            ResponseClass::AuthFailure => self.refresh_and_retry(request, response).await,
            ResponseClass::UnreadableAuthFailure => {
                warn!(url = %request.url, "unreadable 401 body; ending session");
                end_session(self.session_store.as_ref()).await;
                Err(GatewayError::SessionExpired {
                    response,
                    cause: "unreadable authentication failure".to_string(),
                })
            }
        }
    }

    async fn refresh_and_retry(
        &self,
        request: &ApiRequest,
        response: ApiResponse,
    ) -> Result<ApiResponse, GatewayError> {
        debug!(status = %response.status, url = %request.url, "authentication failure; refreshing");

        if let Err(e) = self.refresh_tokens().await {
            return Err(GatewayError::SessionExpired {
                response,
                cause: e.to_string(),
            });
        }

        let mut retry = request.clone();
        self.attach_credentials(&mut retry).await;
        let retried = self.transport.send(retry).await?;

        self.observe_rotated_tokens(&retried).await;
        if self.config.upstream_unavailable.contains(&retried.status) {
            self.report_upstream_unavailable(&retried);
        }
        debug!(status = %retried.status, url = %request.url, "replayed after refresh");
        Ok(retried)
    }

    async fn observe_rotated_tokens(&self, response: &ApiResponse) {
        let headers = &self.config.headers;
        let rotated =
            response.rotated_tokens(&headers.rotated_access_token, &headers.rotated_refresh_token);
        if rotated.is_empty() {
            return;
        }

        if let Some(access) = rotated.access_token {
            if let Err(e) = self.session_store.save_access_token(access).await {
                error!(error = %e, "failed to persist rotated access token");
            }
        }
        if let Some(refresh) = rotated.refresh_token {
            if let Err(e) = self.session_store.save_refresh_token(refresh).await {
                error!(error = %e, "failed to persist rotated refresh token");
            }
        }
        debug!("persisted rotated tokens from response headers");
    }

    fn report_upstream_unavailable(&self, response: &ApiResponse) {
        warn!(status = %response.status, "upstream unavailable");
        self.notifier
            .notify(Notice::upstream_unavailable(response.status));
    }
}

#[async_trait::async_trait]
impl RequestGateway for AuthenticatedGateway {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let request_id = nanoid::nanoid!(10);
        let span = info_span!("request", %request_id, method = %request.method, url = %request.url);

        async move {
            let mut outgoing = request.clone();
            self.attach_credentials(&mut outgoing).await;
            let response = self.transport.send(outgoing).await?;
            self.on_response(&request, response).await
        }
        .instrument(span)
        .await
    }

    async fn refresh_tokens(&self) -> Result<RefreshedSession, RefreshError> {
        let transport = Arc::clone(&self.transport);
        let session_store = Arc::clone(&self.session_store);
        let config = Arc::clone(&self.config);

        self.coordinator
            .run_or_join(move || refresh_round(transport, session_store, config).boxed())
            .await
    }

    fn has_auth_middleware(&self) -> bool {
        true
    }
}

/// One refresh round. A failed round ends the session here, so teardown
/// happens once no matter how many callers joined.
async fn refresh_round(
    transport: Arc<dyn HttpTransport>,
    session_store: Arc<dyn SessionStore>,
    config: Arc<GatewayConfig>,
) -> Result<RefreshedSession, RefreshError> {
    let result = request_new_tokens(transport.as_ref(), session_store.as_ref(), &config).await;
    match &result {
        Ok(session) => info!(role = ?session.role, "token refresh succeeded"),
        Err(e) => {
            warn!(error = %e, "token refresh failed; ending session");
            end_session(session_store.as_ref()).await;
        }
    }
    result
}

async fn request_new_tokens(
    transport: &dyn HttpTransport,
    session_store: &dyn SessionStore,
    config: &GatewayConfig,
) -> Result<RefreshedSession, RefreshError> {
    let credentials = session_store
        .credentials()
        .await
        .map_err(|e| RefreshError::Store(e.to_string()))?;
    let (access, refresh) = credentials.pair().ok_or(RefreshError::MissingCredentials)?;

    let request = refresh_request(config, access, refresh)?;

    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(RefreshError::Rejected(response.status));
    }

    let RefreshEnvelope { data } = response
        .json::<RefreshEnvelope>()
        .map_err(|e| RefreshError::MalformedBody(e.to_string()))?;
    if data.access_token.is_empty() || data.refresh_token.is_empty() {
        return Err(RefreshError::MalformedBody("empty token in response".to_string()));
    }

    session_store
        .save_credentials(Credentials::new(
            AccessToken(data.access_token),
            RefreshToken(data.refresh_token),
        ))
        .await
        .map_err(|e| RefreshError::Store(e.to_string()))?;

    Ok(RefreshedSession {
        user_id: data.id,
        role: data.role,
    })
}

fn refresh_request(
    config: &GatewayConfig,
    access: &AccessToken,
    refresh: &RefreshToken,
) -> Result<ApiRequest, RefreshError> {
    let body = RefreshRequestBody {
        token: access.as_str(),
        refresh_token: refresh.as_str(),
    };
    ApiRequest::new(Method::POST, config.refresh_url.clone())
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_json_body(&body)
        .map_err(encode_error)
}

fn encode_error(e: serde_json::Error) -> RefreshError {
    RefreshError::Encode(e.to_string())
}

async fn end_session(session_store: &dyn SessionStore) {
    if let Err(e) = session_store.clear().await {
        error!(error = %e, "failed to clear session");
    }
}

use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

/// Sends requests as-is. Used when the authenticated gateway could not be
/// configured.
pub struct PassthroughGateway {
    transport: Arc<dyn HttpTransport>,
}

impl PassthroughGateway {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl RequestGateway for PassthroughGateway {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        Ok(self.transport.send(request).await?)
    }

    async fn refresh_tokens(&self) -> Result<RefreshedSession, RefreshError> {
        Err(RefreshError::Unavailable)
    }

    fn has_auth_middleware(&self) -> bool {
        false
    }
}

use crate::domain_model::*;
use crate::domain_port::*;
use reqwest::{Method, StatusCode};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub enum FakeReply {
    Response(ApiResponse),
    Error(TransportError),
}

impl From<ApiResponse> for FakeReply {
    fn from(response: ApiResponse) -> Self {
        FakeReply::Response(response)
    }
}

impl From<TransportError> for FakeReply {
    fn from(error: TransportError) -> Self {
        FakeReply::Error(error)
    }
}

type Responder = Box<dyn Fn(&ApiRequest) -> FakeReply + Send + Sync>;

struct FakeRoute {
    method: Method,
    path: String,
    delay: Duration,
    responder: Responder,
}

/// Scripted transport. Routes match on method and URL path; anything
/// unmatched gets a 404. Every request is recorded.
pub struct FakeTransport {
    routes: Vec<FakeRoute>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn route<F>(self, method: Method, path: &str, responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> FakeReply + Send + Sync + 'static,
    {
        self.delayed_route(method, path, Duration::ZERO, responder)
    }

    pub fn delayed_route<F>(
        mut self,
        method: Method,
        path: &str,
        delay: Duration,
        responder: F,
    ) -> Self
    where
        F: Fn(&ApiRequest) -> FakeReply + Send + Sync + 'static,
    {
        self.routes.push(FakeRoute {
            method,
            path: path.to_string(),
            delay,
            responder: Box::new(responder),
        });
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == request.method && r.path == request.url.path())
        else {
            return Ok(ApiResponse::new(StatusCode::NOT_FOUND));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        match (route.responder)(&request) {
            FakeReply::Response(response) => Ok(response),
            FakeReply::Error(error) => Err(error),
        }
    }
}

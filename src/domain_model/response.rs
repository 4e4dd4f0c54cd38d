use crate::domain_model::*;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, body: &serde_json::Value) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.with_body(bytes)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Reads rotated tokens from the given header names. Blank or non-ASCII
    /// values are ignored.
    pub fn rotated_tokens(&self, access: &HeaderName, refresh: &HeaderName) -> RotatedTokens {
        RotatedTokens {
            access_token: self.non_empty_header(access).map(AccessToken::new),
            refresh_token: self.non_empty_header(refresh).map(RefreshToken::new),
        }
    }

    fn non_empty_header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> (HeaderName, HeaderName) {
        (
            HeaderName::from_static("x-access-token"),
            HeaderName::from_static("x-refresh-token"),
        )
    }

    #[test]
    fn rotated_tokens_are_read_from_headers() {
        let (access, refresh) = names();
        let response = ApiResponse::new(StatusCode::OK)
            .with_header(access.clone(), HeaderValue::from_static("new-access"))
            .with_header(refresh.clone(), HeaderValue::from_static("new-refresh"));

        let rotated = response.rotated_tokens(&access, &refresh);
        assert_eq!(rotated.access_token, Some(AccessToken::new("new-access")));
        assert_eq!(rotated.refresh_token, Some(RefreshToken::new("new-refresh")));
    }

    #[test]
    fn blank_rotated_headers_are_ignored() {
        let (access, refresh) = names();
        let response = ApiResponse::new(StatusCode::OK)
            .with_header(access.clone(), HeaderValue::from_static("  "));

        assert!(response.rotated_tokens(&access, &refresh).is_empty());
    }

    #[test]
    fn json_body_round_trips_through_accessors() {
        let response =
            ApiResponse::new(StatusCode::OK).with_json(&serde_json::json!({ "name": "ada" }));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "ada");
        assert!(response.text().contains("ada"));
    }
}

use crate::domain_model::ApiResponse;
use reqwest::StatusCode;
use serde_json::Value;

const UNAUTHENTICATED_CODE: &str = "unauthenticated";
const CODE_FIELDS: [&str; 3] = ["errorCode", "error_code", "code"];
const MESSAGE_FIELDS: [&str; 4] = ["message", "error", "detail", "errorMessage"];
const AUTH_PATTERNS: [&str; 4] = [
    "not authenticated",
    "token expired",
    "authentication expired",
    "no refresh token available",
];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResponseClass {
    Pass,
    UpstreamUnavailable,
    /// 401, or a 403 whose body says the session is no longer authenticated.
    AuthFailure,
    /// 403 that is about permissions, or whose body could not be read.
    Forbidden,
    /// 401 with a body that is not JSON.
    UnreadableAuthFailure,
}

pub fn classify(response: &ApiResponse, upstream_unavailable: &[StatusCode]) -> ResponseClass {
    let status = response.status;
    if upstream_unavailable.contains(&status) {
        return ResponseClass::UpstreamUnavailable;
    }
    match status {
        StatusCode::UNAUTHORIZED => match parse_body(&response.body) {
            Ok(_) => ResponseClass::AuthFailure,
            Err(_) => ResponseClass::UnreadableAuthFailure,
        },
        StatusCode::FORBIDDEN => match parse_body(&response.body) {
            Ok(Some(body)) if has_auth_marker(&body) => ResponseClass::AuthFailure,
            _ => ResponseClass::Forbidden,
        },
        _ => ResponseClass::Pass,
    }
}

fn parse_body(body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}

pub fn has_auth_marker(body: &Value) -> bool {
    match body {
        Value::String(text) => matches_auth_pattern(text),
        Value::Object(fields) => {
            let code_marker = CODE_FIELDS.iter().any(|key| {
                fields
                    .get(*key)
                    .and_then(Value::as_str)
                    .is_some_and(|code| code.eq_ignore_ascii_case(UNAUTHENTICATED_CODE))
            });
            if code_marker {
                return true;
            }
            MESSAGE_FIELDS.iter().any(|key| match fields.get(*key) {
                Some(Value::String(text)) => matches_auth_pattern(text),
                // { "error": { "code": ..., "message": ... } }
                Some(nested @ Value::Object(_)) => has_auth_marker(nested),
                _ => false,
            })
        }
        _ => false,
    }
}

fn matches_auth_pattern(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTH_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

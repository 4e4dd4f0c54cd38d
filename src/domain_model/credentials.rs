use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in tracing fields; never print the secret itself.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} bytes>)", self.0.len())
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshToken(<{} bytes>)", self.0.len())
    }
}

/// The access/refresh token pair held for the current session.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Option<AccessToken>,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
}

impl Credentials {
    pub fn new(access_token: AccessToken, refresh_token: RefreshToken) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Both tokens, or `None` when either one is missing.
    pub fn pair(&self) -> Option<(&AccessToken, &RefreshToken)> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Some((access, refresh)),
            _ => None,
        }
    }
}

/// Tokens the server pushed back on a response header.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RotatedTokens {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
}

impl RotatedTokens {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_requires_both_tokens() {
        let full = Credentials::new(AccessToken::new("a"), RefreshToken::new("r"));
        assert!(full.pair().is_some());

        let half = Credentials {
            access_token: Some(AccessToken::new("a")),
            refresh_token: None,
        };
        assert!(half.pair().is_none());
        assert!(!half.is_empty());
        assert!(Credentials::empty().is_empty());
    }

    #[test]
    fn debug_output_hides_token_values() {
        let credentials = Credentials::new(
            AccessToken::new("secret-access"),
            RefreshToken::new("secret-refresh"),
        );
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("AccessToken(<13 bytes>)"));
    }

    #[test]
    fn serializes_tokens_as_plain_strings() {
        let credentials = Credentials::new(AccessToken::new("a1"), RefreshToken::new("r1"));
        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "access_token": "a1", "refresh_token": "r1" })
        );

        let parsed: Credentials = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }
}

use crate::api::{ClientOptions, DEFAULT_REFRESH_PATH};
use crate::application_port::{
    DEFAULT_REFRESH_TOKEN_HEADER, DEFAULT_ROTATED_ACCESS_TOKEN_HEADER,
    DEFAULT_ROTATED_REFRESH_TOKEN_HEADER,
};
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
    #[serde(default)]
    pub headers: Headers,
    pub session: Session,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_upstream_unavailable")]
    pub upstream_unavailable: Vec<u16>,
}

#[derive(Debug, Deserialize)]
pub struct Headers {
    pub refresh_token: String,
    pub rotated_access_token: String,
    pub rotated_refresh_token: String,
}

impl Default for Headers {
    fn default() -> Self {
        Self {
            refresh_token: DEFAULT_REFRESH_TOKEN_HEADER.to_string(),
            rotated_access_token: DEFAULT_ROTATED_ACCESS_TOKEN_HEADER.to_string(),
            rotated_refresh_token: DEFAULT_ROTATED_REFRESH_TOKEN_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "file"
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_upstream_unavailable() -> Vec<u16> {
    vec![502]
}

impl Settings {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            refresh_path: self.api.refresh_path.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            upstream_unavailable: self.api.upstream_unavailable.clone(),
            refresh_token_header: self.headers.refresh_token.clone(),
            rotated_access_token_header: self.headers.rotated_access_token.clone(),
            rotated_refresh_token_header: self.headers.rotated_refresh_token.clone(),
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then applies `AUTHGATE__SECTION__KEY` overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("AUTHGATE").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://api.example.com"

[session]
backend = "memory"

[log]
filter = "debug"
"#,
        )
        .unwrap();

        let settings = parse_settings(path.to_str()).unwrap();
        assert_eq!(settings.api.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(settings.api.upstream_unavailable, vec![502]);
        assert_eq!(settings.headers.rotated_access_token, "x-access-token");
        assert!(settings.session.path.is_none());

        let options = settings.client_options();
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("")).is_err());
        assert!(parse_settings(Some("does/not/exist.toml")).is_err());
    }
}

use anyhow::anyhow;
use authgate::api::*;
use authgate::domain_model::*;
use authgate::domain_port::*;
use authgate::infra_fs::*;
use authgate::infra_memory::*;
use authgate::infra_tracing::*;
use authgate::logger::*;
use authgate::settings::*;
use reqwest::Method;
use std::sync::Arc;

const DEFAULT_SESSION_PATH: &str = ".authgate/session.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let session_store: Arc<dyn SessionStore> = match project_settings.session.backend.as_str() {
        "memory" => Arc::new(MemorySessionStore::new()),
        "file" => {
            let path = project_settings
                .session
                .path
                .as_deref()
                .unwrap_or(DEFAULT_SESSION_PATH);
            Arc::new(FileSessionStore::open(path).await?)
        }
        other => return Err(anyhow!("Unknown session backend: {}", other)),
    };

    let client = ApiClient::new(
        &project_settings.api.base_url,
        project_settings.client_options(),
        session_store.clone(),
        Arc::new(TracingNotifier::new()),
    );

    match cli.command {
        Command::Login {
            access_token,
            refresh_token,
        } => {
            session_store
                .save_credentials(Credentials::new(
                    AccessToken(access_token),
                    RefreshToken(refresh_token),
                ))
                .await?;
            println!("signed in");
        }
        Command::Logout => {
            session_store.clear().await?;
            println!("signed out");
        }
        Command::Status => {
            let credentials = session_store.credentials().await?;
            println!(
                "access token: {}, refresh token: {}",
                presence(credentials.access_token.is_some()),
                presence(credentials.refresh_token.is_some()),
            );
        }
        Command::Refresh => {
            let session = client.refresh_tokens().await?;
            println!(
                "refreshed (user: {}, role: {})",
                session
                    .user_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                session.role.as_deref().unwrap_or("-"),
            );
        }
        Command::Request { method, path, body } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut request = ApiRequest::new(method, client.url(&path)?);
            if let Some(body) = body {
                let value: serde_json::Value = serde_json::from_str(&body)?;
                request = request.with_json_body(&value)?;
            }

            let response = client.send(request).await?;
            println!("{}", response.status);
            println!("{}", response.text());
        }
    }

    Ok(())
}

fn presence(held: bool) -> &'static str {
    if held { "present" } else { "absent" }
}

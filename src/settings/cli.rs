use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Drive the authenticated API client by hand")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a token pair as the current session
    Login {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: String,
    },
    /// Drop the current session
    Logout,
    /// Show whether a session is held
    Status,
    /// Run one token refresh round
    Refresh,
    /// Send a request through the gateway
    Request {
        method: String,
        path: String,
        #[arg(long)]
        body: Option<String>,
    },
}

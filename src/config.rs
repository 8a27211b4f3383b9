//! Command line configuration for the mail companion server.

use std::path::PathBuf;

use clap::Parser;

/// The credentials of the Google OAuth app used to read users' mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleOAuthConfig {
    /// The OAuth client ID.
    pub client_id: String,
    /// The OAuth client secret.
    pub client_secret: String,
    /// Where Google sends the user after consent. "postmessage" for popup based flows.
    pub redirect_uri: String,
}

/// The HTTP server that connects family members' Gmail accounts.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// File path to the application SQLite database.
    #[arg(long)]
    pub db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// An origin that browsers may call the API from. May be repeated.
    #[arg(long = "allowed-origin", default_values_t = [String::from("http://localhost:5173")])]
    pub allowed_origins: Vec<String>,

    /// The client ID of the Google OAuth app.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: String,

    /// The client secret of the Google OAuth app.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: String,

    /// The redirect URI registered with the Google OAuth app.
    #[arg(long, default_value = "postmessage")]
    pub google_redirect_uri: String,

    /// File path to write debug logs to.
    #[arg(long, default_value = "debug.log")]
    pub log_path: PathBuf,
}

impl ServerConfig {
    /// The OAuth app settings.
    pub fn google_oauth(&self) -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: self.google_client_id.clone(),
            client_secret: self.google_client_secret.clone(),
            redirect_uri: self.google_redirect_uri.clone(),
        }
    }
}

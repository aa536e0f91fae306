use crate::{
    api::{self, handlers::AuthState},
    registry::{RegistryClient, RegistryConfig},
    session::{AccessToken, SessionConfig},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub sessions: SessionConfig,
    pub registry_url: Url,
    pub registry_token: SecretString,
    pub registry_table: String,
    pub registry_lang: u32,
    pub registry_timeout_seconds: u64,
    pub lookup_token: SecretString,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &"***")
            .field("sessions", &self.sessions)
            .field("registry_url", &self.registry_url.as_str())
            .field("registry_token", &"***")
            .field("registry_table", &self.registry_table)
            .field("registry_lang", &self.registry_lang)
            .field("registry_timeout_seconds", &self.registry_timeout_seconds)
            .field("lookup_token", &"***")
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the registry client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {:?}", args);

    let auth_state = AuthState::new(args.sessions, AccessToken::new(args.lookup_token));

    let registry = RegistryConfig::new(args.registry_url, args.registry_token)
        .with_table(args.registry_table)
        .with_lang(args.registry_lang)
        .with_timeout(Duration::from_secs(args.registry_timeout_seconds));
    let registry = RegistryClient::new(registry).context("failed to build registry client")?;

    api::new(args.port, args.dsn, auth_state, registry).await
}

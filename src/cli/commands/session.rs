use crate::session::SessionConfig;
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";

/// Build the session config from parsed arguments.
///
/// # Errors
/// Returns an error if the secret is missing or rejected by [`SessionConfig::new`].
pub fn parse(matches: &ArgMatches) -> Result<SessionConfig> {
    let secret = matches
        .get_one::<String>(ARG_SESSION_SECRET)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument: --{ARG_SESSION_SECRET}"))?;

    let config = SessionConfig::new(SecretString::from(secret))
        .with_context(|| format!("invalid --{ARG_SESSION_SECRET}"))?
        .with_ttl_seconds(
            matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(604_800),
        )
        .with_cookie_secure(
            matches
                .get_one::<bool>(ARG_SESSION_COOKIE_SECURE)
                .copied()
                .unwrap_or(false),
        );

    Ok(config)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session cookies (at least 32 bytes)")
                .env("BANKDIR_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("BANKDIR_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("BANKDIR_SESSION_COOKIE_SECURE")
                .default_value("false")
                .value_parser(clap::value_parser!(bool)),
        )
}

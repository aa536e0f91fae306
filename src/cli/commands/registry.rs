use crate::registry::{
    DEFAULT_REGISTRY_LANG, DEFAULT_REGISTRY_TABLE, DEFAULT_REGISTRY_URL, DEFAULT_TIMEOUT_SECONDS,
};
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_REGISTRY_URL: &str = "registry-url";
pub const ARG_REGISTRY_TOKEN: &str = "registry-token";
pub const ARG_REGISTRY_TABLE: &str = "registry-table";
pub const ARG_REGISTRY_LANG: &str = "registry-lang";
pub const ARG_REGISTRY_TIMEOUT_SECONDS: &str = "registry-timeout-seconds";
pub const ARG_LOOKUP_TOKEN: &str = "lookup-token";

pub struct Options {
    pub url: Url,
    pub token: SecretString,
    pub table: String,
    pub lang: u32,
    pub timeout_seconds: u64,
    /// Shared secret for `/look_for`; the registry token when unset.
    pub lookup_token: SecretString,
}

impl Options {
    /// Parse registry arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the token is missing or the URL is invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read_required = |id: &str| -> Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        let url = matches
            .get_one::<String>(ARG_REGISTRY_URL)
            .map_or(DEFAULT_REGISTRY_URL, String::as_str);
        let url = Url::parse(url).with_context(|| format!("invalid --{ARG_REGISTRY_URL}"))?;

        let token = read_required(ARG_REGISTRY_TOKEN)?;
        let lookup_token = matches
            .get_one::<String>(ARG_LOOKUP_TOKEN)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| token.clone());

        Ok(Self {
            url,
            token: SecretString::from(token),
            table: matches
                .get_one::<String>(ARG_REGISTRY_TABLE)
                .cloned()
                .unwrap_or_else(|| DEFAULT_REGISTRY_TABLE.to_string()),
            lang: matches
                .get_one::<u32>(ARG_REGISTRY_LANG)
                .copied()
                .unwrap_or(DEFAULT_REGISTRY_LANG),
            timeout_seconds: matches
                .get_one::<u64>(ARG_REGISTRY_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            lookup_token: SecretString::from(lookup_token),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REGISTRY_URL)
                .long(ARG_REGISTRY_URL)
                .help("Registry table endpoint")
                .env("BANKDIR_REGISTRY_URL")
                .default_value(DEFAULT_REGISTRY_URL),
        )
        .arg(
            Arg::new(ARG_REGISTRY_TOKEN)
                .long(ARG_REGISTRY_TOKEN)
                .help("Access token sent to the registry")
                .env("BANKDIR_REGISTRY_TOKEN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REGISTRY_TABLE)
                .long(ARG_REGISTRY_TABLE)
                .help("Registry table name")
                .env("BANKDIR_REGISTRY_TABLE")
                .default_value(DEFAULT_REGISTRY_TABLE),
        )
        .arg(
            Arg::new(ARG_REGISTRY_LANG)
                .long(ARG_REGISTRY_LANG)
                .help("Registry response language code")
                .env("BANKDIR_REGISTRY_LANG")
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_REGISTRY_TIMEOUT_SECONDS)
                .long(ARG_REGISTRY_TIMEOUT_SECONDS)
                .help("Registry request timeout in seconds")
                .env("BANKDIR_REGISTRY_TIMEOUT_SECONDS")
                .default_value("15")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOOKUP_TOKEN)
                .long(ARG_LOOKUP_TOKEN)
                .help("Shared token for /look_for (defaults to the registry token)")
                .env("BANKDIR_LOOKUP_TOKEN")
                .hide_env_values(true),
        )
}

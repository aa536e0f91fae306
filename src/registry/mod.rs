//! Client for the public bank directory registry.
//!
//! The registry serves pages of a single table through
//! `GET <url>?accessToken=..&name=<table>&limit=..&offset=..&lang=..` and
//! answers with `{"result": {"data": [...], "count": N}}`. Every fetch is a
//! single request: no retries, no caching.

pub mod filter;

pub use filter::{FilterSet, MatchPolicy, VALID_COLUMNS};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT},
    Client,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// One registry row, passed through as received.
pub type BankRecord = Map<String, Value>;

pub const DEFAULT_REGISTRY_URL: &str = "https://cs.egov.uz/apiPartner/Table/Get";
pub const DEFAULT_REGISTRY_TABLE: &str = "400-4-001";
pub const DEFAULT_REGISTRY_LANG: u32 = 1;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

// The registry rejects requests that do not look like they come from its own web UI.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "application/json, text/plain, */*";
const BROWSER_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";
const BROWSER_REFERER: &str = "https://cs.egov.uz/";
const BROWSER_ORIGIN: &str = "https://cs.egov.uz";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{0}")]
    UpstreamUnavailable(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

/// A page of rows plus the registry's total for the query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistryPage {
    pub rows: Vec<BankRecord>,
    pub total_count: u64,
}

impl RegistryPage {
    /// Extract `result.data` and `result.count`; missing paths read as empty.
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let result = body.get("result");
        let rows = result
            .and_then(|result| result.get("data"))
            .and_then(Value::as_array)
            .map(|data| {
                data.iter()
                    .filter_map(|row| row.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();
        let total_count = result
            .and_then(|result| result.get("count"))
            .and_then(|count| match count {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(0);

        Self { rows, total_count }
    }
}

/// Registry endpoint settings, loaded once at startup.
#[derive(Clone)]
pub struct RegistryConfig {
    url: Url,
    access_token: SecretString,
    table: String,
    lang: u32,
    timeout: Duration,
}

impl RegistryConfig {
    #[must_use]
    pub fn new(url: Url, access_token: SecretString) -> Self {
        Self {
            url,
            access_token,
            table: DEFAULT_REGISTRY_TABLE.to_string(),
            lang: DEFAULT_REGISTRY_LANG,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: String) -> Self {
        self.table = table;
        self
    }

    #[must_use]
    pub fn with_lang(mut self, lang: u32) -> Self {
        self.lang = lang;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url.as_str())
            .field("access_token", &"***")
            .field("table", &self.table)
            .field("lang", &self.lang)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Build the HTTP client with the browser headers and configured timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Fetch one page of registry rows.
    ///
    /// # Errors
    /// Returns [`RegistryError::UpstreamUnavailable`] on transport failure,
    /// timeout, non-2xx status, or a body that is not JSON.
    #[instrument(name = "registry.fetch", skip(self))]
    pub async fn fetch(&self, offset: u64, limit: u64) -> Result<RegistryPage, RegistryError> {
        let lang = self.config.lang.to_string();
        let limit = limit.to_string();
        let offset = offset.to_string();

        let response = self
            .client
            .get(self.config.url.clone())
            .query(&[
                ("accessToken", self.config.access_token.expose_secret()),
                ("name", self.config.table.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("lang", lang.as_str()),
            ])
            .send()
            .await
            .map_err(|err| upstream_error("Registry request failed", err))?;

        let status = response.status();
        if !status.is_success() {
            error!("Registry responded with {}", status);
            return Err(RegistryError::UpstreamUnavailable(format!(
                "registry responded with HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| upstream_error("Registry body is not JSON", err))?;

        let page = RegistryPage::from_json(&body);
        debug!(rows = page.rows.len(), total = page.total_count, "registry page fetched");

        Ok(page)
    }
}

// The request URL carries the access token in its query string, so it is
// stripped before the error is logged or returned.
fn upstream_error(context: &str, err: reqwest::Error) -> RegistryError {
    let err = RegistryError::from(err.without_url());
    error!("{}: {}", context, err);
    err
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs: [(HeaderName, &'static str); 5] = [
        (USER_AGENT, BROWSER_USER_AGENT),
        (ACCEPT, BROWSER_ACCEPT),
        (ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE),
        (REFERER, BROWSER_REFERER),
        (ORIGIN, BROWSER_ORIGIN),
    ];
    for (name, value) in pairs {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

//! Signed cookie sessions and the shared lookup token.
//!
//! The session cookie carries `{user, iat}` as URL-safe base64 JSON followed by
//! an HMAC-SHA256 tag over that payload. Nothing is stored server side; a
//! cookie is accepted while its tag verifies under the configured secret and
//! its age is within the session TTL.

use anyhow::{anyhow, Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const SESSION_COOKIE_NAME: &str = "bankdir_session";
pub const MIN_SECRET_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct Claims {
    user: String,
    iat: u64,
}

/// Who the current request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(String),
}

impl SessionState {
    /// Email of the logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(email) => Some(email),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    secret: SecretString,
    ttl_seconds: u64,
    cookie_secure: bool,
}

impl SessionConfig {
    /// Build a session config from the signing secret.
    ///
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: SecretString) -> Result<Self> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "session secret must be at least {MIN_SECRET_LEN} bytes long"
            ));
        }
        Ok(Self {
            secret,
            ttl_seconds: 604_800,
            cookie_secure: false,
        })
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Sign a session token for `email`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be serialized or the MAC cannot be keyed.
    pub fn issue(&self, email: &str) -> Result<String> {
        self.issue_at(email, now_unix())
    }

    fn issue_at(&self, email: &str, iat: u64) -> Result<String> {
        let claims = Claims {
            user: email.to_string(),
            iat,
        };
        let json = serde_json::to_vec(&claims).context("failed to encode session claims")?;
        let payload = Base64UrlUnpadded::encode_string(&json);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let tag = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        Ok(format!("{payload}.{tag}"))
    }

    /// Return the email carried by `token` if it is authentic and not expired.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_at(token, now_unix())
    }

    fn verify_at(&self, token: &str, now: u64) -> Option<String> {
        let (payload, tag) = token.split_once('.')?;
        let tag = Base64UrlUnpadded::decode_vec(tag).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(payload.as_bytes());
        if mac.verify_slice(&tag).is_err() {
            debug!("session cookie signature mismatch");
            return None;
        }

        let json = Base64UrlUnpadded::decode_vec(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&json).ok()?;
        if now.saturating_sub(claims.iat) > self.ttl_seconds {
            debug!("session cookie expired");
            return None;
        }
        Some(claims.user)
    }

    /// Resolve the session state of a request from its `Cookie` header.
    #[must_use]
    pub fn state(&self, headers: &HeaderMap) -> SessionState {
        extract_session_token(headers)
            .and_then(|token| self.verify(&token))
            .map_or(SessionState::Anonymous, SessionState::Authenticated)
    }

    /// Build an `HttpOnly` cookie for the session token.
    ///
    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let ttl_seconds = self.ttl_seconds;
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Build a cookie that clears the session on the client.
    ///
    /// # Errors
    /// Never fails in practice; the value is a fixed ASCII string.
    pub fn clear_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| anyhow!("invalid session secret: {e}"))
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Shared secret callers present to the public lookup endpoint.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self(token)
    }

    /// Exact, constant-time comparison against the configured token.
    #[must_use]
    pub fn permits(&self, candidate: &str) -> bool {
        let expected = self.0.expose_secret().as_bytes();
        !expected.is_empty() && bool::from(expected.ct_eq(candidate.as_bytes()))
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty() {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config() -> SessionConfig {
        SessionConfig::new(SecretString::from(SECRET.to_string()))
            .unwrap()
            .with_ttl_seconds(3600)
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn short_secret_is_rejected() {
        let result = SessionConfig::new(SecretString::from("too-short".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn issued_token_verifies_to_email() {
        let config = config();
        let token = config.issue("alice@example.com").unwrap();
        assert_eq!(config.verify(&token).as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = SessionConfig::new(SecretString::from("f".repeat(32))).unwrap();
        let token = other.issue("alice@example.com").unwrap();
        assert_eq!(config().verify(&token), None);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let config = config();
        let token = config.issue("alice@example.com").unwrap();
        let (_, tag) = token.split_once('.').unwrap();
        let forged_claims = Claims {
            user: "mallory@example.com".to_string(),
            iat: now_unix(),
        };
        let forged_payload =
            Base64UrlUnpadded::encode_string(&serde_json::to_vec(&forged_claims).unwrap());
        assert_eq!(config.verify(&format!("{forged_payload}.{tag}")), None);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let config = config();
        for token in ["", ".", "abc", "abc.def", "!!!.???"] {
            assert_eq!(config.verify(token), None, "accepted {token:?}");
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let token = config.issue_at("alice@example.com", 1_000).unwrap();
        assert_eq!(
            config.verify_at(&token, 1_000 + 3600).as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(config.verify_at(&token, 1_000 + 3601), None);
    }

    #[test]
    fn state_reads_session_cookie() {
        let config = config();
        let token = config.issue("bob@example.com").unwrap();
        let headers = cookie_headers(&format!("theme=dark; {SESSION_COOKIE_NAME}={token}"));
        assert_eq!(
            config.state(&headers),
            SessionState::Authenticated("bob@example.com".to_string())
        );
    }

    #[test]
    fn state_without_cookie_is_anonymous() {
        let config = config();
        assert_eq!(config.state(&HeaderMap::new()), SessionState::Anonymous);
        assert_eq!(
            config.state(&cookie_headers(&format!("{SESSION_COOKIE_NAME}="))),
            SessionState::Anonymous
        );
        assert!(!config.state(&HeaderMap::new()).is_authenticated());
    }

    #[test]
    fn cookie_attributes() {
        let config = config().with_cookie_secure(true);
        let cookie = config.cookie("token").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("bankdir_session=token;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = config.clear_cookie().unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn access_token_requires_exact_match() {
        let token = AccessToken::new(SecretString::from("shared-token".to_string()));
        assert!(token.permits("shared-token"));
        assert!(!token.permits("shared-token "));
        assert!(!token.permits("SHARED-TOKEN"));
        assert!(!token.permits(""));
    }

    #[test]
    fn access_token_rejects_prefixes_and_empty_config() {
        let token = AccessToken::new(SecretString::from("shared-token".to_string()));
        assert!(!token.permits("shared"));
        assert!(!token.permits("shared-token-and-more"));

        let empty = AccessToken::new(SecretString::from(String::new()));
        assert!(!empty.permits(""));
        assert!(!empty.permits("anything"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains(SECRET));
        let token = AccessToken::new(SecretString::from("shared-token".to_string()));
        assert!(!format!("{token:?}").contains("shared-token"));
    }
}

//! # Bankdir (bank directory lookup)
//!
//! `bankdir` is a small web service in front of the public bank directory
//! registry. It authenticates users with a signed session cookie, stores
//! credentials as Argon2id hashes in Postgres, and proxies pages of registry
//! rows filtered by column.
//!
//! ## Search endpoints
//!
//! - `GET /api/search` requires a session and keeps rows whose columns equal
//!   the requested values (case-insensitive).
//! - `GET /look_for` requires the shared lookup token and keeps rows whose
//!   columns contain the requested values (case-insensitive).
//!
//! Both filter only the page returned by the registry. The `count` field is the
//! registry's own total and is never recomputed after filtering.

pub mod api;
pub mod cli;
pub mod password;
pub mod registry;
pub mod session;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

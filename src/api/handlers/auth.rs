//! Browser login flow: login, logout and account creation.

use super::{pages, state::AuthState};
use crate::{
    password,
    users::{User, UserStore},
};
use anyhow::{anyhow, Result};
use axum::{
    extract::{Extension, Form},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub async fn login_page() -> Html<String> {
    Html(pages::login(None))
}

/// Verify credentials and start a session.
///
/// A mismatch re-renders the login page with status 200 and an error message.
#[instrument(skip(auth_state, users))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    users: Extension<Arc<dyn UserStore>>,
    Form(credentials): Form<Credentials>,
) -> Response {
    let user = match users.find_by_email(&credentials.email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user: {:#}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::login(Some(pages::LOGIN_UNAVAILABLE))),
            )
                .into_response();
        }
    };

    let verified = match user {
        Some(user) => match verify_blocking(credentials.password, user.password_hash).await {
            Ok(true) => Some(user.email),
            Ok(false) => None,
            Err(err) => {
                error!("Password verification task failed: {:#}", err);
                None
            }
        },
        None => None,
    };

    let Some(email) = verified else {
        info!("Login rejected");
        return Html(pages::login(Some(pages::INVALID_CREDENTIALS))).into_response();
    };

    let cookie = auth_state
        .sessions()
        .issue(&email)
        .and_then(|token| {
            auth_state
                .sessions()
                .cookie(&token)
                .map_err(|e| anyhow!("invalid session cookie: {e}"))
        });

    match cookie {
        Ok(cookie) => {
            info!("Login succeeded");
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            headers.insert(LOCATION, HeaderValue::from_static("/search"));
            (StatusCode::FOUND, headers).into_response()
        }
        Err(err) => {
            error!("Failed to issue session: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::login(Some(pages::LOGIN_UNAVAILABLE))),
            )
                .into_response()
        }
    }
}

/// Clear the session cookie and send the browser back to the login page.
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = auth_state.sessions().clear_cookie() {
        headers.insert(SET_COOKIE, cookie);
    }
    headers.insert(LOCATION, HeaderValue::from_static("/login"));
    (StatusCode::FOUND, headers).into_response()
}

pub async fn create_user_page() -> Html<&'static str> {
    Html(pages::create_user())
}

/// Hash the password and insert a new user.
///
/// No duplicate-email check: the same email can be created more than once.
#[instrument(skip(users))]
pub async fn create_user(
    users: Extension<Arc<dyn UserStore>>,
    Form(credentials): Form<Credentials>,
) -> Response {
    let password_hash = match hash_blocking(credentials.password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {:#}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Failed to create user"})),
            )
                .into_response();
        }
    };

    let user = User {
        email: credentials.email,
        password_hash,
    };

    match users.insert(&user).await {
        Ok(()) => {
            info!("User created");
            Json(json!({"msg": "User created successfully"})).into_response()
        }
        Err(err) => {
            error!("Failed to insert user: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Failed to create user"})),
            )
                .into_response()
        }
    }
}

// Argon2 is CPU-bound; run it on the blocking pool.
async fn verify_blocking(password: String, hash: String) -> Result<bool> {
    Ok(tokio::task::spawn_blocking(move || password::verify(&password, &hash)).await?)
}

async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash(&password)).await?
}

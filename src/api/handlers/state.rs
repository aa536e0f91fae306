use crate::session::{AccessToken, SessionConfig};

/// Authentication settings shared by every handler.
#[derive(Clone, Debug)]
pub struct AuthState {
    sessions: SessionConfig,
    lookup_token: AccessToken,
}

impl AuthState {
    #[must_use]
    pub const fn new(sessions: SessionConfig, lookup_token: AccessToken) -> Self {
        Self {
            sessions,
            lookup_token,
        }
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionConfig {
        &self.sessions
    }

    #[must_use]
    pub const fn lookup_token(&self) -> &AccessToken {
        &self.lookup_token
    }
}

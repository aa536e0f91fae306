//! Credential store: the `users` table.
//!
//! Users are inserted unconditionally; the table has no uniqueness constraint
//! on `email`, so creating the same email twice yields two rows and login
//! checks the first one returned.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};

/// A stored credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub password_hash: String,
}

/// Read/write access to stored users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user row.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Postgres-backed [`UserStore`].
///
/// Each call acquires its own pooled connection; the connection goes back to
/// the pool when it is dropped, on success or error.
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span())
            .await
            .context("failed to acquire database connection")?;

        let query = "SELECT email, password_hash FROM users WHERE email = $1 LIMIT 1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&mut *conn)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        Ok(row.map(|row| User {
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span())
            .await
            .context("failed to acquire database connection")?;

        let query = "INSERT INTO users (email, password_hash) VALUES ($1, $2)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&mut *conn)
            .instrument(span)
            .await
            .context("failed to insert user")?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        use sqlx::Connection;

        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span())
            .await
            .context("failed to acquire database connection")?;
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(span)
            .await
            .context("failed to ping database")
    }
}

fn acquire_span() -> tracing::Span {
    info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    )
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store for router tests.

    use super::{User, UserStore};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    #[derive(Default)]
    pub(crate) struct MemoryUserStore {
        users: Mutex<Vec<User>>,
        unavailable: AtomicBool,
    }

    impl MemoryUserStore {
        pub(crate) fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub(crate) fn count(&self, email: &str) -> usize {
            self.users
                .lock()
                .map(|users| users.iter().filter(|user| user.email == email).count())
                .unwrap_or(0)
        }

        fn check(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(anyhow!("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            self.check()?;
            let users = self.users.lock().map_err(|_| anyhow!("poisoned"))?;
            Ok(users.iter().find(|user| user.email == email).cloned())
        }

        async fn insert(&self, user: &User) -> Result<()> {
            self.check()?;
            self.users
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push(user.clone());
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            self.check()
        }
    }
}

//! Server-side sessions keyed by an opaque token.
//!
//! The token travels to the client in a signed cookie (see `http::session`);
//! everything else stays here. A session expires a fixed TTL after it was
//! created, no matter how often it is used.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `None` for administrators, who live outside the user collection.
    pub user_id: Option<Uuid>,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn customer(user_id: Uuid, email: String) -> Self {
        Self {
            user_id: Some(user_id),
            email,
            role: Role::Customer,
        }
    }

    pub fn admin(email: String) -> Self {
        Self {
            user_id: None,
            email,
            role: Role::Admin,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    // The in-memory backend never fails; remote backends report through this.
    #[cfg_attr(not(test), allow(dead_code))]
    #[error("session backend unavailable: {0}")]
    Unavailable(String),
}

pub trait SessionStore: Send + Sync + Debug {
    /// Stores the session and returns its freshly minted token.
    fn create(&self, session: Session) -> BoxFuture<'_, Result<String, SessionError>>;

    /// `None` for unknown or expired tokens.
    fn get<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Option<Session>, SessionError>>;

    /// Destroying an unknown token succeeds.
    fn destroy<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), SessionError>>;

    /// Drops expired sessions and returns how many were removed.
    fn purge_expired(&self) -> BoxFuture<'_, Result<usize, SessionError>>;

    fn ttl(&self) -> Duration;
}

/// Token -> (session, expires_at).
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, (Session, Instant)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session: Session) -> BoxFuture<'_, Result<String, SessionError>> {
        let token = Uuid::new_v4().simple().to_string();
        let expires = Instant::now() + self.ttl;
        self.inner.insert(token.clone(), (session, expires));
        Box::pin(futures_util::future::ready(Ok(token)))
    }

    fn get<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Option<Session>, SessionError>> {
        let found = match self.inner.get(token) {
            Some(entry) if entry.1 > Instant::now() => Some(entry.0.clone()),
            Some(entry) => {
                drop(entry);
                self.inner.remove(token);
                None
            }
            None => None,
        };
        Box::pin(futures_util::future::ready(Ok(found)))
    }

    fn destroy<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), SessionError>> {
        self.inner.remove(token);
        Box::pin(futures_util::future::ready(Ok(())))
    }

    fn purge_expired(&self) -> BoxFuture<'_, Result<usize, SessionError>> {
        let before = self.inner.len();
        let now = Instant::now();
        self.inner.retain(|_, (_, expires)| *expires > now);
        let removed = before.saturating_sub(self.inner.len());
        Box::pin(futures_util::future::ready(Ok(removed)))
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use uuid::Uuid;

    use super::{MemorySessionStore, Role, Session, SessionStore};

    #[tokio::test]
    async fn created_session_is_returned_until_destroyed() -> Result<()> {
        let store = MemorySessionStore::new(Duration::from_secs(3600));
        let user_id = Uuid::new_v4();
        let token = store
            .create(Session::customer(user_id, String::from("a@b.com")))
            .await?;

        let session = store.get(&token).await?.expect("session present");
        assert_eq!(session.user_id, Some(user_id));
        assert_eq!(session.email, "a@b.com");
        assert_eq!(session.role, Role::Customer);

        store.destroy(&token).await?;
        assert!(store.get(&token).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn destroying_unknown_token_succeeds() -> Result<()> {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.destroy("missing").await?;
        Ok(())
    }

    #[tokio::test]
    async fn tokens_are_unique_per_login() -> Result<()> {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let first = store.create(Session::admin(String::from("ops@shop.test"))).await?;
        let second = store.create(Session::admin(String::from("ops@shop.test"))).await?;
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_are_hidden_and_purged() -> Result<()> {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        let expired = store
            .create(Session::customer(Uuid::new_v4(), String::from("a@b.com")))
            .await?;
        store
            .create(Session::customer(Uuid::new_v4(), String::from("c@d.com")))
            .await?;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get(&expired).await?.is_none());
        assert_eq!(store.purge_expired().await?, 1);
        assert_eq!(store.len(), 0);
        Ok(())
    }
}

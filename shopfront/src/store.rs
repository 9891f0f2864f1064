//! Document store for users and orders.
//!
//! Handlers talk to [`DocumentStore`] through `Arc<dyn DocumentStore>` so the
//! backing implementation is injected at startup (and swapped for failing
//! doubles in tests). [`MemoryStore`] keeps both collections in memory and,
//! when given a snapshot path, mirrors every write to a JSON file so data
//! survives restarts.

use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::model::{NewOrder, NewUser, Order, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("failed to read store snapshot {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write store snapshot {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid store snapshot {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to encode store snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("store is closed")]
    Closed,
}

pub trait DocumentStore: Send + Sync + Debug {
    /// Inserts a user. Fails with [`StoreError::DuplicateEmail`] when the email
    /// is taken; the check and the insert are atomic.
    fn insert_user(&self, user: NewUser) -> BoxFuture<'_, Result<User, StoreError>>;

    fn find_user_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>>;

    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, StoreError>>;

    fn insert_order(&self, order: NewOrder) -> BoxFuture<'_, Result<Order, StoreError>>;

    /// Orders whose email equals `email`, in insertion order.
    fn find_orders_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Order>, StoreError>>;

    fn list_orders(&self) -> BoxFuture<'_, Result<Vec<Order>, StoreError>>;

    /// Flushes pending state and rejects further operations.
    fn close(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    users: Vec<User>,
    orders: Vec<Order>,
}

#[derive(Debug)]
struct Inner {
    collections: Collections,
    closed: bool,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// A store with no backing file. Contents are lost on drop.
    pub fn in_memory() -> Self {
        Self::with_collections(Collections::default(), None)
    }

    /// Opens a store, loading the snapshot file when one is given and exists.
    pub async fn open(snapshot: Option<PathBuf>) -> Result<Self, StoreError> {
        let collections = match snapshot.as_deref() {
            Some(path) => read_snapshot(path).await?,
            None => Collections::default(),
        };

        if let Some(path) = snapshot.as_deref() {
            info!(
                path = %path.display(),
                users = collections.users.len(),
                orders = collections.orders.len(),
                "document store opened"
            );
        } else {
            info!("document store opened without snapshot; data is kept in memory only");
        }

        Ok(Self::with_collections(collections, snapshot))
    }

    fn with_collections(collections: Collections, snapshot: Option<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                collections,
                closed: false,
            }),
            snapshot,
        }
    }

    async fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        let Some(path) = self.snapshot.as_deref() else {
            return Ok(());
        };
        write_snapshot(path, collections).await
    }
}

impl DocumentStore for MemoryStore {
    fn insert_user(&self, user: NewUser) -> BoxFuture<'_, Result<User, StoreError>> {
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }
            if guard
                .collections
                .users
                .iter()
                .any(|existing| existing.email == user.email)
            {
                return Err(StoreError::DuplicateEmail(user.email));
            }

            let user = user.into_user();
            guard.collections.users.push(user.clone());
            if let Err(err) = self.persist(&guard.collections).await {
                guard.collections.users.pop();
                return Err(err);
            }
            debug!(user_id = %user.id, "user inserted");
            Ok(user)
        })
    }

    fn find_user_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>, StoreError>> {
        Box::pin(async move {
            let guard = self.inner.read().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }
            Ok(guard
                .collections
                .users
                .iter()
                .find(|user| user.email == email)
                .cloned())
        })
    }

    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, StoreError>> {
        Box::pin(async move {
            let guard = self.inner.read().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }
            Ok(guard.collections.users.clone())
        })
    }

    fn insert_order(&self, order: NewOrder) -> BoxFuture<'_, Result<Order, StoreError>> {
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }

            let order = order.into_order();
            guard.collections.orders.push(order.clone());
            if let Err(err) = self.persist(&guard.collections).await {
                guard.collections.orders.pop();
                return Err(err);
            }
            debug!(order_id = %order.id, "order inserted");
            Ok(order)
        })
    }

    fn find_orders_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Order>, StoreError>> {
        Box::pin(async move {
            let guard = self.inner.read().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }
            Ok(guard
                .collections
                .orders
                .iter()
                .filter(|order| order.email == email)
                .cloned()
                .collect())
        })
    }

    fn list_orders(&self) -> BoxFuture<'_, Result<Vec<Order>, StoreError>> {
        Box::pin(async move {
            let guard = self.inner.read().await;
            if guard.closed {
                return Err(StoreError::Closed);
            }
            Ok(guard.collections.orders.clone())
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            if guard.closed {
                return Ok(());
            }
            self.persist(&guard.collections).await?;
            guard.closed = true;
            info!("document store closed");
            Ok(())
        })
    }
}

async fn read_snapshot(path: &Path) -> Result<Collections, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Collections::default()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Writes to a sibling temp file and renames it over the snapshot.
async fn write_snapshot(path: &Path, collections: &Collections) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec_pretty(collections).map_err(StoreError::Encode)?;
    let write_err = |source| StoreError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, encoded).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{DocumentStore, MemoryStore, StoreError};
    use crate::model::{NewOrder, NewUser, Product};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            fullname: String::from("Asha Rao"),
            email: String::from(email),
            password_hash: String::from("$argon2id$placeholder"),
            number: String::from("5550100"),
            gender: String::from("female"),
        }
    }

    fn new_order(email: &str, total: f64) -> NewOrder {
        NewOrder {
            name: String::from("A"),
            place: String::from("B"),
            email: String::from(email),
            address: String::from("X"),
            pincode: String::from("1"),
            payment_mode: String::from("COD"),
            products: vec![Product {
                name: String::from("p"),
                price: total,
                quantity: 1,
                img_src: String::from("x"),
            }],
            total_price: total,
        }
    }

    #[tokio::test]
    async fn insert_user_rejects_duplicate_email() -> Result<()> {
        let store = MemoryStore::in_memory();
        store.insert_user(new_user("a@b.com")).await?;

        let second = store.insert_user(new_user("a@b.com")).await;
        assert!(matches!(second, Err(StoreError::DuplicateEmail(email)) if email == "a@b.com"));
        assert_eq!(store.list_users().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() -> Result<()> {
        let store = MemoryStore::in_memory();
        store.insert_user(new_user("a@b.com")).await?;
        store.insert_user(new_user("A@B.com")).await?;

        assert!(store.find_user_by_email("A@b.com").await?.is_none());
        assert_eq!(store.list_users().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_registrations_for_one_email_admit_one_winner() -> Result<()> {
        let store = std::sync::Arc::new(MemoryStore::in_memory());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.insert_user(new_user("race@b.com")).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await?.is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        Ok(())
    }

    #[tokio::test]
    async fn orders_are_filtered_by_email_in_insertion_order() -> Result<()> {
        let store = MemoryStore::in_memory();
        let first = store.insert_order(new_order("a@b.com", 10.0)).await?;
        store.insert_order(new_order("other@b.com", 5.0)).await?;
        let third = store.insert_order(new_order("a@b.com", 20.0)).await?;

        let orders = store.find_orders_by_email("a@b.com").await?;
        assert_eq!(orders, vec![first, third]);
        assert_eq!(store.list_orders().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_survives_close_and_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data").join("store.json");

        let store = MemoryStore::open(Some(path.clone())).await?;
        let user = store.insert_user(new_user("a@b.com")).await?;
        let order = store.insert_order(new_order("a@b.com", 10.0)).await?;
        store.close().await?;

        let reopened = MemoryStore::open(Some(path)).await?;
        assert_eq!(reopened.find_user_by_email("a@b.com").await?, Some(user));
        assert_eq!(reopened.list_orders().await?, vec![order]);
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_corrupt_snapshot() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json")?;

        let result = MemoryStore::open(Some(path)).await;
        assert!(matches!(result, Err(StoreError::Parse { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn closed_store_rejects_operations() -> Result<()> {
        let store = MemoryStore::in_memory();
        store.close().await?;

        assert!(matches!(store.list_users().await, Err(StoreError::Closed)));
        assert!(matches!(
            store.insert_order(new_order("a@b.com", 1.0)).await,
            Err(StoreError::Closed)
        ));
        Ok(())
    }
}

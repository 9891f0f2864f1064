//! Salted Argon2id password hashing.
//!
//! Hashing and verification are CPU-bound, so the async entry points move the
//! work onto tokio's blocking pool.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Arc<Params>,
    /// Verified against when the account does not exist, so a miss costs the
    /// same as a wrong password.
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Argon2id with the crate's default cost parameters.
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(Params::default())
    }

    /// Minimum-cost parameters for tests.
    #[cfg(test)]
    #[allow(clippy::expect_used)]
    pub fn fast() -> Self {
        Self::with_params(
            Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .expect("minimum argon2 params are valid"),
        )
        .expect("minimum argon2 params hash")
    }

    pub fn with_params(params: Params) -> Result<Self, PasswordError> {
        let params = Arc::new(params);
        let dummy_hash = hash_with(&params, "shopfront-dummy-password")?;
        Ok(Self {
            params,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.params, password)
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password)).await?
    }

    /// `Ok(false)` for a mismatch or an unparseable stored hash.
    pub async fn verify(&self, password: String, stored: String) -> Result<bool, PasswordError> {
        tokio::task::spawn_blocking(move || Ok(verify_hash(&password, &stored))).await?
    }

    /// Burns one verification against the dummy hash and always reports a miss.
    pub async fn verify_dummy(&self, password: String) -> Result<bool, PasswordError> {
        let stored = self.dummy_hash.to_string();
        self.verify(password, stored).await.map(|_| false)
    }
}

fn hash_with(params: &Params, password: &str) -> Result<String, PasswordError> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

/// Parameters are read back from the PHC string, so hashes made with other
/// costs still verify.
fn verify_hash(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::PasswordHasher;

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() -> Result<()> {
        let hasher = PasswordHasher::fast();
        let hash = hasher.hash(String::from("hunter2")).await?;

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(hasher.verify(String::from("hunter2"), hash.clone()).await?);
        assert!(!hasher.verify(String::from("hunter3"), hash).await?);
        Ok(())
    }

    #[tokio::test]
    async fn hashes_are_salted() -> Result<()> {
        let hasher = PasswordHasher::fast();
        let first = hasher.hash(String::from("same")).await?;
        let second = hasher.hash(String::from("same")).await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn garbage_stored_hash_is_a_mismatch() -> Result<()> {
        let hasher = PasswordHasher::fast();
        assert!(!hasher.verify(String::from("pw"), String::from("plaintext")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn dummy_verification_never_matches() -> Result<()> {
        let hasher = PasswordHasher::fast();
        assert!(!hasher.verify_dummy(String::from("shopfront-dummy-password")).await?);
        Ok(())
    }
}

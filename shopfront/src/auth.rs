//! Administrator credentials, kept apart from the customer user collection.
//!
//! ## Admin file format
//!
//! **Single admin (flat):**
//! ```toml
//! email = "admin@example.com"
//! password_hash = "$argon2id$v=19$m=19456,t=2,p=1$..."
//! ```
//!
//! **Multiple admins (array):**
//! ```toml
//! [[admins]]
//! email = "alice@example.com"
//! password_hash = "$argon2id$..."
//!
//! [[admins]]
//! email = "bob@example.com"
//! password = "plaintext-is-hashed-at-load"
//! ```
//!
//! Both styles can be combined. Each entry takes either `password_hash` (a PHC
//! string) or `password`, which is hashed in memory when the file is loaded.
//! Duplicate emails are deduplicated (last wins); blank entries are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::password::{PasswordError, PasswordHasher};

#[derive(Debug, Clone, Default)]
pub struct AdminCredentials {
    admins: BTreeMap<String, String>,
}

impl AdminCredentials {
    pub fn from_admins(admins: Vec<AdminUser>) -> Self {
        let mut mapped = BTreeMap::new();

        for admin in admins {
            let email = admin.email.trim().to_string();
            let password_hash = admin.password_hash.trim().to_string();
            if email.is_empty() || password_hash.is_empty() {
                continue;
            }
            mapped.insert(email, password_hash);
        }

        Self { admins: mapped }
    }

    pub fn is_enabled(&self) -> bool {
        !self.admins.is_empty()
    }

    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }

    pub async fn is_authorized(
        &self,
        hasher: &PasswordHasher,
        email: &str,
        password: &str,
    ) -> Result<bool, PasswordError> {
        let Some(stored) = self.admins.get(email) else {
            return Ok(false);
        };
        hasher
            .verify(password.to_string(), stored.clone())
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum AuthFileError {
    #[error("failed to read admin file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid admin config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("admin entry {email} in {path} needs either password or password_hash")]
    MissingSecret { path: String, email: String },
    #[error("failed to hash admin password for {email}: {source}")]
    Hash {
        email: String,
        source: PasswordError,
    },
    #[error("admin file {path} does not define valid credentials")]
    EmptyCredentials { path: String },
}

#[derive(Debug, Default, Deserialize)]
struct AdminFile {
    email: Option<String>,
    password: Option<String>,
    password_hash: Option<String>,
    admins: Option<Vec<AdminEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct AdminEntry {
    email: String,
    password: Option<String>,
    password_hash: Option<String>,
}

/// Load admin credentials from a file. Returns empty credentials if path is None.
/// Warns if the file is world-readable (Unix only).
pub fn load_admins(
    path: Option<&Path>,
    hasher: &PasswordHasher,
) -> Result<AdminCredentials, AuthFileError> {
    if let Some(p) = path {
        check_admin_file_permissions(p);
    }
    let admins = load_admins_from_file(path, hasher)?;
    Ok(AdminCredentials::from_admins(admins))
}

#[cfg(unix)]
fn check_admin_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o004 != 0 {
            warn!(
                path = %path.display(),
                "admin file is world-readable; consider chmod 600"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_admin_file_permissions(_path: &Path) {}

/// Requires at least one valid admin when path is Some.
pub fn load_admins_from_file(
    path: Option<&Path>,
    hasher: &PasswordHasher,
) -> Result<Vec<AdminUser>, AuthFileError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| AuthFileError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let parsed: AdminFile = toml::from_str(&raw).map_err(|source| AuthFileError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let mut entries = Vec::new();
    if let Some(email) = parsed.email {
        entries.push(AdminEntry {
            email,
            password: parsed.password,
            password_hash: parsed.password_hash,
        });
    }
    entries.extend(parsed.admins.unwrap_or_default());

    let mut admins = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.email.trim().is_empty() {
            continue;
        }
        let password_hash = match (entry.password_hash, entry.password) {
            (Some(hash), _) if !hash.trim().is_empty() => hash,
            (_, Some(password)) if !password.is_empty() => {
                warn!(
                    email = %entry.email,
                    "admin file holds a plaintext password; prefer password_hash"
                );
                hasher
                    .hash_blocking(&password)
                    .map_err(|source| AuthFileError::Hash {
                        email: entry.email.clone(),
                        source,
                    })?
            }
            _ => {
                return Err(AuthFileError::MissingSecret {
                    path: path.display().to_string(),
                    email: entry.email,
                })
            }
        };
        admins.push(AdminUser {
            email: entry.email,
            password_hash,
        });
    }

    if AdminCredentials::from_admins(admins.clone()).is_enabled() {
        Ok(admins)
    } else {
        Err(AuthFileError::EmptyCredentials {
            path: path.display().to_string(),
        })
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::auth::AdminCredentials;
use crate::password::PasswordHasher;
use crate::session::SessionStore;
use crate::store::DocumentStore;

/// How the session token is carried to the client.
#[derive(Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub key: Key,
}

impl std::fmt::Debug for CookieSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSettings")
            .field("name", &self.name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub admins: Arc<AdminCredentials>,
    pub hasher: PasswordHasher,
    pub cookies: CookieSettings,
    pub admin_redirect: String,
    pub public_dir: PathBuf,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookies.key.clone()
    }
}

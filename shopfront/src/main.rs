//! # shopfront
//!
//! Minimal e-commerce backend: customer accounts, checkout and admin listings.
//!
//! ## Architecture
//!
//! - **Store**: injected document store for users and orders, optionally
//!   snapshotted to `<data-dir>/store.json`; opened at startup, closed on shutdown
//! - **Sessions**: server-side session records behind a signed cookie, expiring a
//!   fixed TTL after login
//! - **Auth**: Argon2id password hashes; administrators come from a separate TOML file
//! - **HTTP**: Axum router with rate limiting, request IDs, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod auth;
mod config;
mod http;
mod model;
mod password;
mod session;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::serve;
use axum_extra::extract::cookie::Key;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::load_admins;
use crate::config::{AppConfig, Cli};
use crate::http::{router, AppState, CookieSettings};
use crate::password::PasswordHasher;
use crate::session::{MemorySessionStore, SessionStore};
use crate::store::{DocumentStore, MemoryStore};

const MAX_REAP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    let hasher = PasswordHasher::new().context("failed to initialize password hashing")?;
    let admins = load_admins(config.admin_file.as_deref(), &hasher)
        .context("failed to load admin credentials file")?;
    info!(
        bind = %config.bind,
        data_dir = ?config.data_dir.as_ref().map(|path| path.display().to_string()),
        public_dir = %config.public_dir.display(),
        admin_count = admins.admin_count(),
        session_ttl = %humantime::format_duration(config.session.ttl),
        cookie_secure = config.session.cookie_secure,
        "configuration loaded"
    );
    if !admins.is_enabled() {
        warn!("no admin file configured; admin login is disabled");
    }

    let key = match config.session.secret.as_deref() {
        Some(secret) => Key::derive_from(secret.as_bytes()),
        None => {
            warn!("no session secret configured; sessions will not survive a restart");
            Key::generate()
        }
    };

    let store = Arc::new(
        MemoryStore::open(config.snapshot_path())
            .await
            .context("failed to open document store")?,
    );

    let sessions = MemorySessionStore::new(config.session.ttl);
    spawn_session_reaper(sessions.clone(), config.session.ttl.min(MAX_REAP_INTERVAL));

    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn DocumentStore>,
        sessions: Arc::new(sessions),
        admins: Arc::new(admins),
        hasher,
        cookies: CookieSettings {
            name: config.session.cookie_name.clone(),
            secure: config.session.cookie_secure,
            key,
        },
        admin_redirect: config.admin_redirect.clone(),
        public_dir: config.public_dir.clone(),
    };

    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "shopfront listening");

    let served = serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await;

    if let Err(err) = store.close().await {
        error!(error = %err, "failed to close document store");
    }
    served.context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

/// Periodically drops expired sessions. Logs errors but does not panic.
fn spawn_session_reaper(sessions: MemorySessionStore, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(
                    removed,
                    active = sessions.len(),
                    "expired sessions purged"
                ),
                Err(err) => error!(error = %err, "session purge failed"),
            }
        }
    });
}

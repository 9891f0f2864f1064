use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_COOKIE_NAME: &str = "shopfront_session";
pub const DEFAULT_ADMIN_REDIRECT: &str = "/admin.html";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Parser)]
#[command(
    name = "shopfront",
    version,
    about = "Minimal e-commerce backend with accounts, checkout and admin listings"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the store snapshot; omit to keep data in memory only.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub admin_file: Option<PathBuf>,

    /// Session lifetime, e.g. `1h` or `30m`.
    #[arg(long, value_name = "DURATION")]
    pub session_ttl: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub public_dir: PathBuf,
    pub admin_file: Option<PathBuf>,
    pub session: SessionConfig,
    pub admin_redirect: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// `None` means a random key is generated at startup.
    pub secret: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            cookie_name: String::from(DEFAULT_COOKIE_NAME),
            cookie_secure: false,
            secret: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("env var {key} is not valid unicode")]
    NonUnicodeEnv { key: String },
    #[error("invalid session ttl {value}: {source}")]
    InvalidTtl {
        value: String,
        source: humantime::DurationError,
    },
    #[error("session secret must be at least 32 bytes")]
    ShortSecret,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    data_dir: Option<PathBuf>,
    public_dir: Option<PathBuf>,
    admin_file: Option<PathBuf>,
    admin_redirect: Option<String>,
    #[serde(default)]
    session: FileSessionConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileSessionConfig {
    ttl: Option<String>,
    cookie_name: Option<String>,
    cookie_secure: Option<bool>,
    secret: Option<String>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        let env_secret = read_env_string("SHOPFRONT_SESSION_SECRET")?;
        let env_secure = read_env_bool("SHOPFRONT_COOKIE_SECURE")?;

        let bind = cli
            .bind
            .or(from_file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
        let data_dir = cli.data_dir.or(from_file.data_dir);
        let public_dir = cli
            .public_dir
            .or(from_file.public_dir)
            .unwrap_or_else(|| PathBuf::from("./public"));
        let admin_file = cli.admin_file.or(from_file.admin_file);
        let admin_redirect = from_file
            .admin_redirect
            .unwrap_or_else(|| String::from(DEFAULT_ADMIN_REDIRECT));

        let defaults = SessionConfig::default();
        let ttl = match cli.session_ttl.or(from_file.session.ttl) {
            Some(raw) => parse_ttl(&raw)?,
            None => defaults.ttl,
        };
        let secret = env_secret.or(from_file.session.secret);
        if secret.as_ref().is_some_and(|s| s.len() < MIN_SECRET_LEN) {
            return Err(ConfigError::ShortSecret);
        }

        Ok(Self {
            bind,
            data_dir,
            public_dir,
            admin_file,
            session: SessionConfig {
                ttl,
                cookie_name: from_file
                    .session
                    .cookie_name
                    .unwrap_or(defaults.cookie_name),
                cookie_secure: env_secure
                    .or(from_file.session.cookie_secure)
                    .unwrap_or(defaults.cookie_secure),
                secret,
            },
            admin_redirect,
        })
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("store.json"))
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let ttl = humantime::parse_duration(raw.trim()).map_err(|source| ConfigError::InvalidTtl {
        value: String::from(raw),
        source,
    })?;
    Ok(ttl.max(Duration::from_secs(1)))
}

fn read_env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicodeEnv {
            key: String::from(key),
        }),
    }
}

fn read_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match read_env_string(key)? {
        Some(value) => parse_bool_value(key, &value).map(Some),
        None => Ok(None),
    }
}

fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from(raw),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use anyhow::Result;
    use clap::Parser;
    use tempfile::tempdir;

    use super::{parse_bool_value, parse_ttl, AppConfig, Cli, ConfigError, DEFAULT_ADMIN_REDIRECT};

    #[test]
    fn parse_bool_value_accepts_common_values() {
        assert_eq!(parse_bool_value("K", "true").ok(), Some(true));
        assert_eq!(parse_bool_value("K", " on ").ok(), Some(true));
        assert_eq!(parse_bool_value("K", "NO").ok(), Some(false));
        assert_eq!(parse_bool_value("K", "0").ok(), Some(false));
        assert!(parse_bool_value("K", "maybe").is_err());
    }

    #[test]
    fn parse_ttl_accepts_humantime_durations() {
        assert_eq!(parse_ttl("1h").ok(), Some(Duration::from_secs(3600)));
        assert_eq!(parse_ttl(" 30m ").ok(), Some(Duration::from_secs(1800)));
        assert!(parse_ttl("soon").is_err());
    }

    #[test]
    fn defaults_apply_without_file_or_flags() -> Result<()> {
        let config = AppConfig::from_cli(Cli::parse_from(["shopfront"]))?;
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.session.ttl, Duration::from_secs(3600));
        assert_eq!(config.session.cookie_name, "shopfront_session");
        assert_eq!(config.admin_redirect, "/admin.html");
        assert!(config.snapshot_path().is_none());
        Ok(())
    }

    #[test]
    fn default_admin_redirect_is_a_shipped_page() {
        let page = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("public")
            .join(DEFAULT_ADMIN_REDIRECT.trim_start_matches('/'));
        assert!(page.is_file(), "{} is missing", page.display());
    }

    #[test]
    fn cli_flags_override_file_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("shopfront.toml");
        std::fs::write(
            &path,
            "bind = \"127.0.0.1:4000\"\ndata_dir = \"/var/lib/shop\"\nadmin_redirect = \"/ops\"\n[session]\nttl = \"2h\"\ncookie_name = \"sid\"\n",
        )?;
        let path_arg = path.display().to_string();

        let config = AppConfig::from_cli(Cli::parse_from([
            "shopfront",
            "--config",
            path_arg.as_str(),
            "--bind",
            "127.0.0.1:5000",
            "--session-ttl",
            "15m",
        ]))?;

        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.session.ttl, Duration::from_secs(900));
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.admin_redirect, "/ops");
        assert_eq!(
            config.snapshot_path(),
            Some(std::path::PathBuf::from("/var/lib/shop/store.json"))
        );
        Ok(())
    }

    #[test]
    fn short_session_secret_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("shopfront.toml");
        std::fs::write(&path, "[session]\nsecret = \"too-short\"\n")?;
        let path_arg = path.display().to_string();

        let result = AppConfig::from_cli(Cli::parse_from(["shopfront", "-c", path_arg.as_str()]));
        assert!(matches!(result, Err(ConfigError::ShortSecret)));
        Ok(())
    }
}

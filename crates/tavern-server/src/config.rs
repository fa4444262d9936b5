use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

/// Placeholder JWT secret that should never reach production.
const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

/// Runtime settings, read from `TAVERN_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub online_threshold_secs: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env_or("TAVERN_JWT_SECRET", PLACEHOLDER_SECRET);
        if jwt_secret == PLACEHOLDER_SECRET {
            warn!("TAVERN_JWT_SECRET is unset; using the development placeholder");
        }

        Ok(Self {
            host: env_or("TAVERN_HOST", "0.0.0.0"),
            port: parse_env("TAVERN_PORT", 8000)?,
            db_path: env_or("TAVERN_DB_PATH", "database.db").into(),
            upload_dir: env_or("TAVERN_UPLOAD_DIR", "uploads").into(),
            static_dir: env_or("TAVERN_STATIC_DIR", "static").into(),
            jwt_secret,
            jwt_ttl_days: parse_env("TAVERN_JWT_TTL_DAYS", 30)?,
            online_threshold_secs: parse_env("TAVERN_ONLINE_THRESHOLD_SECS", 300)?,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{} is not valid: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub analysis_api_url: String,
    pub analysis_timeout_secs: u64,
    pub record_store: StoreBackend,
    /// Required when `record_store` is Postgres.
    pub database_url: Option<String>,
    pub max_upload_bytes: usize,
    /// Idle time after which a browser session's navigator is dropped.
    pub session_idle_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let record_store = match optional_env("RECORD_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("RECORD_STORE must be 'postgres' or 'memory', got '{other}'"),
        };

        let database_url = match record_store {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => optional_env("DATABASE_URL"),
        };

        Ok(Config {
            analysis_api_url: require_env("ANALYSIS_API_URL")?,
            analysis_timeout_secs: parse_env("ANALYSIS_TIMEOUT_SECS", 120)?,
            record_store,
            database_url,
            max_upload_bytes: parse_env::<usize>("MAX_UPLOAD_MB", 25)? * 1024 * 1024,
            session_idle_secs: parse_env::<u64>("SESSION_IDLE_MINS", 30)? * 60,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} must be a valid number, got '{raw}'")),
    }
}

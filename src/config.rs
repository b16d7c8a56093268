use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub session_inactivity_minutes: i64,
    pub invitation_ttl_days: i64,
    pub invitation_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // .env is optional outside development
        let _ = dotenv::dotenv();

        Ok(Self {
            database_url: dotenv::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 16)?,
            busy_timeout_ms: parsed_or("DATABASE_BUSY_TIMEOUT_MS", 5000)?,
            session_inactivity_minutes: parsed_or("SESSION_INACTIVITY_MINUTES", 5)?,
            invitation_ttl_days: parsed_or("INVITATION_TTL_DAYS", 30)?,
            invitation_sweep_secs: parsed_or("INVITATION_SWEEP_SECS", 3600)?,
        })
    }

    /// How long a connection waits on another connection's write lock.
    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn invitation_ttl(&self) -> time::Duration {
        time::Duration::days(self.invitation_ttl_days)
    }

    pub fn session_inactivity(&self) -> time::Duration {
        time::Duration::minutes(self.session_inactivity_minutes)
    }

    pub fn invitation_sweep(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.invitation_sweep_secs.max(1))
    }
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use ladle::BusConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the server keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub command_timeout_secs: u64,
    pub event_timeout_secs: u64,
    /// 0 = unbounded
    pub handler_concurrency_limit: usize,
    /// Reruns for an event handler that lost a write conflict
    pub conflict_retries: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            port: parse_var("PORT", 8080)?,
            command_timeout_secs: parse_var("COMMAND_TIMEOUT_SECS", 30)?,
            event_timeout_secs: parse_var("EVENT_TIMEOUT_SECS", 10)?,
            handler_concurrency_limit: parse_var("HANDLER_CONCURRENCY_LIMIT", 0)?,
            conflict_retries: parse_var("CONFLICT_RETRIES", 3)?,
        })
    }

    /// Bus settings derived from this configuration.
    pub fn bus_config(&self) -> BusConfig {
        BusConfig::default()
            .with_command_timeout(Duration::from_secs(self.command_timeout_secs))
            .with_event_timeout(Duration::from_secs(self.event_timeout_secs))
            .with_concurrency_limit(self.handler_concurrency_limit)
            .with_conflict_retries(self.conflict_retries)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}

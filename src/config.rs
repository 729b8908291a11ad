use std::{str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub reap_interval: Duration,
    pub idle_threshold: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://chat.db?mode=rwc".to_owned(),
            port: 5000,
            max_connections: 16,
            reap_interval: Duration::from_secs(15),
            idle_threshold: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Reads the process environment (and `.env`, if present) on top of the defaults.
    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let defaults = Config::default();

        let config = Config {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            reap_interval: parse_var(&lookup, "REAP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.reap_interval),
            idle_threshold: parse_var(&lookup, "IDLE_THRESHOLD_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_threshold),
        };

        // a zero idle threshold is fine, a zero period is not
        if config.reap_interval.is_zero() {
            anyhow::bail!("REAP_INTERVAL_SECS must be at least 1");
        }
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{key}={raw:?} is not valid")))
        .transpose()
}

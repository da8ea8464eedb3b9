//! Server configuration read from the environment.
//!
//! - `SERVER_ADDR`: listen address (default `0.0.0.0:8080`)
//! - `GAME_IDLE_TIMEOUT_SECS`: a game untouched this long is evicted (default 3600)
//! - `EVICTION_INTERVAL_SECS`: how often the eviction sweep runs (default 60)

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a socket address like 0.0.0.0:8080, got '{value}'")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub idle_timeout: Duration,
    pub eviction_interval: Duration,
}

impl ServerConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which returns the raw value of
    /// a variable if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = match lookup("SERVER_ADDR") {
            Some(value) => {
                let parsed = value.trim().parse::<SocketAddr>();
                parsed.map_err(|_| ConfigError::InvalidAddr {
                    var: "SERVER_ADDR",
                    value,
                })?
            }
            None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        };

        Ok(Self {
            addr,
            idle_timeout: seconds(&lookup, "GAME_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?,
            eviction_interval: seconds(
                &lookup,
                "EVICTION_INTERVAL_SECS",
                DEFAULT_EVICTION_INTERVAL_SECS,
            )?,
        })
    }
}

fn seconds<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    let parsed = value.trim().parse::<u64>();
    match parsed {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds { var, value }),
    }
}

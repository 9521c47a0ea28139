//! Store lifecycle manager configuration (C4). Constructible
//! from explicit fields or from `LTM_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EngineError, Result};

const DEFAULT_MAX_OPEN_STORES: usize = 100;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the store lifecycle manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Absolute directory within which every per-session store lives.
    pub base_path: PathBuf,
    /// Bounded pool size; overflow triggers LRU eviction.
    pub max_open_stores: usize,
    /// A store idle longer than this is closed by the periodic cleanup task.
    pub idle_timeout: Duration,
    /// How often the idle-cleanup task wakes up.
    pub cleanup_interval: Duration,
    /// Ambient ceiling a facade call inherits when the caller does not
    /// supply its own deadline ("accept an overall deadline or
    /// inherit an ambient one"). `None` disables the ambient deadline.
    pub operation_timeout: Option<Duration>,
}

impl ManagerConfig {
    /// Build configuration from `LTM_*` environment variables, falling back
    /// to a user-scoped default base path (`dirs::data_dir()`) and the
    /// documented defaults for every other field.
    ///
    /// - `LTM_BASE_PATH` (supports `~` expansion)
    /// - `LTM_MAX_OPEN_STORES`
    /// - `LTM_IDLE_TIMEOUT_SECS`
    /// - `LTM_CLEANUP_INTERVAL_SECS`
    /// - `LTM_OPERATION_TIMEOUT_SECS` (set to `0` to disable the ambient deadline)
    pub fn from_env() -> Result<Self> {
        let base_path = match std::env::var("LTM_BASE_PATH") {
            Ok(raw) => {
                let expanded = shellexpand::tilde(&raw);
                PathBuf::from(expanded.as_ref())
            }
            Err(_) => default_base_path()?,
        };

        let max_open_stores = parse_env_or("LTM_MAX_OPEN_STORES", DEFAULT_MAX_OPEN_STORES)?;
        let idle_timeout_secs = parse_env_or("LTM_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?;
        let cleanup_interval_secs =
            parse_env_or("LTM_CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS)?;
        let operation_timeout_secs =
            parse_env_or("LTM_OPERATION_TIMEOUT_SECS", DEFAULT_OPERATION_TIMEOUT_SECS)?;

        Ok(Self {
            base_path,
            max_open_stores,
            idle_timeout: Duration::from_secs(idle_timeout_secs),
            cleanup_interval: Duration::from_secs(cleanup_interval_secs),
            operation_timeout: non_zero_duration(operation_timeout_secs),
        })
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path().unwrap_or_else(|_| PathBuf::from("./ltm-data")),
            max_open_stores: DEFAULT_MAX_OPEN_STORES,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            operation_timeout: Some(Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)),
        }
    }
}

fn non_zero_duration(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

fn default_base_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("ltm-engine").join("stores"))
        .ok_or_else(|| EngineError::Internal("could not resolve a user data directory".into()))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EngineError::Internal(format!("{key} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = ManagerConfig::default();
        assert_eq!(config.max_open_stores, DEFAULT_MAX_OPEN_STORES);
        assert_eq!(config.idle_timeout, Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS));
    }
}

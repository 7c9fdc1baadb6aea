//! Runtime settings from the environment (and `.env`).
//!
//! | variable               | default          |
//! |------------------------|------------------|
//! | `MCAL_DB_PATH`         | `calibration.db` |
//! | `MCAL_BUSY_TIMEOUT_MS` | `2000`           |
//! | `MCAL_LOCK_TIMEOUT_MS` | `5000`           |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::store::StoreConfig;

pub const DEFAULT_DB_PATH: &str = "calibration.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store: StoreConfig,
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unset or blank keys use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let path = get("MCAL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let busy_timeout_ms = parse_u64("MCAL_BUSY_TIMEOUT_MS", get("MCAL_BUSY_TIMEOUT_MS"), 2000)?;
        let lock_timeout_ms = parse_u64("MCAL_LOCK_TIMEOUT_MS", get("MCAL_LOCK_TIMEOUT_MS"), 5000)?;

        if lock_timeout_ms == 0 {
            return Err(AppError::new(2, "MCAL_LOCK_TIMEOUT_MS must be at least 1"));
        }

        Ok(Self {
            store: StoreConfig {
                path,
                busy_timeout: Duration::from_millis(busy_timeout_ms),
                lock_timeout: Duration::from_millis(lock_timeout_ms),
            },
        })
    }
}

fn parse_u64(key: &str, raw: Option<String>, default: u64) -> Result<u64, AppError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .ok()
            .filter(|n| *n <= u32::MAX as u64)
            .ok_or_else(|| AppError::new(2, format!("{key} must be a non-negative integer, got {v:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, AppError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.store.path, PathBuf::from("calibration.db"));
        assert_eq!(s.store.busy_timeout, Duration::from_millis(2000));
        assert_eq!(s.store.lock_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn overrides_are_read() {
        let s = settings(&[
            ("MCAL_DB_PATH", " /tmp/lab.db "),
            ("MCAL_BUSY_TIMEOUT_MS", "250"),
            ("MCAL_LOCK_TIMEOUT_MS", ""),
        ])
        .unwrap();
        assert_eq!(s.store.path, PathBuf::from("/tmp/lab.db"));
        assert_eq!(s.store.busy_timeout, Duration::from_millis(250));
        assert_eq!(s.store.lock_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = settings(&[("MCAL_BUSY_TIMEOUT_MS", "soon")]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("MCAL_BUSY_TIMEOUT_MS"));

        let err = settings(&[("MCAL_LOCK_TIMEOUT_MS", "0")]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

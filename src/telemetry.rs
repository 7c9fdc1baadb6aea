//! Logging setup for the `mcal` binary.
//!
//! Logs go to stderr so stdout carries only command output.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Default filter when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Build the filter: an explicit `level` wins over `RUST_LOG`.
pub fn log_filter(level: Option<&str>) -> Result<EnvFilter, AppError> {
    match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| AppError::new(2, format!("Invalid --log-level '{level}': {e}"))),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(level: Option<&str>) -> Result<(), AppError> {
    let filter = log_filter(level)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_is_parsed() {
        assert!(log_filter(Some("debug")).is_ok());
        assert!(log_filter(Some("maturity_calibration=trace,warn")).is_ok());
    }

    #[test]
    fn malformed_level_is_a_config_error() {
        let err = log_filter(Some("mcal=notalevel")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

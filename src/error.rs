//! Error types.
//!
//! Two layers:
//!
//! - [`CalibrationError`]: what the core (validator, fitter, renderer, store)
//!   reports. Every variant is local to one user action; nothing here is fatal.
//! - [`AppError`]: what the `mcal` binary reports, carrying a process exit code.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Minimum number of valid samples required to attempt a fit.
pub const MIN_SAMPLES: usize = 2;

/// Core error taxonomy.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Fewer than [`MIN_SAMPLES`] valid samples survived validation.
    #[error("insufficient data: found {found} valid sample(s), need at least {MIN_SAMPLES}")]
    InsufficientData { found: usize },

    /// Input could not be interpreted (missing column, unreadable source, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The regression is mathematically ill-posed for this input.
    #[error("degenerate fit: {0}")]
    DegenerateFit(String),

    /// The renderer received input that upstream validation should have excluded.
    #[error("report rendering failed: {0}")]
    Render(String),

    /// A store write failed and was rolled back, or the store could not be used.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("calibration record {0} not found")]
    RecordNotFound(i64),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Coarse classification used for user messaging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DegenerateFit,
    Render,
    Persistence,
}

impl CalibrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibrationError::InsufficientData { .. } | CalibrationError::InvalidInput(_) => {
                ErrorKind::Validation
            }
            CalibrationError::DegenerateFit(_) => ErrorKind::DegenerateFit,
            CalibrationError::Render(_) => ErrorKind::Render,
            CalibrationError::Persistence(_)
            | CalibrationError::RecordNotFound(_)
            | CalibrationError::Sqlite(_) => ErrorKind::Persistence,
        }
    }

    /// Plain, non-technical message suitable for the person entering data.
    pub fn user_message(&self) -> String {
        match self {
            CalibrationError::InsufficientData { found } => format!(
                "Only {found} valid measurement(s) were found. Enter at least {MIN_SAMPLES} pairs with a positive maturity and a numeric strength."
            ),
            CalibrationError::InvalidInput(msg) => format!("The input could not be read: {msg}."),
            CalibrationError::DegenerateFit(_) => {
                "The measurements do not define a curve. Use samples taken at different maturities."
                    .to_string()
            }
            CalibrationError::Render(_) => {
                "The report could not be generated because of an internal error.".to_string()
            }
            CalibrationError::RecordNotFound(id) => {
                format!("No saved calibration with id {id} exists.")
            }
            CalibrationError::Persistence(_) | CalibrationError::Sqlite(_) => {
                "The result could not be saved. Nothing was written; please try again.".to_string()
            }
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        let code = match err.kind() {
            ErrorKind::Validation | ErrorKind::DegenerateFit => 3,
            ErrorKind::Render => {
                // Render failures mean an upstream invariant was broken.
                tracing::error!(error = %err, "report renderer rejected its input");
                4
            }
            ErrorKind::Persistence => 5,
        };
        AppError::new(code, err.user_message())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

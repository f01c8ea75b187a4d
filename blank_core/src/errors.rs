//! # Error Types
//!
//! Structured error types for blank_core. Only catalog-level and model-lookup
//! failures ever reach a caller; per-formula evaluation failures are recovered
//! inside the resolver (see [`crate::expression::EvalError`]).
//!
//! ## Example
//!
//! ```rust
//! use blank_core::errors::{EngineError, EngineResult};
//!
//! fn validate_thickness(d: f64) -> EngineResult<()> {
//!     if !(d.is_finite() && d > 0.0) {
//!         return Err(EngineError::invalid_input("d", d.to_string(), "Thickness must be positive"));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for blank_core operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Structured error type for engine operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EngineError {
    /// An input value is non-finite or not strictly positive
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The requested model has no rows in the formula catalog
    #[error("Unknown model: '{model}' has no formulas in the catalog")]
    UnknownModel { model: String },

    /// The formula table could not be read
    #[error("Formula table error: '{path}' - {reason}")]
    TableLoad { path: String, reason: String },
}

impl EngineError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownModel error
    pub fn unknown_model(model: impl Into<String>) -> Self {
        EngineError::UnknownModel { model: model.into() }
    }

    /// Create a TableLoad error
    pub fn table_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::TableLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput { .. } => "INVALID_INPUT",
            EngineError::UnknownModel { .. } => "UNKNOWN_MODEL",
            EngineError::TableLoad { .. } => "TABLE_LOAD",
        }
    }
}

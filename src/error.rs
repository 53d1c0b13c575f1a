// src/error.rs
use std::fmt;

/// Custom error types for the option-engines library
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Invalid parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration (array lengths, path counts, ...)
    InvalidConfiguration { field: String, reason: String },

    /// Numerical instability or convergence failure
    NumericalInstability { method: String, reason: String },

    /// Bisection bracket search exhausted: the target price is economically
    /// inconsistent with the model (no volatility reproduces it)
    BracketExhausted { target_price: f64, bound: f64 },

    /// Too few observations for parameter estimation
    InsufficientData { required: usize, actual: usize },

    /// Calibration error
    CalibrationError {
        reason: String,
        current_error: Option<f64>,
    },

    /// Operation cancelled via a cancellation token
    Cancelled { operation: String },

    /// I/O failure while reading a time-series file
    Io { path: String, reason: String },

    /// Malformed row or header in a time-series file
    Format { line: usize, reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            EngineError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            EngineError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
            EngineError::BracketExhausted {
                target_price,
                bound,
            } => {
                write!(
                    f,
                    "Implied volatility bracket search exhausted at sigma = {:.3e}: no volatility reproduces price {}",
                    bound, target_price
                )
            }
            EngineError::InsufficientData { required, actual } => {
                write!(
                    f,
                    "Insufficient data: {} observations required, got {}",
                    required, actual
                )
            }
            EngineError::CalibrationError {
                reason,
                current_error,
            } => match current_error {
                Some(err) => write!(
                    f,
                    "Calibration failed (current error: {:.6}): {}",
                    err, reason
                ),
                None => write!(f, "Calibration failed: {}", reason),
            },
            EngineError::Cancelled { operation } => {
                write!(f, "Operation '{}' cancelled", operation)
            }
            EngineError::Io { path, reason } => {
                write!(f, "I/O error reading '{}': {}", path, reason)
            }
            EngineError::Format { line, reason } => {
                write!(f, "Malformed time-series data at line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type alias for option-engines operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Validation utilities
pub mod validation {
    use super::{EngineError, EngineResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> EngineResult<()> {
        if value <= 0.0 {
            Err(EngineError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> EngineResult<()> {
        if value < 0.0 {
            Err(EngineError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> EngineResult<()> {
        if value < min || value > max {
            Err(EngineError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate correlation parameter
    pub fn validate_correlation(name: &str, rho: f64) -> EngineResult<()> {
        validate_range(name, rho, -1.0, 1.0)
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> EngineResult<()> {
        if !value.is_finite() {
            Err(EngineError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that two calibration input slices have matching lengths
    pub fn validate_same_length(
        name_a: &str,
        len_a: usize,
        name_b: &str,
        len_b: usize,
    ) -> EngineResult<()> {
        if len_a != len_b {
            Err(EngineError::InvalidConfiguration {
                field: name_b.to_string(),
                reason: format!(
                    "length mismatch: {} has {} entries, {} has {}",
                    name_a, len_a, name_b, len_b
                ),
            })
        } else {
            Ok(())
        }
    }
}

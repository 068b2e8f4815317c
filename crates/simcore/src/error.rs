//! Error types for simulation inputs.

use thiserror::Error;

/// Caller mistakes that would otherwise turn into NaN or nonsense output.
///
/// Battery depletion and voltage collapse are not errors; see [`crate::StepResult`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what} (got {value})")]
    InvalidArgument { what: &'static str, value: f64 },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;

/// Reject values that are not finite and strictly positive.
pub fn require_positive(what: &'static str, value: f64) -> SimResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimError::InvalidArgument { what, value })
    }
}

/// Reject values that are not finite or are negative.
pub fn require_non_negative(what: &'static str, value: f64) -> SimResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimError::InvalidArgument { what, value })
    }
}

/// Reject values outside the closed range `[min, max]`.
pub fn require_in_range(what: &'static str, value: f64, min: f64, max: f64) -> SimResult<f64> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(SimError::InvalidArgument { what, value })
    }
}

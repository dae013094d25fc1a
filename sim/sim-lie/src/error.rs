//! Error types for Lie-group operations.

use thiserror::Error;

/// Errors raised by parameter conversions and frame construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LieError {
    /// The rotation part of a parameter vector is outside the range of the
    /// half-angle parametrization (rotation too close to, or beyond, π).
    #[error(
        "rotation parameter magnitude {magnitude} is outside the half-angle range \
         (rotation increments must stay below pi)"
    )]
    RotationOutOfRange {
        /// Euclidean norm of the rotation parameters.
        magnitude: f64,
    },

    /// A triad could not be turned into an orientation.
    #[error("degenerate triad: {reason}")]
    DegenerateTriad {
        /// Description of the degeneracy.
        reason: String,
    },
}

impl LieError {
    /// Create a degenerate triad error.
    #[must_use]
    pub fn degenerate_triad(reason: impl Into<String>) -> Self {
        Self::DegenerateTriad {
            reason: reason.into(),
        }
    }

    /// Check if this error comes from the rotation parametrization range.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::RotationOutOfRange { .. })
    }
}

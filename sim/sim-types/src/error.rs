//! Error types for simulation operations.

use sim_lie::LieError;
use thiserror::Error;

use crate::{ElementId, NodeId};

/// Errors that can occur while building or solving a model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// An element was given nodes of the wrong number, kind or category.
    #[error("invalid topology for {element}: {reason}")]
    InvalidTopology {
        /// Kind of element being built.
        element: String,
        /// Description of the problem.
        reason: String,
    },

    /// The model topology is frozen after meshing.
    #[error("model is already meshed, cannot {operation}")]
    ModelFrozen {
        /// The rejected operation.
        operation: String,
    },

    /// The model must be initialized before this operation.
    #[error("model is not initialized")]
    NotInitialized,

    /// Unknown node handle.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Unknown element handle.
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),

    /// Factorization of the iteration matrix failed.
    #[error("singular iteration matrix at step {step} (t = {time})")]
    SingularMatrix {
        /// Step index (0 for the initial acceleration solve).
        step: usize,
        /// Simulation time of the failing step.
        time: f64,
    },

    /// Newton iterations exhausted without meeting the tolerances.
    #[error(
        "Newton iterations did not converge at step {step} (t = {time}) after {iterations} \
         iterations: |res forces| = {norm_forces:e}, |res constraints| = {norm_constraints:e}"
    )]
    NotConverged {
        /// Step index.
        step: usize,
        /// Simulation time of the step.
        time: f64,
        /// Number of corrections performed.
        iterations: usize,
        /// Force residual norm at the last assembled iterate.
        norm_forces: f64,
        /// Constraint residual norm at the last assembled iterate.
        norm_constraints: f64,
    },

    /// A rotation increment left the range of the half-angle parametrization.
    #[error("parametrization singularity at step {step} (t = {time}): {source}")]
    Parametrization {
        /// Step index (0 while building or initializing the model).
        step: usize,
        /// Simulation time of the failing step.
        time: f64,
        /// The rejected rotation.
        #[source]
        source: LieError,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl From<LieError> for SimError {
    fn from(source: LieError) -> Self {
        Self::Parametrization {
            step: 0,
            time: 0.0,
            source,
        }
    }
}

impl SimError {
    /// Create an invalid topology error.
    #[must_use]
    pub fn invalid_topology(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTopology {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Create a frozen-model error.
    #[must_use]
    pub fn model_frozen(operation: impl Into<String>) -> Self {
        Self::ModelFrozen {
            operation: operation.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Stamp a parametrization failure with the step and time it occurred
    /// at. Other errors are returned unchanged.
    #[must_use]
    pub fn at_step(self, step: usize, time: f64) -> Self {
        match self {
            Self::Parametrization { source, .. } => Self::Parametrization { step, time, source },
            other => other,
        }
    }

    /// Check if this is a configuration or topology error, raised before
    /// any time step is taken.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::InvalidTopology { .. }
                | Self::ModelFrozen { .. }
                | Self::UnknownNode(_)
                | Self::UnknownElement(_)
        )
    }

    /// Check if this is a numerical failure (singular matrix or
    /// parametrization singularity).
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::SingularMatrix { .. } | Self::Parametrization { .. })
    }

    /// Check if this is a convergence shortfall.
    #[must_use]
    pub fn is_not_converged(&self) -> bool {
        matches!(self, Self::NotConverged { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::Field;

    #[test]
    fn test_error_display() {
        let err = SimError::SingularMatrix { step: 12, time: 0.12 };
        assert!(err.to_string().contains("step 12"));

        let err = SimError::invalid_topology("beam", "expected 2 motion nodes");
        assert!(err.to_string().contains("beam"));
        assert!(err.to_string().contains("2 motion nodes"));

        let err = SimError::UnknownNode(NodeId::new(Field::Motion, 7));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_parametrization_error_names_the_step() {
        let err: SimError = LieError::RotationOutOfRange { magnitude: 2.5 }.into();
        assert!(matches!(err, SimError::Parametrization { step: 0, .. }));

        let err = err.at_step(7, 0.07);
        assert_eq!(
            err,
            SimError::Parametrization {
                step: 7,
                time: 0.07,
                source: LieError::RotationOutOfRange { magnitude: 2.5 },
            }
        );
        assert!(err.to_string().contains("step 7"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_predicates() {
        let err = SimError::invalid_config("h must be positive");
        assert!(err.is_config_error());
        assert!(!err.is_numerical());

        let err: SimError = LieError::RotationOutOfRange { magnitude: 2.0 }.into();
        assert!(err.is_numerical());
        assert!(!err.is_config_error());

        let err = SimError::invalid_config("ρ out of range").at_step(3, 0.03);
        assert!(err.is_config_error());

        let err = SimError::NotConverged {
            step: 3,
            time: 0.03,
            iterations: 10,
            norm_forces: 1.0,
            norm_constraints: 0.0,
        };
        assert!(err.is_not_converged());
        assert!(!err.is_numerical());
    }
}

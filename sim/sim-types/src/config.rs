//! Solver configuration.
//!
//! [`SolverParameters`] drives the Newton loop and the time grid of any
//! solver. [`TimeIntegrationParameters`] adds the spectral radius of the
//! generalized-α scheme.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SimError;

/// What a solver does when Newton iterations run out before convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConvergencePolicy {
    /// Accept the step as it stands and emit a warning.
    #[default]
    AcceptUnconverged,
    /// Stop the run with [`SimError::NotConverged`].
    Abort,
}

/// Newton loop and time grid parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverParameters {
    /// Step size `h`.
    pub h: f64,
    /// Final (pseudo-)time `T`.
    pub final_time: f64,
    /// Maximum number of Newton corrections per step.
    pub nit_max: usize,
    /// Relative tolerance on the force residual.
    pub tol_res_forces: f64,
    /// Relative tolerance on the constraint residual.
    pub tol_res_constraints: f64,
    /// Behavior when `nit_max` is reached.
    pub convergence_policy: ConvergencePolicy,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            h: 1e-2,
            final_time: 1.0,
            nit_max: 10,
            tol_res_forces: 1e-6,
            tol_res_constraints: 1e-6,
            convergence_policy: ConvergencePolicy::AcceptUnconverged,
        }
    }
}

impl SolverParameters {
    /// Set the step size.
    #[must_use]
    pub fn step_size(mut self, h: f64) -> Self {
        self.h = h;
        self
    }

    /// Set the final time.
    #[must_use]
    pub fn final_time(mut self, final_time: f64) -> Self {
        self.final_time = final_time;
        self
    }

    /// Set the Newton iteration cap.
    #[must_use]
    pub fn nit_max(mut self, nit_max: usize) -> Self {
        self.nit_max = nit_max;
        self
    }

    /// Set the force and constraint tolerances.
    #[must_use]
    pub fn tolerances(mut self, forces: f64, constraints: f64) -> Self {
        self.tol_res_forces = forces;
        self.tol_res_constraints = constraints;
        self
    }

    /// Set the convergence policy.
    #[must_use]
    pub fn convergence_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.convergence_policy = policy;
        self
    }

    /// Number of steps on the grid, `floor(T / h)` with a round-off margin
    /// so that e.g. `0.5 / 1e-3` gives 500.
    #[must_use]
    pub fn number_of_steps(&self) -> usize {
        let ratio = self.final_time / self.h;
        (ratio + 1e-9 * ratio.abs().max(1.0)).floor().max(0.0) as usize
    }

    /// Validate the parameters.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.h.is_finite() || self.h <= 0.0 {
            return Err(SimError::invalid_config(format!(
                "step size h = {} must be positive and finite",
                self.h
            )));
        }

        if !self.final_time.is_finite() || self.final_time < 0.0 {
            return Err(SimError::invalid_config(format!(
                "final time T = {} must be finite and non-negative",
                self.final_time
            )));
        }

        if self.nit_max == 0 {
            return Err(SimError::invalid_config("nit_max must be at least 1"));
        }

        let positive = |tol: f64| tol.is_finite() && tol > 0.0;
        if !positive(self.tol_res_forces) || !positive(self.tol_res_constraints) {
            return Err(SimError::invalid_config(
                "residual tolerances must be positive",
            ));
        }

        Ok(())
    }
}

/// Parameters of the generalized-α integrator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeIntegrationParameters {
    /// Newton loop and time grid.
    pub solver: SolverParameters,
    /// Spectral radius at infinite frequency, in `[0, 1]`.
    /// `1` adds no numerical damping, `0` damps the most.
    pub rho: f64,
}

impl Default for TimeIntegrationParameters {
    fn default() -> Self {
        Self {
            solver: SolverParameters::default(),
            rho: 1.0,
        }
    }
}

impl TimeIntegrationParameters {
    /// Set the spectral radius.
    #[must_use]
    pub fn rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Set the step size.
    #[must_use]
    pub fn step_size(mut self, h: f64) -> Self {
        self.solver.h = h;
        self
    }

    /// Set the final time.
    #[must_use]
    pub fn final_time(mut self, final_time: f64) -> Self {
        self.solver.final_time = final_time;
        self
    }

    /// Set the Newton iteration cap.
    #[must_use]
    pub fn nit_max(mut self, nit_max: usize) -> Self {
        self.solver.nit_max = nit_max;
        self
    }

    /// Set the force and constraint tolerances.
    #[must_use]
    pub fn tolerances(mut self, forces: f64, constraints: f64) -> Self {
        self.solver = self.solver.tolerances(forces, constraints);
        self
    }

    /// Set the convergence policy.
    #[must_use]
    pub fn convergence_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.solver.convergence_policy = policy;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> crate::Result<()> {
        self.solver.validate()?;
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(SimError::invalid_config(format!(
                "spectral radius rho = {} must lie in [0, 1]",
                self.rho
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TimeIntegrationParameters::default();
        assert_eq!(params.solver.h, 1e-2);
        assert_eq!(params.solver.final_time, 1.0);
        assert_eq!(params.solver.nit_max, 10);
        assert_eq!(params.solver.tol_res_forces, 1e-6);
        assert_eq!(params.solver.tol_res_constraints, 1e-6);
        assert_eq!(params.rho, 1.0);
        assert_eq!(
            params.solver.convergence_policy,
            ConvergencePolicy::AcceptUnconverged
        );
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_number_of_steps() {
        let params = SolverParameters::default().step_size(1e-3).final_time(0.5);
        assert_eq!(params.number_of_steps(), 500);
        let params = SolverParameters::default().step_size(0.3).final_time(1.0);
        assert_eq!(params.number_of_steps(), 3);
        let params = SolverParameters::default().step_size(0.1).final_time(0.0);
        assert_eq!(params.number_of_steps(), 0);
    }

    #[test]
    fn test_validation() {
        assert!(SolverParameters::default().step_size(0.0).validate().is_err());
        assert!(SolverParameters::default().step_size(f64::NAN).validate().is_err());
        assert!(SolverParameters::default().final_time(-1.0).validate().is_err());
        assert!(SolverParameters::default().nit_max(0).validate().is_err());
        assert!(SolverParameters::default().tolerances(0.0, 1e-6).validate().is_err());
        assert!(TimeIntegrationParameters::default().rho(1.5).validate().is_err());
        assert!(TimeIntegrationParameters::default().rho(0.0).validate().is_ok());
    }
}

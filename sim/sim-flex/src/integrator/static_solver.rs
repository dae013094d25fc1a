//! Static equilibrium by load stepping.
//!
//! Time is a pseudo-time driving time-dependent loads and servos from
//! `t = h` to the final time. Each step starts from the previous
//! equilibrium and iterates on `K x = r` with the stiffness and constraint
//! Jacobian only.

use sim_types::{AnalysisType, Field, Result, SolverParameters};
use tracing::info;

use super::{conclude_step, newton, NoObserver, SolveSummary, StepReport};
use crate::element::AssemblyCoefficients;
use crate::model::Model;
use crate::sensor::StepObserver;

/// Newton solver for static analysis.
#[derive(Debug, Clone)]
pub struct StaticSolver {
    params: SolverParameters,
}

impl StaticSolver {
    /// Create a solver after validating the parameters.
    pub fn new(params: SolverParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Solver parameters.
    #[must_use]
    pub fn parameters(&self) -> &SolverParameters {
        &self.params
    }

    /// Step the loads from `t = 0` to the final time.
    pub fn solve(&self, model: &mut Model) -> Result<SolveSummary> {
        self.solve_observed(model, &mut NoObserver)
    }

    /// Step the loads, reporting the initial state and every accepted step
    /// to `observer`.
    pub fn solve_observed(
        &self,
        model: &mut Model,
        observer: &mut dyn StepObserver,
    ) -> Result<SolveSummary> {
        let params = &self.params;
        let steps = params.number_of_steps();

        model.initialize(AnalysisType::Static)?;
        observer.initialize(model, steps)?;
        info!(steps, h = params.h, "static solve started");
        observer.log_step(model, &StepReport::initial(model))?;

        let coefs = AssemblyCoefficients::static_equilibrium();
        let mut summary = SolveSummary::default();
        for step in 1..=steps {
            model.advance_time_step(params.h);
            model.state_mut().increment.fill(0.0);
            model
                .kinematic_update(&Field::ALL)
                .map_err(|e| e.at_step(step, model.time()))?;

            let outcome = newton(model, &coefs, params, step, |state, correction| {
                state.increment -= correction;
            })?;
            let report = conclude_step(model, params, step, outcome)?;
            summary.record(&report);
            observer.log_step(model, &report)?;
        }

        observer.finalize(model, &summary)?;
        info!(
            steps = summary.steps,
            mean_iterations = summary.mean_iterations(),
            max_iterations = summary.max_iterations,
            unconverged = summary.unconverged_steps,
            "static solve finished"
        );
        Ok(summary)
    }
}

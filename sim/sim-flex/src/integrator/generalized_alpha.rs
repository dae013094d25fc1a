//! Generalized-α time integration.
//!
//! The scheme of Chung and Hulbert, written for the Lie-group setting with
//! velocities `v`, accelerations `v̇` and the auxiliary acceleration `a`:
//!
//! ```text
//! Δ      = h v_n + (0.5 - β) h² a_n + β h² a_{n+1}
//! v_{n+1} = v_n + (1 - γ) h a_n + γ h a_{n+1}
//! (1 - α_m) a_{n+1} + α_m a_n = (1 - α_f) v̇_{n+1} + α_f v̇_n
//! ```
//!
//! The parameters follow from the spectral radius at infinity ρ:
//!
//! | parameter | value |
//! |-----------|-------|
//! | α_f | ρ / (1 + ρ) |
//! | α_m | (2ρ - 1) / (1 + ρ) |
//! | γ | (3 - ρ) / (2 (1 + ρ)) |
//! | β | 1 / (1 + ρ)² |
//!
//! A Newton correction `x` of the unknowns changes the velocity by
//! `γ' x` and the acceleration by `β' x`, with `γ' = γ / (β h)` and
//! `β' = (1 - α_m) / (β h² (1 - α_f))`; those are also the damping and mass
//! weights of the iteration matrix.

use nalgebra::DVector;
use sim_types::{AnalysisType, Field, Result, TimeIntegrationParameters};
use tracing::info;

use super::{conclude_step, newton, solve_correction, NoObserver, SolveSummary, StepReport};
use crate::element::AssemblyCoefficients;
use crate::model::Model;
use crate::sensor::StepObserver;

/// Parameters of the generalized-α scheme for a spectral radius and a step
/// size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaCoefficients {
    /// Weight of the previous acceleration in the force balance.
    pub alpha_f: f64,
    /// Weight of the previous auxiliary acceleration.
    pub alpha_m: f64,
    /// Newmark γ.
    pub gamma: f64,
    /// Newmark β.
    pub beta: f64,
    /// Velocity change per unit correction, `γ / (β h)`.
    pub gamma_prime: f64,
    /// Acceleration change per unit correction.
    pub beta_prime: f64,
}

impl AlphaCoefficients {
    /// Coefficients for spectral radius `rho` and step `h`.
    #[must_use]
    pub fn new(rho: f64, h: f64) -> Self {
        let alpha_f = rho / (1.0 + rho);
        let alpha_m = (2.0 * rho - 1.0) / (rho + 1.0);
        let gamma = 0.5 * (3.0 - rho) / (1.0 + rho);
        let beta = 1.0 / ((1.0 + rho) * (1.0 + rho));
        Self {
            alpha_f,
            alpha_m,
            gamma,
            beta,
            gamma_prime: gamma / (beta * h),
            beta_prime: (1.0 - alpha_m) / (beta * h * h * (1.0 - alpha_f)),
        }
    }

    /// Weights of the iteration matrix.
    #[must_use]
    pub fn assembly(&self) -> AssemblyCoefficients {
        AssemblyCoefficients::new(1.0, self.gamma_prime, self.beta_prime, 1.0)
    }
}

/// Generalized-α solver for dynamic analysis.
#[derive(Debug, Clone)]
pub struct GeneralizedAlpha {
    params: TimeIntegrationParameters,
    coefficients: AlphaCoefficients,
}

impl GeneralizedAlpha {
    /// Create a solver after validating the parameters.
    pub fn new(params: TimeIntegrationParameters) -> Result<Self> {
        params.validate()?;
        let coefficients = AlphaCoefficients::new(params.rho, params.solver.h);
        Ok(Self {
            params,
            coefficients,
        })
    }

    /// Solver parameters.
    #[must_use]
    pub fn parameters(&self) -> &TimeIntegrationParameters {
        &self.params
    }

    /// Scheme coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &AlphaCoefficients {
        &self.coefficients
    }

    /// Integrate the model from `t = 0` to the final time.
    pub fn solve(&self, model: &mut Model) -> Result<SolveSummary> {
        self.solve_observed(model, &mut NoObserver)
    }

    /// Integrate the model, reporting the initial state and every accepted
    /// step to `observer`.
    pub fn solve_observed(
        &self,
        model: &mut Model,
        observer: &mut dyn StepObserver,
    ) -> Result<SolveSummary> {
        let solver = &self.params.solver;
        let c = self.coefficients;
        let h = solver.h;
        let steps = solver.number_of_steps();

        model.initialize(AnalysisType::Dynamic)?;
        observer.initialize(model, steps)?;
        info!(steps, h, rho = self.params.rho, "generalized-alpha solve started");

        let n = model.number_of_kinematic_dofs();
        let m = model.number_of_unknowns() - n;
        let mut a = initial_acceleration(model)?;
        observer.log_step(model, &StepReport::initial(model))?;

        let coefs = c.assembly();
        let mut summary = SolveSummary::default();
        for step in 1..=steps {
            model.advance_time_step(h);
            {
                let state = model.state_mut();
                let mut increment = &state.velocity * h + &a * ((0.5 - c.beta) * h * h);
                state.velocity += &a * (h * (1.0 - c.gamma));
                a = (&state.acceleration * c.alpha_f - &a * c.alpha_m) / (1.0 - c.alpha_m);
                increment += &a * (c.beta * h * h);
                state.velocity += &a * (c.gamma * h);

                state.acceleration.fill(0.0);
                state.increment.rows_mut(0, n).copy_from(&increment);
                state.increment.rows_mut(n, m).fill(0.0);
            }
            model
                .kinematic_update(&Field::ALL)
                .map_err(|e| e.at_step(step, model.time()))?;

            let outcome = newton(model, &coefs, solver, step, |state, correction| {
                state.increment -= correction;
                state.velocity -= correction.rows(0, n) * c.gamma_prime;
                state.acceleration -= correction.rows(0, n) * c.beta_prime;
            })?;
            a += &model.state().acceleration * ((1.0 - c.alpha_f) / (1.0 - c.alpha_m));

            let report = conclude_step(model, solver, step, outcome)?;
            summary.record(&report);
            observer.log_step(model, &report)?;
        }

        observer.finalize(model, &summary)?;
        info!(
            steps = summary.steps,
            mean_iterations = summary.mean_iterations(),
            max_iterations = summary.max_iterations,
            unconverged = summary.unconverged_steps,
            "generalized-alpha solve finished"
        );
        Ok(summary)
    }
}

/// Solve the mass system for consistent initial accelerations and
/// multipliers. Returns the initial auxiliary acceleration.
fn initial_acceleration(model: &mut Model) -> Result<DVector<f64>> {
    let n = model.number_of_kinematic_dofs();
    let m = model.number_of_unknowns() - n;
    model.assemble_res_st(&AssemblyCoefficients::initial_acceleration())?;
    let correction = -solve_correction(model, 0)?;

    let acceleration = correction.rows(0, n).into_owned();
    {
        let state = model.state_mut();
        state.acceleration.copy_from(&acceleration);
        state.increment.fill(0.0);
        state.increment.rows_mut(n, m).copy_from(&correction.rows(n, m));
    }
    model.kinematic_update(&[Field::LagrangeMultiplier])?;
    Ok(acceleration)
}

//! Core types for flexible multibody simulation.
//!
//! This crate provides the pure-data vocabulary shared by the engine and its
//! collaborators:
//!
//! - [`SimError`] - Error taxonomy (topology, numerical, convergence, parametrization)
//! - [`SolverParameters`], [`TimeIntegrationParameters`] - Solver configuration
//! - [`ConvergencePolicy`] - What to do when Newton iterations run out
//! - [`Field`] - Variable category of a node (motion, relative motion, multipliers)
//! - [`NodeId`], [`ElementId`] - Handles returned by the model-construction API
//! - [`AnalysisType`], [`NodalField`] - Analysis mode and sensor selection
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no kinematics and no assembly
//! logic, so model builders, loggers and solvers can share them without
//! depending on the engine.
//!
//! # Example
//!
//! ```
//! use sim_types::{ConvergencePolicy, TimeIntegrationParameters};
//!
//! let params = TimeIntegrationParameters::default()
//!     .step_size(1e-3)
//!     .final_time(0.5)
//!     .rho(0.95)
//!     .tolerances(1e-5, 1e-6)
//!     .convergence_policy(ConvergencePolicy::Abort);
//!
//! assert!(params.validate().is_ok());
//! assert_eq!(params.solver.number_of_steps(), 500);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,  // Builders read better as plain fns
    clippy::cast_precision_loss,   // usize to f64 is fine for counts
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,    // Error docs added where non-obvious
)]

mod config;
mod error;
mod ids;

pub use config::{ConvergencePolicy, SolverParameters, TimeIntegrationParameters};
pub use error::SimError;
pub use ids::{AnalysisType, ElementId, Field, NodalField, NodeId};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

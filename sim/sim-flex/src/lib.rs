//! Flexible multibody dynamics on SE(3).
//!
//! This crate assembles and integrates mechanisms made of geometrically
//! exact beams, rigid bodies and joints:
//!
//! - [`Node`] - Carriers of unknowns (frames, relative frames, multipliers)
//! - [`element`] - Beam, rigid body, external force, clamp, joints, rigid
//!   link and servo elements
//! - [`Model`] - Node/element ownership, DOF numbering, global assembly
//! - [`GeneralizedAlpha`] - Implicit time integration with a Newton corrector
//! - [`StaticSolver`] - Load-stepping static equilibrium
//! - [`StepObserver`], [`Recorder`] - Reporting at step boundaries
//!
//! # Unknowns
//!
//! Motion is described by nodal frames updated through the exponential map
//! of [`sim_lie`]. Constraints are enforced with Lagrange multipliers, so
//! the iteration matrix has the saddle-point form
//!
//! ```text
//! | K + γ' C + β' M   s Bᵀ |
//! | s B               0    |
//! ```
//!
//! # Layer 0 Crate
//!
//! Single-threaded and free of I/O: persistence and plotting belong to the
//! caller, through [`StepObserver`].
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::{Vector3, Vector6};
//! use sim_flex::{
//!     discretize_beam, BeamProperties, ClampedFrameProperties, CrossSection,
//!     ExternalForceProperties, Frame, Model, Node, SolverParameters, StaticSolver,
//! };
//!
//! let mut model = Model::new();
//! let root = model.add_node(Node::frame(Frame::identity()))?;
//! let tip = model.add_node(Node::frame(Frame::from_position(Vector3::new(1.0, 0.0, 0.0))))?;
//!
//! let section = CrossSection::square(0.01, 2.1e11, 0.3, 7800.0);
//! discretize_beam(&mut model, root, tip, 8, BeamProperties::from_cross_section(&section))?;
//! model.add_element(ClampedFrameProperties::default(), &[root])?;
//! model.add_element(
//!     ExternalForceProperties::constant(Vector6::new(0.0, 0.0, -1.0, 0.0, 0.0, 0.0)),
//!     &[tip],
//! )?;
//!
//! let solver = StaticSolver::new(SolverParameters::default().step_size(1.0).final_time(1.0))?;
//! let summary = solver.solve(&mut model)?;
//!
//! assert_eq!(summary.unconverged_steps, 0);
//! assert!(model.frame(tip)?.position.z < 0.0);
//! # Ok::<(), sim_flex::SimError>(())
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::many_single_char_names,   // h, m, n, c follow the usual notation
    clippy::suboptimal_flops,         // mul_add rewrites obscure the formulas
    clippy::missing_errors_doc,       // Errors are documented on SimError
    clippy::cast_precision_loss,      // Step counts fit in f64
    clippy::similar_names,            // frame_a/frame_b, v/v_dot pairs
    clippy::module_name_repetitions,  // BeamElement in element::beam
)]

// Nodes and their configuration buffers
pub mod node;

// Element library
pub mod element;

// Model, DOF numbering and global assembly
pub mod model;

// Sparse scatter-add
pub mod assembly;

// Dense LU of the iteration matrix
mod linalg;

// Gauss-Legendre rules
pub mod quadrature;

// Generalized-alpha and static solvers
pub mod integrator;

// Step observers and sensors
pub mod sensor;

pub use element::{
    discretize_beam, AssemblyCoefficients, BeamElement, BeamProperties, ClampedFrameElement,
    ClampedFrameProperties, Connectivity, ConstraintBlock, ConstraintElement, CrossSection,
    DistributedLoadFunction, Element, ElementKind, ElementProperties, ExternalForceElement,
    ExternalForceProperties, ForceElement, GroundJointElement, JointProperties,
    KinematicJointElement, LoadFunction, LocalTangents, ResidualNorms, RigidBodyElement,
    RigidBodyProperties, RigidLinkElement, RigidLinkProperties, SectionResultants,
    ServoConstraintElement, ServoConstraintProperties, TimeFunction,
};
pub use integrator::{AlphaCoefficients, GeneralizedAlpha, SolveSummary, StaticSolver, StepReport};
pub use model::{Model, SolutionState};
pub use node::{ConfigurationPair, FrameState, Node, NodeKind, NodeStore};
pub use quadrature::{GaussPoint, GaussRule};
pub use sensor::{Recorder, SensorNode, StepObserver, StepRecord};

// Re-export the vocabulary of the lower layers for convenience
pub use sim_lie::{Frame, UnitQuat};
pub use sim_types::{
    AnalysisType, ConvergencePolicy, ElementId, Field, NodalField, NodeId, Result, SimError,
    SolverParameters, TimeIntegrationParameters,
};

//! Lie-group kinematics for flexible multibody simulation.
//!
//! This crate provides the rotation and rigid-motion algebra used by the
//! flexible multibody engine:
//!
//! - [`tilde`], [`tilde6`], [`breve6`] - Skew-symmetric operators on R³ and R⁶
//! - [`UnitQuat`] - Unit quaternion stored as a scalar part and a vector part
//! - [`Frame`] - Rigid transformation (position + orientation)
//! - [`tangent_operator`], [`inverse_tangent_operator`] - Linearizations of the
//!   exponential map used to relate parameter increments to frame increments
//!
//! # Parametrization
//!
//! Incremental motions are described by a 6-vector `p = [p_u; p_w]`
//! (translation part first, rotation part second). The rotation part is the
//! half-angle parametrization `p_w = 2 e`, where `e` is the vector part of the
//! quaternion, so that
//!
//! ```text
//! e0 = sqrt(1 - |p_w|² / 4),   e = p_w / 2
//! ```
//!
//! The quaternion built this way has unit norm by construction. The map is
//! singular when the rotation approaches π; conversions reject rotation
//! parameters with `e0` below [`MIN_HALF_ANGLE_COSINE`] with
//! [`LieError::RotationOutOfRange`].
//!
//! # Layer 0
//!
//! This crate depends on `nalgebra` only and knows nothing about nodes,
//! elements or solvers.
//!
//! # Example
//!
//! ```
//! use sim_lie::{Frame, UnitQuat};
//! use nalgebra::{Vector3, Vector6};
//!
//! let frame = Frame::new(
//!     Vector3::new(1.0, 0.0, 0.0),
//!     UnitQuat::from_parameters(&Vector3::new(0.0, 0.0, 0.5)).unwrap(),
//! );
//!
//! // Composition with the inverse gives the identity.
//! let identity = frame * frame.inverse();
//! assert!(identity.position.norm() < 1e-12);
//!
//! // Parameters round-trip.
//! let p: Vector6<f64> = frame.parameters();
//! let back = Frame::from_parameters(&p).unwrap();
//! assert!((back.position - frame.position).norm() < 1e-12);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::many_single_char_names, // e, q, x, p follow the usual notation
    clippy::suboptimal_flops,       // mul_add rewrites obscure the formulas
    clippy::missing_errors_doc,     // Errors are documented on LieError
    clippy::similar_names,          // pu/pw, fu/fw pairs
)]

mod error;
mod frame;
mod quaternion;
mod skew;
mod tangent;

pub use error::LieError;
pub use frame::Frame;
pub use quaternion::{half_angle_cosine, UnitQuat, MIN_HALF_ANGLE_COSINE};
pub use skew::{breve6, tilde, tilde6, tilde_x_tilde};
pub use tangent::{
    derivative_inverse_transposed_tangent_operator, inverse_tangent_operator, tangent_operator,
};

/// Result type for Lie-group operations.
pub type Result<T> = std::result::Result<T, LieError>;

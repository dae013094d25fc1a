//! Integration tests for the sim-flex solver stack.
//!
//! These tests run complete models through the public API:
//! - Static cantilever against Euler-Bernoulli/Timoshenko deflection
//! - Dynamics of a clamped beam at rest
//! - Pendulums built from rigid bodies, rigid links and joints
//! - Servo-driven hinge
//! - Newton convergence policies and failure modes

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

pub mod beam_statics;
pub mod failures;
pub mod fixtures;
pub mod newton_policy;
pub mod pendulum;
pub mod servo_hinge;

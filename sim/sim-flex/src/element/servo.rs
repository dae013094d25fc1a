//! Imposed motion on one DOF of a joint.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, Vector6};
use sim_lie::Frame;
use sim_types::{ElementId, Result, SimError};

use super::{AssemblyContext, Connectivity, ConstraintBlock, TimeFunction};
use crate::node::NodeStore;

/// Properties of a [`ServoConstraintElement`].
#[derive(Clone)]
pub struct ServoConstraintProperties {
    joint: ElementId,
    imposed: TimeFunction,
    dof: usize,
    constraint_scaling: f64,
}

impl fmt::Debug for ServoConstraintProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServoConstraintProperties")
            .field("joint", &self.joint)
            .field("dof", &self.dof)
            .field("constraint_scaling", &self.constraint_scaling)
            .finish_non_exhaustive()
    }
}

impl ServoConstraintProperties {
    /// Drive the first free DOF of `joint` with `imposed(t)`.
    #[must_use]
    pub fn new(joint: ElementId, imposed: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            joint,
            imposed: Arc::new(imposed),
            dof: 0,
            constraint_scaling: 1.0,
        }
    }

    /// Drive column `dof` of the joint projection instead.
    #[must_use]
    pub fn with_dof(mut self, dof: usize) -> Self {
        self.dof = dof;
        self
    }

    /// Set the constraint scaling `s`.
    #[must_use]
    pub fn with_constraint_scaling(mut self, scaling: f64) -> Self {
        self.constraint_scaling = scaling;
        self
    }

    /// Driven joint.
    #[must_use]
    pub fn joint(&self) -> ElementId {
        self.joint
    }

    /// Driven column of the joint projection.
    #[must_use]
    pub fn dof(&self) -> usize {
        self.dof
    }
}

/// One constraint `g = a_kᵀ p(H_imp⁻¹ H_I)` on the relative frame `H_I` of
/// a joint, where `a_k` is the driven column of the projection.
///
/// The imposed frame `H_imp` starts at the initial relative frame and is
/// advanced once per time step by `H(a_k (f(t) - f(t_prev)))`, so the
/// imposed motion accumulates as increments.
#[derive(Debug, Clone)]
pub struct ServoConstraintElement {
    props: ServoConstraintProperties,
    axis: Vector6<f64>,
    imposed_frame: Frame,
    previous_time: f64,
}

impl ServoConstraintElement {
    pub(crate) fn new(props: ServoConstraintProperties) -> Self {
        Self {
            props,
            axis: Vector6::zeros(),
            imposed_frame: Frame::identity(),
            previous_time: 0.0,
        }
    }

    /// Properties of the servo.
    #[must_use]
    pub fn properties(&self) -> &ServoConstraintProperties {
        &self.props
    }

    /// Imposed relative frame of the current step.
    #[must_use]
    pub fn imposed_frame(&self) -> &Frame {
        &self.imposed_frame
    }

    pub(crate) fn joint(&self) -> ElementId {
        self.props.joint
    }

    pub(crate) fn constraint_scaling(&self) -> f64 {
        self.props.constraint_scaling
    }

    pub(crate) fn check_dof(&self, available: usize) -> Result<()> {
        if self.props.dof >= available {
            return Err(SimError::invalid_topology(
                "servo constraint",
                format!(
                    "driven DOF {} out of range, {} has {available} free DOF(s)",
                    self.props.dof, self.props.joint
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn initialize(
        &mut self,
        nodes: &NodeStore,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
        time: f64,
    ) -> Result<()> {
        let node = nodes.get(conn.relative(0))?;
        let projection = node.projection().ok_or_else(|| {
            SimError::invalid_topology("servo constraint", "driven node has no projection")
        })?;
        self.axis = projection.column(self.props.dof).into_owned();
        block.bt = DMatrix::from_fn(1, projection.ncols(), |_, c| {
            self.axis.dot(&projection.column(c))
        });

        self.imposed_frame = *nodes.frame_state(conn.relative(0))?.frame_0();
        self.previous_time = time;
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
    ) -> Result<()> {
        if ctx.time > self.previous_time {
            let imposed = self.props.imposed.as_ref();
            let increment = imposed(ctx.time) - imposed(self.previous_time);
            self.imposed_frame =
                self.imposed_frame * Frame::from_parameters(&(self.axis * increment))?;
            self.previous_time = ctx.time;
        }
        let frame_i = *ctx.frame(conn.relative(0))?;
        let relative = (self.imposed_frame.inverse() * frame_i).parameters();
        block.value[0] = self.axis.dot(&relative);
        Ok(())
    }
}

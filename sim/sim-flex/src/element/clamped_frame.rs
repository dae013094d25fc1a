//! Clamp of a frame node at its reference frame.

use nalgebra::DMatrix;
use sim_lie::Frame;
use sim_types::Result;

use super::{
    relative_frame_stiffness, AssemblyContext, Connectivity, ConstraintBlock, LocalTangents,
};
use crate::node::NodeStore;

/// Properties of a [`ClampedFrameElement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedFrameProperties {
    /// Constraint scaling `s`.
    pub constraint_scaling: f64,
}

impl Default for ClampedFrameProperties {
    fn default() -> Self {
        Self {
            constraint_scaling: 1.0,
        }
    }
}

/// Six constraints `g = p(H_ref⁻¹ H_A)` holding a node at its reference
/// frame.
#[derive(Debug, Clone)]
pub struct ClampedFrameElement {
    props: ClampedFrameProperties,
    inverse_frame_ref: Frame,
}

impl ClampedFrameElement {
    pub(crate) fn new(props: ClampedFrameProperties) -> Self {
        Self {
            props,
            inverse_frame_ref: Frame::identity(),
        }
    }

    pub(crate) fn constraint_scaling(&self) -> f64 {
        self.props.constraint_scaling
    }

    pub(crate) fn initialize(
        &mut self,
        nodes: &NodeStore,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
    ) -> Result<()> {
        self.inverse_frame_ref = nodes.frame_state(conn.motion(0))?.frame_ref().inverse();
        block.bt = DMatrix::identity(6, 6);
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        let frame = ctx.frame(conn.motion(0))?;
        block.set_value(&(self.inverse_frame_ref * *frame).parameters());
        tangents.stiffness = Some(relative_frame_stiffness(&block.bt, &block.multipliers));
        Ok(())
    }
}

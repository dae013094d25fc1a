//! Rigid connection between two frame nodes.

use nalgebra::DMatrix;
use sim_lie::Frame;
use sim_types::Result;

use super::{to_dynamic, AssemblyContext, Connectivity, ConstraintBlock};
use crate::node::NodeStore;

/// Properties of a [`RigidLinkElement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidLinkProperties {
    /// Constraint scaling `s`.
    pub constraint_scaling: f64,
}

impl Default for RigidLinkProperties {
    fn default() -> Self {
        Self {
            constraint_scaling: 1.0,
        }
    }
}

/// Six constraints `g = p(H_B⁻¹ H_A H_AB)` freezing the relative frame
/// `H_AB` of two nodes at its initial value, with `B = [Ad(H_AB⁻¹), -I]`.
#[derive(Debug, Clone)]
pub struct RigidLinkElement {
    props: RigidLinkProperties,
    relative_frame: Frame,
}

impl RigidLinkElement {
    pub(crate) fn new(props: RigidLinkProperties) -> Self {
        Self {
            props,
            relative_frame: Frame::identity(),
        }
    }

    pub(crate) fn constraint_scaling(&self) -> f64 {
        self.props.constraint_scaling
    }

    /// Frame of node B relative to node A held by the link.
    #[must_use]
    pub fn relative_frame(&self) -> &Frame {
        &self.relative_frame
    }

    pub(crate) fn initialize(
        &mut self,
        nodes: &NodeStore,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
    ) -> Result<()> {
        let frame_a = *nodes.frame_state(conn.motion(0))?.frame_0();
        let frame_b = *nodes.frame_state(conn.motion(1))?.frame_0();
        self.relative_frame = frame_a.inverse() * frame_b;

        let mut bt = DMatrix::zeros(6, 12);
        bt.view_mut((0, 0), (6, 6))
            .copy_from(&to_dynamic(&self.relative_frame.inverse_adjoint()));
        bt.view_mut((0, 6), (6, 6))
            .copy_from(&(-DMatrix::<f64>::identity(6, 6)));
        block.bt = bt;
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
    ) -> Result<()> {
        let frame_a = *ctx.frame(conn.motion(0))?;
        let frame_b = *ctx.frame(conn.motion(1))?;
        block.set_value(&(frame_b.inverse() * frame_a * self.relative_frame).parameters());
        Ok(())
    }
}

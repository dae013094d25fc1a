//! Element library.
//!
//! An element couples an ordered list of nodes to a physical or constraint
//! law and produces a local residual and a local iteration matrix.
//!
//! # Kinds
//!
//! Elements come in two families:
//!
//! - [`ForceElement`] - beams, rigid bodies and external forces. The residual
//!   is a force vector; the element may provide stiffness, damping and mass
//!   tangents.
//! - [`ConstraintElement`] - clamps, joints, rigid links and servos. Each owns
//!   a Lagrange multiplier node (created at mesh time) and a
//!   [`ConstraintBlock`] with the constraint values `g` and their Jacobian
//!   `B`. The residual is `[Bᵀλ; s g]` where `s` is the constraint scaling.
//!
//! # Iteration matrix
//!
//! The local iteration matrix combines the tangents with the coefficients
//! of the solver:
//!
//! ```text
//! S = | k K + c C + m M   b s Bᵀ |
//!     | b s B             0       |
//! ```
//!
//! A tangent an element does not provide contributes nothing.

mod beam;
mod clamped_frame;
mod external_force;
mod joint;
mod rigid_body;
mod rigid_link;
mod servo;

use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Matrix6, SMatrix, SVector, Vector6};
use sim_lie::{breve6, Frame};
use sim_types::{AnalysisType, ElementId, Field, NodeId, Result, SimError};

use crate::node::{ConfigurationPair, NodeKind, NodeStore};
use crate::Node;

pub use beam::{discretize_beam, BeamElement, BeamProperties, CrossSection, SectionResultants};
pub use clamped_frame::{ClampedFrameElement, ClampedFrameProperties};
pub use external_force::{ExternalForceElement, ExternalForceProperties};
pub use joint::{GroundJointElement, JointProperties, KinematicJointElement};
pub use rigid_body::{RigidBodyElement, RigidBodyProperties};
pub use rigid_link::{RigidLinkElement, RigidLinkProperties};
pub use servo::{ServoConstraintElement, ServoConstraintProperties};

/// Load as a function of time.
pub type LoadFunction = Arc<dyn Fn(f64) -> Vector6<f64> + Send + Sync>;

/// Distributed load as a function of the reduced abscissa `s ∈ [0, 1]` and
/// time.
pub type DistributedLoadFunction = Arc<dyn Fn(f64, f64) -> Vector6<f64> + Send + Sync>;

/// Scalar function of time.
pub type TimeFunction = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

// ============================================================================
// Assembly vocabulary
// ============================================================================

/// Weights of the tangents in the iteration matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AssemblyCoefficients {
    /// Stiffness weight.
    pub k: f64,
    /// Damping weight.
    pub c: f64,
    /// Mass weight.
    pub m: f64,
    /// Constraint Jacobian weight.
    pub b: f64,
}

impl AssemblyCoefficients {
    /// Create a set of coefficients.
    #[must_use]
    pub const fn new(k: f64, c: f64, m: f64, b: f64) -> Self {
        Self { k, c, m, b }
    }

    /// Pure mass system used for the initial acceleration.
    #[must_use]
    pub const fn initial_acceleration() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Stiffness system used for static equilibrium.
    #[must_use]
    pub const fn static_equilibrium() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }
}

/// Residual norms used as convergence references.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResidualNorms {
    /// Norm of the force part.
    pub forces: f64,
    /// Norm of the (unscaled) constraint part.
    pub constraints: f64,
}

impl AddAssign for ResidualNorms {
    fn add_assign(&mut self, rhs: Self) {
        self.forces += rhs.forces;
        self.constraints += rhs.constraints;
    }
}

/// Read-only view of the model state during an assembly pass.
pub(crate) struct AssemblyContext<'a> {
    pub nodes: &'a NodeStore,
    pub pair: ConfigurationPair,
    pub time: f64,
    pub analysis: AnalysisType,
    pub velocity: &'a DVector<f64>,
    pub acceleration: &'a DVector<f64>,
}

impl AssemblyContext<'_> {
    /// Current frame of a frame-like node.
    pub fn frame(&self, id: NodeId) -> Result<&Frame> {
        self.nodes.frame(id, self.pair.current())
    }
}

/// Gather the entries of `source` at the first `N` local DOFs.
pub(crate) fn gather<const N: usize>(source: &DVector<f64>, loc_dof: &[usize]) -> SVector<f64, N> {
    SVector::from_fn(|i, _| source[loc_dof[i]])
}

pub(crate) fn to_dynamic<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> DMatrix<f64> {
    DMatrix::from_column_slice(R, C, m.as_slice())
}

/// Optional tangents of the last assembly pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalTangents {
    /// Stiffness tangent `K`.
    pub stiffness: Option<DMatrix<f64>>,
    /// Damping (gyroscopic) tangent `C`.
    pub damping: Option<DMatrix<f64>>,
    /// Mass tangent `M`.
    pub mass: Option<DMatrix<f64>>,
}

impl LocalTangents {
    fn clear(&mut self) {
        self.stiffness = None;
        self.damping = None;
        self.mass = None;
    }
}

/// Nodes of an element, per category, in local order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connectivity {
    lists: [Vec<NodeId>; Field::COUNT],
}

impl Connectivity {
    fn push(&mut self, id: NodeId) {
        self.lists[id.field().index()].push(id);
    }

    /// Nodes of one category.
    #[must_use]
    pub fn nodes(&self, field: Field) -> &[NodeId] {
        &self.lists[field.index()]
    }

    /// All nodes, motion first, multipliers last.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.lists.iter().flatten().copied()
    }

    pub(crate) fn motion(&self, i: usize) -> NodeId {
        self.lists[Field::Motion.index()][i]
    }

    pub(crate) fn relative(&self, i: usize) -> NodeId {
        self.lists[Field::RelativeMotion.index()][i]
    }

    pub(crate) fn multipliers(&self) -> Option<NodeId> {
        self.lists[Field::LagrangeMultiplier.index()].first().copied()
    }
}

/// Constraint values, Jacobian and multipliers of a constraint element.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBlock {
    scaling: f64,
    bt: DMatrix<f64>,
    value: DVector<f64>,
    multipliers: DVector<f64>,
}

impl ConstraintBlock {
    fn new(size: usize, scaling: f64) -> Self {
        Self {
            scaling,
            bt: DMatrix::zeros(size, 0),
            value: DVector::zeros(size),
            multipliers: DVector::zeros(size),
        }
    }

    fn allocate(&mut self, number_of_dofs: usize) {
        self.bt = DMatrix::zeros(self.size(), number_of_dofs);
    }

    /// Number of constraints.
    #[must_use]
    pub fn size(&self) -> usize {
        self.value.len()
    }

    /// Constraint scaling `s`.
    #[must_use]
    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// Constraint Jacobian `B` (constraints × DOFs).
    #[must_use]
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.bt
    }

    /// Constraint values `g` of the last assembly.
    #[must_use]
    pub fn value(&self) -> &DVector<f64> {
        &self.value
    }

    /// Multipliers used by the last assembly.
    #[must_use]
    pub fn multipliers(&self) -> &DVector<f64> {
        &self.multipliers
    }

    pub(crate) fn set_value(&mut self, value: &Vector6<f64>) {
        self.value.copy_from(value);
    }
}

/// Stiffness `Bᵀ breve6(λ/2) B` of a constraint on the parameters of a
/// relative frame.
pub(crate) fn relative_frame_stiffness(
    bt: &DMatrix<f64>,
    multipliers: &DVector<f64>,
) -> DMatrix<f64> {
    let half = Vector6::from_iterator(multipliers.iter().map(|l| 0.5 * l));
    let b6: Matrix6<f64> = breve6(&half);
    bt.transpose() * to_dynamic(&b6) * bt
}

// ============================================================================
// Properties
// ============================================================================

/// Properties selecting the kind of element to build.
#[derive(Clone)]
pub enum ElementProperties {
    /// Geometrically exact beam between two frame nodes.
    Beam(Arc<BeamProperties>),
    /// Rigid body on one frame node.
    RigidBody(RigidBodyProperties),
    /// External load on one frame node.
    ExternalForce(ExternalForceProperties),
    /// Clamp of one frame node at its reference frame.
    ClampedFrame(ClampedFrameProperties),
    /// Joint between one frame node and the ground.
    GroundJoint(JointProperties),
    /// Joint between two frame nodes.
    KinematicJoint(JointProperties),
    /// Rigid connection between two frame nodes.
    RigidLink(RigidLinkProperties),
    /// Imposed motion on a joint DOF.
    ServoConstraint(ServoConstraintProperties),
}

impl fmt::Debug for ElementProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beam(p) => f.debug_tuple("Beam").field(p).finish(),
            Self::RigidBody(p) => f.debug_tuple("RigidBody").field(p).finish(),
            Self::ExternalForce(p) => f.debug_tuple("ExternalForce").field(p).finish(),
            Self::ClampedFrame(p) => f.debug_tuple("ClampedFrame").field(p).finish(),
            Self::GroundJoint(p) => f.debug_tuple("GroundJoint").field(p).finish(),
            Self::KinematicJoint(p) => f.debug_tuple("KinematicJoint").field(p).finish(),
            Self::RigidLink(p) => f.debug_tuple("RigidLink").field(p).finish(),
            Self::ServoConstraint(p) => f.debug_tuple("ServoConstraint").field(p).finish(),
        }
    }
}

impl From<BeamProperties> for ElementProperties {
    fn from(props: BeamProperties) -> Self {
        Self::Beam(Arc::new(props))
    }
}

impl From<RigidBodyProperties> for ElementProperties {
    fn from(props: RigidBodyProperties) -> Self {
        Self::RigidBody(props)
    }
}

impl From<ExternalForceProperties> for ElementProperties {
    fn from(props: ExternalForceProperties) -> Self {
        Self::ExternalForce(props)
    }
}

impl From<ClampedFrameProperties> for ElementProperties {
    fn from(props: ClampedFrameProperties) -> Self {
        Self::ClampedFrame(props)
    }
}

impl From<RigidLinkProperties> for ElementProperties {
    fn from(props: RigidLinkProperties) -> Self {
        Self::RigidLink(props)
    }
}

impl From<ServoConstraintProperties> for ElementProperties {
    fn from(props: ServoConstraintProperties) -> Self {
        Self::ServoConstraint(props)
    }
}

// ============================================================================
// Element kinds
// ============================================================================

/// Elements whose residual is a force vector.
#[derive(Debug, Clone)]
pub enum ForceElement {
    /// Geometrically exact beam.
    Beam(BeamElement),
    /// Rigid body.
    RigidBody(RigidBodyElement),
    /// External load.
    ExternalForce(ExternalForceElement),
}

impl ForceElement {
    fn label(&self) -> &'static str {
        match self {
            Self::Beam(_) => "beam",
            Self::RigidBody(_) => "rigid body",
            Self::ExternalForce(_) => "external force",
        }
    }

    fn number_of_frame_nodes(&self) -> usize {
        match self {
            Self::Beam(_) => 2,
            Self::RigidBody(_) | Self::ExternalForce(_) => 1,
        }
    }

    fn initialize(&mut self, nodes: &NodeStore, conn: &Connectivity) -> Result<()> {
        match self {
            Self::Beam(e) => e.initialize(nodes, conn),
            Self::RigidBody(_) | Self::ExternalForce(_) => Ok(()),
        }
    }

    fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        loc_dof: &[usize],
        res: &mut DVector<f64>,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        match self {
            Self::Beam(e) => e.assemble(ctx, conn, loc_dof, res, tangents),
            Self::RigidBody(e) => e.assemble(ctx, loc_dof, res, tangents),
            Self::ExternalForce(e) => e.assemble(ctx, conn, res, tangents),
        }
    }
}

/// Elements enforcing algebraic constraints through Lagrange multipliers.
#[derive(Debug, Clone)]
pub enum ConstraintElement {
    /// Clamp at the reference frame.
    ClampedFrame(ClampedFrameElement),
    /// Joint to the ground.
    GroundJoint(GroundJointElement),
    /// Joint between two nodes.
    KinematicJoint(KinematicJointElement),
    /// Rigid connection.
    RigidLink(RigidLinkElement),
    /// Imposed joint motion.
    ServoConstraint(ServoConstraintElement),
}

impl ConstraintElement {
    fn label(&self) -> &'static str {
        match self {
            Self::ClampedFrame(_) => "clamped frame",
            Self::GroundJoint(_) => "ground joint",
            Self::KinematicJoint(_) => "kinematic joint",
            Self::RigidLink(_) => "rigid link",
            Self::ServoConstraint(_) => "servo constraint",
        }
    }

    fn number_of_frame_nodes(&self) -> usize {
        match self {
            Self::ClampedFrame(_) | Self::GroundJoint(_) => 1,
            Self::KinematicJoint(_) | Self::RigidLink(_) => 2,
            Self::ServoConstraint(_) => 0,
        }
    }

    fn number_of_constraints(&self) -> usize {
        match self {
            Self::ServoConstraint(_) => 1,
            _ => 6,
        }
    }

    fn scaling(&self) -> f64 {
        match self {
            Self::ClampedFrame(e) => e.constraint_scaling(),
            Self::GroundJoint(e) => e.constraint_scaling(),
            Self::KinematicJoint(e) => e.constraint_scaling(),
            Self::RigidLink(e) => e.constraint_scaling(),
            Self::ServoConstraint(e) => e.constraint_scaling(),
        }
    }

    /// Relative frame node created by this element at mesh time.
    fn relative_node(&self) -> Option<Node> {
        match self {
            Self::GroundJoint(e) => Some(Node::relative_frame(e.projection().clone())),
            Self::KinematicJoint(e) => Some(Node::relative_frame(e.projection().clone())),
            _ => None,
        }
    }

    fn initialize(
        &mut self,
        nodes: &mut NodeStore,
        conn: &Connectivity,
        loc_dof: &[usize],
        block: &mut ConstraintBlock,
        velocity: Option<&mut DVector<f64>>,
        time: f64,
    ) -> Result<()> {
        match self {
            Self::ClampedFrame(e) => e.initialize(nodes, conn, block),
            Self::GroundJoint(e) => e.initialize(nodes, conn, loc_dof, block, velocity),
            Self::KinematicJoint(e) => e.initialize(nodes, conn, loc_dof, block, velocity),
            Self::RigidLink(e) => e.initialize(nodes, conn, block),
            Self::ServoConstraint(e) => e.initialize(nodes, conn, block, time),
        }
    }

    fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        match self {
            Self::ClampedFrame(e) => e.assemble(ctx, conn, block, tangents),
            Self::GroundJoint(e) => e.assemble(ctx, conn, block, tangents),
            Self::KinematicJoint(e) => e.assemble(ctx, conn, block, tangents),
            Self::RigidLink(e) => e.assemble(ctx, conn, block),
            Self::ServoConstraint(e) => e.assemble(ctx, conn, block),
        }
    }
}

/// Law of an element together with the state it needs.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// Force law.
    Force(ForceElement),
    /// Constraint law and its constraint block.
    Constraint(ConstraintElement, ConstraintBlock),
}

// ============================================================================
// Element
// ============================================================================

/// An element of the model with its local buffers.
#[derive(Debug, Clone)]
pub struct Element {
    kind: ElementKind,
    connectivity: Connectivity,
    number_of_dofs: usize,
    loc_dof: Vec<usize>,
    res: DVector<f64>,
    st: DMatrix<f64>,
    tangents: LocalTangents,
}

impl Element {
    /// Build an element on `nodes` (motion frame nodes, in local order).
    pub(crate) fn new(
        props: ElementProperties,
        nodes: &[NodeId],
        store: &NodeStore,
    ) -> Result<Self> {
        let kind = match props {
            ElementProperties::Beam(p) => {
                p.validate()?;
                ElementKind::Force(ForceElement::Beam(BeamElement::new(p)))
            }
            ElementProperties::RigidBody(p) => {
                p.validate()?;
                ElementKind::Force(ForceElement::RigidBody(RigidBodyElement::new(p)))
            }
            ElementProperties::ExternalForce(p) => {
                ElementKind::Force(ForceElement::ExternalForce(ExternalForceElement::new(p)))
            }
            ElementProperties::ClampedFrame(p) => {
                Self::constrained(ConstraintElement::ClampedFrame(ClampedFrameElement::new(p)))
            }
            ElementProperties::GroundJoint(p) => {
                p.validate()?;
                Self::constrained(ConstraintElement::GroundJoint(GroundJointElement::new(p)))
            }
            ElementProperties::KinematicJoint(p) => {
                p.validate()?;
                Self::constrained(ConstraintElement::KinematicJoint(KinematicJointElement::new(p)))
            }
            ElementProperties::RigidLink(p) => {
                Self::constrained(ConstraintElement::RigidLink(RigidLinkElement::new(p)))
            }
            ElementProperties::ServoConstraint(p) => Self::constrained(
                ConstraintElement::ServoConstraint(ServoConstraintElement::new(p)),
            ),
        };

        let (label, expected) = match &kind {
            ElementKind::Force(e) => (e.label(), e.number_of_frame_nodes()),
            ElementKind::Constraint(e, _) => (e.label(), e.number_of_frame_nodes()),
        };
        if nodes.len() != expected {
            return Err(SimError::invalid_topology(
                label,
                format!("expected {expected} motion frame node(s), got {}", nodes.len()),
            ));
        }
        let mut connectivity = Connectivity::default();
        for &id in nodes {
            if !matches!(store.get(id)?.kind(), NodeKind::Frame(_)) {
                return Err(SimError::invalid_topology(
                    label,
                    format!("{id} is not a motion frame node"),
                ));
            }
            if connectivity.nodes(Field::Motion).contains(&id) {
                return Err(SimError::invalid_topology(
                    label,
                    format!("{id} appears more than once"),
                ));
            }
            connectivity.push(id);
        }

        Ok(Self {
            kind,
            connectivity,
            number_of_dofs: 0,
            loc_dof: Vec::new(),
            res: DVector::zeros(0),
            st: DMatrix::zeros(0, 0),
            tangents: LocalTangents::default(),
        })
    }

    fn constrained(element: ConstraintElement) -> ElementKind {
        let block = ConstraintBlock::new(element.number_of_constraints(), element.scaling());
        ElementKind::Constraint(element, block)
    }

    /// Short name of the element kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match &self.kind {
            ElementKind::Force(e) => e.label(),
            ElementKind::Constraint(e, _) => e.label(),
        }
    }

    /// Law and state of the element.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Nodes of the element.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Number of motion and relative-motion DOFs.
    #[must_use]
    pub fn number_of_dofs(&self) -> usize {
        self.number_of_dofs
    }

    /// Number of constraints (zero for force elements).
    #[must_use]
    pub fn number_of_constraints(&self) -> usize {
        match &self.kind {
            ElementKind::Force(_) => 0,
            ElementKind::Constraint(_, block) => block.size(),
        }
    }

    /// Global indices of the local unknowns.
    #[must_use]
    pub fn loc_dof(&self) -> &[usize] {
        &self.loc_dof
    }

    /// Local residual of the last assembly.
    #[must_use]
    pub fn residual(&self) -> &DVector<f64> {
        &self.res
    }

    /// Local iteration matrix of the last assembly.
    #[must_use]
    pub fn iteration_matrix(&self) -> &DMatrix<f64> {
        &self.st
    }

    /// Tangents of the last assembly.
    #[must_use]
    pub fn tangents(&self) -> &LocalTangents {
        &self.tangents
    }

    /// Constraint block, for constraint elements.
    #[must_use]
    pub fn constraint(&self) -> Option<&ConstraintBlock> {
        match &self.kind {
            ElementKind::Force(_) => None,
            ElementKind::Constraint(_, block) => Some(block),
        }
    }

    /// Relative frame node of a joint element, once meshed.
    #[must_use]
    pub fn relative_node(&self) -> Option<NodeId> {
        match &self.kind {
            ElementKind::Constraint(
                ConstraintElement::GroundJoint(_) | ConstraintElement::KinematicJoint(_),
                _,
            ) => self.connectivity.nodes(Field::RelativeMotion).first().copied(),
            _ => None,
        }
    }

    /// Joint driven by a servo element.
    #[must_use]
    pub fn servo_target(&self) -> Option<ElementId> {
        match &self.kind {
            ElementKind::Constraint(ConstraintElement::ServoConstraint(e), _) => Some(e.joint()),
            _ => None,
        }
    }

    /// Register auxiliary nodes: the relative frame of joints, the driven
    /// relative frame of servos and the multipliers of constraints.
    pub(crate) fn mesh(&mut self, nodes: &mut NodeStore, driven: Option<NodeId>) -> Result<()> {
        let ElementKind::Constraint(element, block) = &mut self.kind else {
            return Ok(());
        };

        if let Some(node) = element.relative_node() {
            let id = nodes.push(node);
            self.connectivity.push(id);
        }

        if let ConstraintElement::ServoConstraint(servo) = element {
            let id = driven.ok_or_else(|| {
                SimError::invalid_topology(
                    "servo constraint",
                    format!("{} is not a joint with a relative frame", servo.joint()),
                )
            })?;
            let available = nodes.get(id)?.number_of_dofs();
            servo.check_dof(available)?;
            self.connectivity.push(id);
        }

        let id = nodes.push(Node::lagrange_multiplier(block.size(), block.scaling()));
        self.connectivity.push(id);
        Ok(())
    }

    fn build_loc_dof(&mut self, nodes: &NodeStore, offsets: &[usize; Field::COUNT]) -> Result<()> {
        self.loc_dof.clear();
        for id in self.connectivity.iter() {
            let node = nodes.get(id)?;
            let first = offsets[id.field().index()]
                + node.first_index_dof().ok_or(SimError::NotInitialized)?;
            self.loc_dof.extend(first..first + node.number_of_dofs());
        }
        Ok(())
    }

    /// Capture the reference configuration and size the local buffers.
    pub(crate) fn initialize(
        &mut self,
        nodes: &mut NodeStore,
        offsets: &[usize; Field::COUNT],
        velocity: Option<&mut DVector<f64>>,
        time: f64,
    ) -> Result<()> {
        self.build_loc_dof(nodes, offsets)?;
        self.number_of_dofs = self
            .connectivity
            .iter()
            .filter(|id| id.field().is_kinematic())
            .map(|id| nodes.get(id).map(Node::number_of_dofs))
            .sum::<Result<usize>>()?;
        let size = self.loc_dof.len();
        self.res = DVector::zeros(size);
        self.st = DMatrix::zeros(size, size);

        match &mut self.kind {
            ElementKind::Force(element) => element.initialize(nodes, &self.connectivity),
            ElementKind::Constraint(element, block) => {
                block.allocate(self.number_of_dofs);
                element.initialize(nodes, &self.connectivity, &self.loc_dof, block, velocity, time)
            }
        }
    }

    /// Compute the local residual and tangents. Returns the norms used as
    /// convergence references.
    pub(crate) fn assemble_res(
        &mut self,
        ctx: &AssemblyContext<'_>,
        offsets: &[usize; Field::COUNT],
    ) -> Result<ResidualNorms> {
        self.build_loc_dof(ctx.nodes, offsets)?;
        self.tangents.clear();
        let n = self.number_of_dofs;

        match &mut self.kind {
            ElementKind::Force(element) => {
                self.res.fill(0.0);
                element.assemble(
                    ctx,
                    &self.connectivity,
                    &self.loc_dof,
                    &mut self.res,
                    &mut self.tangents,
                )?;
                Ok(ResidualNorms {
                    forces: self.res.norm(),
                    constraints: 0.0,
                })
            }
            ElementKind::Constraint(element, block) => {
                let lm = self.connectivity.multipliers().ok_or(SimError::NotInitialized)?;
                block
                    .multipliers
                    .copy_from(ctx.nodes.multipliers(lm, ctx.pair.current())?);
                element.assemble(ctx, &self.connectivity, block, &mut self.tangents)?;

                let forces = block.bt.tr_mul(&block.multipliers);
                self.res.rows_mut(0, n).copy_from(&forces);
                self.res
                    .rows_mut(n, block.size())
                    .copy_from(&(&block.value * block.scaling));
                Ok(ResidualNorms {
                    forces: forces.norm(),
                    constraints: block.value.norm(),
                })
            }
        }
    }

    /// Combine the tangents of the last assembly into the local iteration
    /// matrix.
    pub(crate) fn assemble_st(&mut self, coefs: &AssemblyCoefficients) {
        let n = self.number_of_dofs;
        self.st.fill(0.0);
        {
            let mut top_left = self.st.view_mut((0, 0), (n, n));
            let weighted = [
                (coefs.k, &self.tangents.stiffness),
                (coefs.c, &self.tangents.damping),
                (coefs.m, &self.tangents.mass),
            ];
            for (coef, tangent) in weighted {
                if coef == 0.0 {
                    continue;
                }
                if let Some(tangent) = tangent {
                    top_left += tangent * coef;
                }
            }
        }

        if let ElementKind::Constraint(_, block) = &self.kind {
            let coupling = &block.bt * (block.scaling * coefs.b);
            self.st.view_mut((n, 0), (block.size(), n)).copy_from(&coupling);
            self.st
                .view_mut((0, n), (n, block.size()))
                .copy_from(&coupling.transpose());
        }
    }

    /// Power of the element forces, `v · r`. Constraint forces do no work.
    pub(crate) fn mechanical_power(&self, velocity: &DVector<f64>) -> f64 {
        match self.kind {
            ElementKind::Constraint(..) => 0.0,
            ElementKind::Force(_) if velocity.is_empty() => 0.0,
            ElementKind::Force(_) => self
                .loc_dof
                .iter()
                .zip(self.res.iter())
                .map(|(&dof, r)| velocity[dof] * r)
                .sum(),
        }
    }
}

//! Nodes: the carriers of unknowns.
//!
//! Every node stores two configurations, *previous* and *current*. The
//! [`ConfigurationPair`] owned by the model says which buffer plays which
//! role; accepting a step swaps the roles without copying data.
//!
//! | Kind | Field | DOFs | Update rule |
//! |------|-------|------|-------------|
//! | `Frame` | motion | 6 | `H = H_prev * H(Δ)` |
//! | `RelativeFrame` | relative motion | `ncols(A)` | `H = H_prev * H(A Δ)` |
//! | `LagrangeMultiplier` | multipliers | n | `λ = λ_prev + s Δ` |
//! | `Vector` | motion | n | `x = x_prev + Δ` |
//! | `Rotation` | motion | 3 | `q = q_prev * q(Δ)` |

use nalgebra::{DVector, Matrix6xX, Vector3, Vector6};
use sim_lie::{Frame, LieError, UnitQuat};
use sim_types::{Field, NodeId, Result, SimError};

/// Roles of the two configuration buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationPair {
    previous: usize,
    current: usize,
}

impl Default for ConfigurationPair {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationPair {
    /// Previous configuration in buffer 0, current in buffer 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: 0,
            current: 1,
        }
    }

    /// Buffer holding the last accepted configuration.
    #[must_use]
    pub const fn previous(self) -> usize {
        self.previous
    }

    /// Buffer holding the configuration being iterated.
    #[must_use]
    pub const fn current(self) -> usize {
        self.current
    }

    /// Swap the roles of the buffers.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
    }
}

/// Frames of a frame-like node.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    frame_ref: Frame,
    frame_0: Frame,
    frames: [Frame; 2],
}

impl FrameState {
    fn new(frame_ref: Frame) -> Self {
        Self {
            frame_ref,
            frame_0: frame_ref,
            frames: [frame_ref; 2],
        }
    }

    /// Reference (undeformed) frame.
    #[must_use]
    pub fn frame_ref(&self) -> &Frame {
        &self.frame_ref
    }

    /// Frame at the start of the analysis.
    #[must_use]
    pub fn frame_0(&self) -> &Frame {
        &self.frame_0
    }

    /// Frame stored in buffer `index` (see [`ConfigurationPair`]).
    #[must_use]
    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    pub(crate) fn set_frame_0(&mut self, frame: Frame) {
        self.frame_0 = frame;
        self.frames = [frame; 2];
    }

    fn reset(&mut self) {
        self.frames = [self.frame_0; 2];
    }

    fn compose(
        &mut self,
        increment: &Vector6<f64>,
        pair: ConfigurationPair,
    ) -> std::result::Result<(), LieError> {
        self.frames[pair.current()] =
            self.frames[pair.previous()] * Frame::from_parameters(increment)?;
        Ok(())
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Rigid frame with 6 motion DOFs.
    Frame(FrameState),
    /// Relative frame of a joint; the columns of `projection` span the free
    /// relative motion.
    RelativeFrame {
        /// Frames of the relative motion.
        state: FrameState,
        /// 6×n projection matrix `A`.
        projection: Matrix6xX<f64>,
    },
    /// Lagrange multipliers of a constraint.
    LagrangeMultiplier {
        /// Multiplier buffers.
        values: [DVector<f64>; 2],
        /// Factor applied to increments.
        scaling: f64,
    },
    /// Point of R^n with additive updates.
    Vector {
        /// Initial value.
        initial: DVector<f64>,
        /// Value buffers.
        values: [DVector<f64>; 2],
    },
    /// Orientation with 3 rotational DOFs.
    Rotation {
        /// Initial orientation.
        initial: UnitQuat,
        /// Orientation buffers.
        values: [UnitQuat; 2],
    },
}

/// A node of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: Option<String>,
    first_index_dof: Option<usize>,
    initial_velocity: Option<DVector<f64>>,
    kind: NodeKind,
}

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            name: None,
            first_index_dof: None,
            initial_velocity: None,
            kind,
        }
    }

    /// Frame node whose reference and initial frames are `frame_ref`.
    #[must_use]
    pub fn frame(frame_ref: Frame) -> Self {
        Self::with_kind(NodeKind::Frame(FrameState::new(frame_ref)))
    }

    /// Relative frame node with projection `A`. Its frames are set by the
    /// joint owning it.
    #[must_use]
    pub fn relative_frame(projection: Matrix6xX<f64>) -> Self {
        Self::with_kind(NodeKind::RelativeFrame {
            state: FrameState::new(Frame::identity()),
            projection,
        })
    }

    /// Node of `count` Lagrange multipliers, initially zero.
    #[must_use]
    pub fn lagrange_multiplier(count: usize, scaling: f64) -> Self {
        let zero = DVector::zeros(count);
        Self::with_kind(NodeKind::LagrangeMultiplier {
            values: [zero.clone(), zero],
            scaling,
        })
    }

    /// Node of R^n at `initial`.
    #[must_use]
    pub fn vector(initial: DVector<f64>) -> Self {
        Self::with_kind(NodeKind::Vector {
            values: [initial.clone(), initial.clone()],
            initial,
        })
    }

    /// Orientation node at `initial`.
    #[must_use]
    pub fn rotation(initial: UnitQuat) -> Self {
        Self::with_kind(NodeKind::Rotation {
            initial,
            values: [initial; 2],
        })
    }

    /// Attach a name, used by loggers.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the initial velocity (body-fixed twist for frame nodes).
    #[must_use]
    pub fn with_initial_velocity(mut self, velocity: DVector<f64>) -> Self {
        self.initial_velocity = Some(velocity);
        self
    }

    /// Start the analysis from `frame` instead of the reference frame.
    /// Only meaningful for frame nodes.
    #[must_use]
    pub fn with_initial_frame(mut self, frame: Frame) -> Self {
        if let NodeKind::Frame(state) = &mut self.kind {
            state.set_frame_0(frame);
        }
        self
    }

    /// Name of the node, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Payload of the node.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Variable category.
    #[must_use]
    pub fn field(&self) -> Field {
        match self.kind {
            NodeKind::Frame(_) | NodeKind::Vector { .. } | NodeKind::Rotation { .. } => {
                Field::Motion
            }
            NodeKind::RelativeFrame { .. } => Field::RelativeMotion,
            NodeKind::LagrangeMultiplier { .. } => Field::LagrangeMultiplier,
        }
    }

    /// Number of DOFs carried by the node.
    #[must_use]
    pub fn number_of_dofs(&self) -> usize {
        match &self.kind {
            NodeKind::Frame(_) => 6,
            NodeKind::RelativeFrame { projection, .. } => projection.ncols(),
            NodeKind::LagrangeMultiplier { values, .. } => values[0].len(),
            NodeKind::Vector { initial, .. } => initial.len(),
            NodeKind::Rotation { .. } => 3,
        }
    }

    /// Offset of the first DOF within the node's category, once meshed.
    #[must_use]
    pub fn first_index_dof(&self) -> Option<usize> {
        self.first_index_dof
    }

    /// Initial velocity, if any.
    #[must_use]
    pub fn initial_velocity(&self) -> Option<&DVector<f64>> {
        self.initial_velocity.as_ref()
    }

    /// Frames of frame-like nodes.
    #[must_use]
    pub fn frame_state(&self) -> Option<&FrameState> {
        match &self.kind {
            NodeKind::Frame(state) | NodeKind::RelativeFrame { state, .. } => Some(state),
            _ => None,
        }
    }

    pub(crate) fn frame_state_mut(&mut self) -> Option<&mut FrameState> {
        match &mut self.kind {
            NodeKind::Frame(state) | NodeKind::RelativeFrame { state, .. } => Some(state),
            _ => None,
        }
    }

    /// Projection matrix of relative frame nodes.
    #[must_use]
    pub fn projection(&self) -> Option<&Matrix6xX<f64>> {
        match &self.kind {
            NodeKind::RelativeFrame { projection, .. } => Some(projection),
            _ => None,
        }
    }

    /// Configuration coordinates in buffer `index`: position and quaternion
    /// (7 values) for frames, 4 quaternion components for rotations, the
    /// raw values otherwise.
    #[must_use]
    pub fn motion_coordinates(&self, index: usize) -> DVector<f64> {
        match &self.kind {
            NodeKind::Frame(state) | NodeKind::RelativeFrame { state, .. } => {
                let frame = state.frame(index);
                let [e0, e1, e2, e3] = frame.orientation.coordinates();
                let x = frame.position;
                DVector::from_column_slice(&[x.x, x.y, x.z, e0, e1, e2, e3])
            }
            NodeKind::LagrangeMultiplier { values, .. } | NodeKind::Vector { values, .. } => {
                values[index].clone()
            }
            NodeKind::Rotation { values, .. } => {
                DVector::from_column_slice(&values[index].coordinates())
            }
        }
    }

    /// Assign the first DOF offset and return the DOF count.
    pub(crate) fn mesh(&mut self, first_index_dof: usize) -> usize {
        self.first_index_dof = Some(first_index_dof);
        self.number_of_dofs()
    }

    /// Reset both buffers to the initial configuration.
    pub(crate) fn initialize(&mut self) {
        match &mut self.kind {
            NodeKind::Frame(state) | NodeKind::RelativeFrame { state, .. } => state.reset(),
            NodeKind::LagrangeMultiplier { values, .. } => {
                for buffer in values.iter_mut() {
                    buffer.fill(0.0);
                }
            }
            NodeKind::Vector { initial, values } => {
                values[0].copy_from(initial);
                values[1].copy_from(initial);
            }
            NodeKind::Rotation { initial, values } => *values = [*initial; 2],
        }
    }

    /// Apply the increment to the previous configuration and store the
    /// result as the current configuration.
    pub(crate) fn kinematic_update(
        &mut self,
        increment: &[f64],
        pair: ConfigurationPair,
    ) -> std::result::Result<(), LieError> {
        let (prev, cur) = (pair.previous(), pair.current());
        match &mut self.kind {
            NodeKind::Frame(state) => {
                state.compose(&Vector6::from_column_slice(increment), pair)?;
            }
            NodeKind::RelativeFrame { state, projection } => {
                let local = &*projection * DVector::from_column_slice(increment);
                state.compose(&local, pair)?;
            }
            NodeKind::LagrangeMultiplier { values, scaling } => {
                let updated = &values[prev] + DVector::from_column_slice(increment) * *scaling;
                values[cur] = updated;
            }
            NodeKind::Vector { values, .. } => {
                let updated = &values[prev] + DVector::from_column_slice(increment);
                values[cur] = updated;
            }
            NodeKind::Rotation { values, .. } => {
                let rotation = UnitQuat::from_parameters(&Vector3::from_column_slice(increment))?;
                values[cur] = values[prev] * rotation;
            }
        }
        Ok(())
    }
}

/// Nodes of a model, grouped by category in creation order.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: [Vec<Node>; Field::COUNT],
}

impl NodeStore {
    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let field = node.field();
        let list = &mut self.nodes[field.index()];
        list.push(node);
        NodeId::new(field, list.len() - 1)
    }

    /// Node behind a handle.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes[id.field().index()]
            .get(id.index())
            .ok_or(SimError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes[id.field().index()]
            .get_mut(id.index())
            .ok_or(SimError::UnknownNode(id))
    }

    /// Nodes of one category, in creation order.
    pub fn iter(&self, field: Field) -> impl Iterator<Item = &Node> {
        self.nodes[field.index()].iter()
    }

    pub(crate) fn iter_mut(&mut self, field: Field) -> impl Iterator<Item = &mut Node> {
        self.nodes[field.index()].iter_mut()
    }

    /// Number of nodes in a category.
    #[must_use]
    pub fn len(&self, field: Field) -> usize {
        self.nodes[field.index()].len()
    }

    /// Whether the store holds no node at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(Vec::is_empty)
    }

    /// Frames of a frame-like node.
    pub fn frame_state(&self, id: NodeId) -> Result<&FrameState> {
        self.get(id)?
            .frame_state()
            .ok_or_else(|| SimError::invalid_topology("node", format!("{id} is not a frame node")))
    }

    pub(crate) fn frame_state_mut(&mut self, id: NodeId) -> Result<&mut FrameState> {
        self.get_mut(id)?
            .frame_state_mut()
            .ok_or_else(|| SimError::invalid_topology("node", format!("{id} is not a frame node")))
    }

    /// Frame of a frame-like node in buffer `index`.
    pub fn frame(&self, id: NodeId, index: usize) -> Result<&Frame> {
        Ok(self.frame_state(id)?.frame(index))
    }

    /// Multipliers of a Lagrange multiplier node in buffer `index`.
    pub fn multipliers(&self, id: NodeId, index: usize) -> Result<&DVector<f64>> {
        match &self.get(id)?.kind {
            NodeKind::LagrangeMultiplier { values, .. } => Ok(&values[index]),
            _ => Err(SimError::invalid_topology(
                "node",
                format!("{id} is not a Lagrange multiplier node"),
            )),
        }
    }
}

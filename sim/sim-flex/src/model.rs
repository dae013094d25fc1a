//! Model: node and element ownership, DOF numbering and global assembly.
//!
//! # Lifecycle
//!
//! 1. Construction: [`Model::add_node`] and [`Model::add_element`].
//! 2. [`Model::mesh`]: elements register their auxiliary nodes, then every
//!    node receives a contiguous DOF range within its category. The model
//!    is frozen afterwards.
//! 3. [`Model::initialize`]: configurations are reset to the initial
//!    frames, global vectors are sized and elements capture their reference
//!    configuration.
//! 4. Solve: the solvers drive [`Model::assemble_res_st`],
//!    [`Model::kinematic_update`] and [`Model::advance_time_step`].
//!
//! # Global unknowns
//!
//! Unknowns are ordered by category: motion DOFs, then relative-motion DOFs,
//! then Lagrange multipliers. Velocities and accelerations exist for the
//! first two categories only.

use std::ops::Range;

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use sim_lie::Frame;
use sim_types::{AnalysisType, ElementId, Field, NodalField, NodeId, Result, SimError};
use tracing::debug;

use crate::assembly::TripletBuffer;
use crate::element::{
    AssemblyCoefficients, AssemblyContext, Element, ElementProperties, ResidualNorms,
};
use crate::node::{ConfigurationPair, Node, NodeStore};

/// Global unknown vectors owned by the model and updated by the solvers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionState {
    /// Increment of every unknown since the previous configuration.
    pub increment: DVector<f64>,
    /// Velocity of the kinematic DOFs.
    pub velocity: DVector<f64>,
    /// Acceleration of the kinematic DOFs.
    pub acceleration: DVector<f64>,
}

/// Nodes, elements and global buffers of a mechanism.
#[derive(Debug, Clone, Default)]
pub struct Model {
    nodes: NodeStore,
    elements: Vec<Element>,
    number_of_dofs: [usize; Field::COUNT],
    dof_offsets: [usize; Field::COUNT],
    is_meshed: bool,
    analysis: Option<AnalysisType>,
    time: f64,
    pair: ConfigurationPair,
    state: SolutionState,
    residual: DVector<f64>,
    triplets: TripletBuffer,
    mechanical_power: f64,
}

impl Model {
    /// Empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Add a motion node. Relative frames and multipliers are created by
    /// their elements at mesh time.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if self.is_meshed {
            return Err(SimError::model_frozen("add_node"));
        }
        if node.field() != Field::Motion {
            return Err(SimError::invalid_topology(
                "node",
                format!("{} nodes are created by their elements", node.field()),
            ));
        }
        if let Some(v0) = node.initial_velocity() {
            if v0.len() != node.number_of_dofs() {
                return Err(SimError::invalid_config(format!(
                    "initial velocity has {} components, node has {} DOFs",
                    v0.len(),
                    node.number_of_dofs()
                )));
            }
        }
        Ok(self.nodes.push(node))
    }

    /// Add an element on motion frame nodes and return its handle.
    pub fn add_element(
        &mut self,
        props: impl Into<ElementProperties>,
        nodes: &[NodeId],
    ) -> Result<ElementId> {
        if self.is_meshed {
            return Err(SimError::model_frozen("add_element"));
        }
        let element = Element::new(props.into(), nodes, &self.nodes)?;
        if let Some(target) = element.servo_target() {
            if target.index() >= self.elements.len() {
                return Err(SimError::invalid_topology(
                    "servo constraint",
                    format!("{target} must be added before the servo driving it"),
                ));
            }
        }
        self.elements.push(element);
        Ok(ElementId::new(self.elements.len() - 1))
    }

    /// Node store.
    #[must_use]
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Node behind a handle.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id)
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Element behind a handle.
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements
            .get(id.index())
            .ok_or(SimError::UnknownElement(id))
    }

    // ========================================================================
    // Mesh and initialization
    // ========================================================================

    /// Register auxiliary nodes and number the DOFs. Runs once; later calls
    /// do nothing.
    pub fn mesh(&mut self) -> Result<()> {
        if self.is_meshed {
            return Ok(());
        }
        for i in 0..self.elements.len() {
            let driven = match self.elements[i].servo_target() {
                Some(target) => self.element(target)?.relative_node(),
                None => None,
            };
            self.elements[i].mesh(&mut self.nodes, driven)?;
        }

        let mut offset = 0;
        for field in Field::ALL {
            let mut count = 0;
            for node in self.nodes.iter_mut(field) {
                count += node.mesh(count);
            }
            self.number_of_dofs[field.index()] = count;
            self.dof_offsets[field.index()] = offset;
            offset += count;
        }
        self.is_meshed = true;

        debug!(
            motion = self.number_of_dofs[Field::Motion.index()],
            relative = self.number_of_dofs[Field::RelativeMotion.index()],
            multipliers = self.number_of_dofs[Field::LagrangeMultiplier.index()],
            elements = self.elements.len(),
            "model meshed"
        );
        Ok(())
    }

    /// Prepare the model for an analysis. Meshes the model if needed.
    ///
    /// Nodes and elements are initialized exactly once. Calling it again
    /// with the same analysis type does nothing: the time, the configuration
    /// pair, the nodal frames and the velocity and acceleration are kept as
    /// they are, so a solve can resume from the state of a previous one.
    /// Another analysis type is rejected.
    pub fn initialize(&mut self, analysis: AnalysisType) -> Result<()> {
        match self.analysis {
            Some(current) if current == analysis => return Ok(()),
            Some(current) => {
                return Err(SimError::invalid_config(format!(
                    "model already initialized for {current:?} analysis"
                )))
            }
            None => {}
        }
        self.mesh()?;

        self.time = 0.0;
        self.pair = ConfigurationPair::new();
        let kinematic = self.number_of_kinematic_dofs();
        let total = self.number_of_unknowns();
        let dynamic = analysis.is_dynamic();
        let rates = if dynamic { kinematic } else { 0 };
        self.state = SolutionState {
            increment: DVector::zeros(total),
            velocity: DVector::zeros(rates),
            acceleration: DVector::zeros(rates),
        };
        self.residual = DVector::zeros(total);

        for field in Field::ALL {
            for node in self.nodes.iter_mut(field) {
                node.initialize();
            }
        }
        if dynamic {
            for field in [Field::Motion, Field::RelativeMotion] {
                let offset = self.dof_offsets[field.index()];
                for node in self.nodes.iter(field) {
                    if let (Some(v0), Some(first)) =
                        (node.initial_velocity(), node.first_index_dof())
                    {
                        self.state
                            .velocity
                            .rows_mut(offset + first, v0.len())
                            .copy_from(v0);
                    }
                }
            }
        }

        for element in &mut self.elements {
            let velocity = if dynamic {
                Some(&mut self.state.velocity)
            } else {
                None
            };
            element.initialize(&mut self.nodes, &self.dof_offsets, velocity, self.time)?;
        }

        self.analysis = Some(analysis);
        debug!(?analysis, unknowns = total, "model initialized");
        Ok(())
    }

    // ========================================================================
    // Assembly
    // ========================================================================

    /// Assemble the global residual and the triplets of the iteration
    /// matrix weighted by `coefs`. Returns the summed element norms used as
    /// convergence references.
    pub fn assemble_res_st(&mut self, coefs: &AssemblyCoefficients) -> Result<ResidualNorms> {
        let analysis = self.analysis.ok_or(SimError::NotInitialized)?;
        self.residual.fill(0.0);
        self.triplets.clear();
        self.mechanical_power = 0.0;

        let ctx = AssemblyContext {
            nodes: &self.nodes,
            pair: self.pair,
            time: self.time,
            analysis,
            velocity: &self.state.velocity,
            acceleration: &self.state.acceleration,
        };
        let mut norms = ResidualNorms::default();
        for element in &mut self.elements {
            norms += element.assemble_res(&ctx, &self.dof_offsets)?;
            element.assemble_st(coefs);

            for (&dof, r) in element.loc_dof().iter().zip(element.residual().iter()) {
                self.residual[dof] += r;
            }
            self.triplets
                .add_block(element.iteration_matrix(), element.loc_dof());
            self.mechanical_power += element.mechanical_power(&self.state.velocity);
        }
        Ok(norms)
    }

    /// Global iteration matrix from the triplets of the last assembly.
    #[must_use]
    pub fn build_iteration_matrix(&self) -> CscMatrix<f64> {
        self.triplets.to_csc(self.number_of_unknowns())
    }

    /// Apply the global increment to the nodes of the given categories.
    pub fn kinematic_update(&mut self, fields: &[Field]) -> Result<()> {
        for &field in fields {
            let offset = self.dof_offsets[field.index()];
            for node in self.nodes.iter_mut(field) {
                let first = offset + node.first_index_dof().ok_or(SimError::NotInitialized)?;
                let range = first..first + node.number_of_dofs();
                node.kinematic_update(&self.state.increment.as_slice()[range], self.pair)?;
            }
        }
        Ok(())
    }

    /// Move to the next time step: advance the clock and swap the roles of
    /// the configuration buffers.
    pub fn advance_time_step(&mut self, h: f64) {
        self.time += h;
        self.pair.swap();
    }

    pub(crate) fn state_mut(&mut self) -> &mut SolutionState {
        &mut self.state
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Global unknown vectors.
    #[must_use]
    pub fn state(&self) -> &SolutionState {
        &self.state
    }

    /// Global residual of the last assembly.
    #[must_use]
    pub fn residual(&self) -> &DVector<f64> {
        &self.residual
    }

    /// Norms of the force part and of the constraint part of the residual.
    #[must_use]
    pub fn residual_norms(&self) -> (f64, f64) {
        let n = self.number_of_kinematic_dofs().min(self.residual.len());
        let forces = self.residual.rows(0, n).norm();
        let constraints = self.residual.rows(n, self.residual.len() - n).norm();
        (forces, constraints)
    }

    /// Mechanical power of the last assembly.
    #[must_use]
    pub fn mechanical_power(&self) -> f64 {
        self.mechanical_power
    }

    /// Current time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Analysis type, once initialized.
    #[must_use]
    pub fn analysis(&self) -> Option<AnalysisType> {
        self.analysis
    }

    /// Whether [`Model::mesh`] has run.
    #[must_use]
    pub fn is_meshed(&self) -> bool {
        self.is_meshed
    }

    /// Roles of the configuration buffers.
    #[must_use]
    pub fn configuration_pair(&self) -> ConfigurationPair {
        self.pair
    }

    /// Number of DOFs of a category.
    #[must_use]
    pub fn number_of_dofs(&self, field: Field) -> usize {
        self.number_of_dofs[field.index()]
    }

    /// First global index of a category.
    #[must_use]
    pub fn dof_offset(&self, field: Field) -> usize {
        self.dof_offsets[field.index()]
    }

    /// Number of motion and relative-motion DOFs.
    #[must_use]
    pub fn number_of_kinematic_dofs(&self) -> usize {
        self.number_of_dofs(Field::Motion) + self.number_of_dofs(Field::RelativeMotion)
    }

    /// Total number of unknowns.
    #[must_use]
    pub fn number_of_unknowns(&self) -> usize {
        self.number_of_dofs.iter().sum()
    }

    /// Global DOF range of a node.
    pub fn node_dof_range(&self, id: NodeId) -> Result<Range<usize>> {
        let node = self.nodes.get(id)?;
        let first = self.dof_offset(id.field())
            + node.first_index_dof().ok_or(SimError::NotInitialized)?;
        Ok(first..first + node.number_of_dofs())
    }

    /// Current frame of a frame-like node.
    pub fn frame(&self, id: NodeId) -> Result<&Frame> {
        self.nodes.frame(id, self.pair.current())
    }

    /// Current configuration coordinates of a node.
    pub fn motion_coordinates(&self, id: NodeId) -> Result<DVector<f64>> {
        Ok(self.nodes.get(id)?.motion_coordinates(self.pair.current()))
    }

    /// Velocity of a kinematic node.
    pub fn nodal_velocity(&self, id: NodeId) -> Result<DVector<f64>> {
        self.nodal_rate(id, &self.state.velocity)
    }

    /// Acceleration of a kinematic node.
    pub fn nodal_acceleration(&self, id: NodeId) -> Result<DVector<f64>> {
        self.nodal_rate(id, &self.state.acceleration)
    }

    /// Value of a nodal field in the current configuration.
    pub fn nodal_field(&self, id: NodeId, field: NodalField) -> Result<DVector<f64>> {
        match field {
            NodalField::Motion => self.motion_coordinates(id),
            NodalField::Velocity => self.nodal_velocity(id),
            NodalField::Acceleration => self.nodal_acceleration(id),
        }
    }

    fn nodal_rate(&self, id: NodeId, source: &DVector<f64>) -> Result<DVector<f64>> {
        match self.analysis {
            None => return Err(SimError::NotInitialized),
            Some(AnalysisType::Static) => {
                return Err(SimError::invalid_config(
                    "static analysis has no velocity or acceleration",
                ))
            }
            Some(AnalysisType::Dynamic) => {}
        }
        if !id.field().is_kinematic() {
            return Err(SimError::invalid_config(format!(
                "{id} has no velocity or acceleration"
            )));
        }
        let range = self.node_dof_range(id)?;
        Ok(source.rows(range.start, range.len()).into_owned())
    }
}

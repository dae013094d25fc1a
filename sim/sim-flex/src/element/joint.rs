//! Ground and kinematic joints.
//!
//! A joint owns a relative frame node `H_I` whose increments are projected
//! through the 6×n matrix `A`: the columns of `A` span the relative motion
//! the joint leaves free. The six constraints tie `H_I` to the connected
//! nodes:
//!
//! ```text
//! ground:     g = p(H_A⁻¹ H_I),          B = [-I, A]
//! kinematic:  g = p(H_B⁻¹ H_A H_I),      B = [Ad(H_I⁻¹), -I, A]
//! ```

use nalgebra::{DMatrix, DVector, Matrix6xX, Vector3, Vector6};
use sim_types::{Result, SimError};

use super::{
    relative_frame_stiffness, to_dynamic, AssemblyContext, Connectivity, ConstraintBlock,
    LocalTangents,
};
use crate::node::NodeStore;

/// Projection and scaling shared by ground and kinematic joints.
#[derive(Debug, Clone, PartialEq)]
pub struct JointProperties {
    projection: Matrix6xX<f64>,
    constraint_scaling: f64,
}

fn unit(axis: &Vector3<f64>) -> Vector3<f64> {
    axis.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
}

fn translation(axis: &Vector3<f64>) -> Vector6<f64> {
    let a = unit(axis);
    Vector6::new(a.x, a.y, a.z, 0.0, 0.0, 0.0)
}

fn rotation(axis: &Vector3<f64>) -> Vector6<f64> {
    let a = unit(axis);
    Vector6::new(0.0, 0.0, 0.0, a.x, a.y, a.z)
}

impl JointProperties {
    /// Joint with an arbitrary projection matrix `A`.
    #[must_use]
    pub fn custom(projection: Matrix6xX<f64>) -> Self {
        Self {
            projection,
            constraint_scaling: 1.0,
        }
    }

    /// Rotation about `axis`, expressed in the joint frame.
    #[must_use]
    pub fn hinge(axis: Vector3<f64>) -> Self {
        Self::custom(Matrix6xX::from_columns(&[rotation(&axis)]))
    }

    /// Translation along `axis`.
    #[must_use]
    pub fn prismatic(axis: Vector3<f64>) -> Self {
        Self::custom(Matrix6xX::from_columns(&[translation(&axis)]))
    }

    /// Translation along and rotation about `axis`.
    #[must_use]
    pub fn cylindrical(axis: Vector3<f64>) -> Self {
        Self::custom(Matrix6xX::from_columns(&[translation(&axis), rotation(&axis)]))
    }

    /// Free rotations about a point.
    #[must_use]
    pub fn spherical() -> Self {
        Self::custom(Matrix6xX::from_columns(&[
            rotation(&Vector3::x()),
            rotation(&Vector3::y()),
            rotation(&Vector3::z()),
        ]))
    }

    /// Set the constraint scaling `s`.
    #[must_use]
    pub fn with_constraint_scaling(mut self, scaling: f64) -> Self {
        self.constraint_scaling = scaling;
        self
    }

    /// Projection matrix `A`.
    #[must_use]
    pub fn projection(&self) -> &Matrix6xX<f64> {
        &self.projection
    }

    /// Number of free relative DOFs.
    #[must_use]
    pub fn number_of_relative_dofs(&self) -> usize {
        self.projection.ncols()
    }

    /// Constraint scaling `s`.
    #[must_use]
    pub fn constraint_scaling(&self) -> f64 {
        self.constraint_scaling
    }

    /// Check that `A` has between 1 and 6 independent columns.
    pub fn validate(&self) -> Result<()> {
        let n = self.projection.ncols();
        if n == 0 || n > 6 {
            return Err(SimError::invalid_config(format!(
                "joint projection must have 1 to 6 columns, got {n}"
            )));
        }
        if self.projection.iter().any(|x| !x.is_finite())
            || self.normal_matrix().cholesky().is_none()
        {
            return Err(SimError::invalid_config(
                "joint projection must have full column rank",
            ));
        }
        if !self.constraint_scaling.is_finite() || self.constraint_scaling <= 0.0 {
            return Err(SimError::invalid_config(
                "constraint scaling must be positive",
            ));
        }
        Ok(())
    }

    fn dense_projection(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(6, self.projection.ncols(), self.projection.as_slice())
    }

    fn normal_matrix(&self) -> DMatrix<f64> {
        let a = self.dense_projection();
        a.tr_mul(&a)
    }

    /// Least-squares solution of `A x = rhs`.
    fn least_squares(&self, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let a = self.dense_projection();
        let normal = self
            .normal_matrix()
            .cholesky()
            .ok_or_else(|| {
                SimError::invalid_config("joint projection must have full column rank")
            })?;
        Ok(normal.solve(&a.tr_mul(rhs)))
    }
}

/// Write the relative velocity of a joint into the global velocity vector.
fn set_relative_velocity(velocity: &mut DVector<f64>, dofs: &[usize], values: &DVector<f64>) {
    for (&dof, value) in dofs.iter().zip(values.iter()) {
        velocity[dof] = *value;
    }
}

/// Joint between a frame node and the ground.
#[derive(Debug, Clone)]
pub struct GroundJointElement {
    props: JointProperties,
}

impl GroundJointElement {
    pub(crate) fn new(props: JointProperties) -> Self {
        Self { props }
    }

    /// Properties of the joint.
    #[must_use]
    pub fn properties(&self) -> &JointProperties {
        &self.props
    }

    pub(crate) fn projection(&self) -> &Matrix6xX<f64> {
        &self.props.projection
    }

    pub(crate) fn constraint_scaling(&self) -> f64 {
        self.props.constraint_scaling
    }

    pub(crate) fn initialize(
        &mut self,
        nodes: &mut NodeStore,
        conn: &Connectivity,
        loc_dof: &[usize],
        block: &mut ConstraintBlock,
        velocity: Option<&mut DVector<f64>>,
    ) -> Result<()> {
        let frame_0 = *nodes.frame_state(conn.motion(0))?.frame_0();
        nodes.frame_state_mut(conn.relative(0))?.set_frame_0(frame_0);

        let n = self.props.number_of_relative_dofs();
        let mut bt = DMatrix::zeros(6, 6 + n);
        bt.view_mut((0, 0), (6, 6))
            .copy_from(&(-DMatrix::<f64>::identity(6, 6)));
        bt.view_mut((0, 6), (6, n))
            .copy_from(&self.props.dense_projection());
        block.bt = bt;

        if let Some(v) = velocity {
            let v_a = DVector::from_iterator(6, loc_dof[..6].iter().map(|&dof| v[dof]));
            let v_i = self.props.least_squares(&v_a)?;
            set_relative_velocity(v, &loc_dof[6..6 + n], &v_i);
        }
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        let frame_a = *ctx.frame(conn.motion(0))?;
        let frame_i = *ctx.frame(conn.relative(0))?;
        block.set_value(&(frame_a.inverse() * frame_i).parameters());
        tangents.stiffness = Some(relative_frame_stiffness(&block.bt, &block.multipliers));
        Ok(())
    }
}

/// Joint between two frame nodes.
#[derive(Debug, Clone)]
pub struct KinematicJointElement {
    props: JointProperties,
}

impl KinematicJointElement {
    pub(crate) fn new(props: JointProperties) -> Self {
        Self { props }
    }

    /// Properties of the joint.
    #[must_use]
    pub fn properties(&self) -> &JointProperties {
        &self.props
    }

    pub(crate) fn projection(&self) -> &Matrix6xX<f64> {
        &self.props.projection
    }

    pub(crate) fn constraint_scaling(&self) -> f64 {
        self.props.constraint_scaling
    }

    pub(crate) fn initialize(
        &mut self,
        nodes: &mut NodeStore,
        conn: &Connectivity,
        loc_dof: &[usize],
        block: &mut ConstraintBlock,
        velocity: Option<&mut DVector<f64>>,
    ) -> Result<()> {
        let frame_a = *nodes.frame_state(conn.motion(0))?.frame_0();
        let frame_b = *nodes.frame_state(conn.motion(1))?.frame_0();
        let relative = frame_a.inverse() * frame_b;
        nodes.frame_state_mut(conn.relative(0))?.set_frame_0(relative);

        let n = self.props.number_of_relative_dofs();
        let mut bt = DMatrix::zeros(6, 12 + n);
        bt.view_mut((0, 0), (6, 6))
            .copy_from(&to_dynamic(&relative.inverse_adjoint()));
        bt.view_mut((0, 6), (6, 6))
            .copy_from(&(-DMatrix::<f64>::identity(6, 6)));
        bt.view_mut((0, 12), (6, n))
            .copy_from(&self.props.dense_projection());

        if let Some(v) = velocity {
            let v_ab = DVector::from_iterator(12, loc_dof[..12].iter().map(|&dof| v[dof]));
            let mismatch = bt.columns(0, 12) * v_ab;
            let v_i = -self.props.least_squares(&mismatch)?;
            set_relative_velocity(v, &loc_dof[12..12 + n], &v_i);
        }
        block.bt = bt;
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        block: &mut ConstraintBlock,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        let frame_a = *ctx.frame(conn.motion(0))?;
        let frame_b = *ctx.frame(conn.motion(1))?;
        let frame_i = *ctx.frame(conn.relative(0))?;

        block
            .bt
            .view_mut((0, 0), (6, 6))
            .copy_from(&to_dynamic(&frame_i.inverse_adjoint()));
        block.set_value(&(frame_b.inverse() * frame_a * frame_i).parameters());
        tangents.stiffness = Some(relative_frame_stiffness(&block.bt, &block.multipliers));
        Ok(())
    }
}

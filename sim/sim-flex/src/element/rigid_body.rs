//! Rigid body in body-fixed twist coordinates.

use nalgebra::{DVector, Matrix3, Matrix6, Vector3, Vector6};
use sim_lie::tilde;
use sim_types::{Result, SimError};

use super::{gather, to_dynamic, AssemblyContext, LocalTangents};

/// Mass and inertia of a rigid body, expressed at the node in body axes.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyProperties {
    mass: f64,
    inertia: Matrix3<f64>,
}

impl RigidBodyProperties {
    /// Body of mass `m` and inertia tensor `J`.
    #[must_use]
    pub fn new(mass: f64, inertia: Matrix3<f64>) -> Self {
        Self { mass, inertia }
    }

    /// Body with a diagonal inertia tensor.
    #[must_use]
    pub fn with_principal_inertia(mass: f64, principal: Vector3<f64>) -> Self {
        Self::new(mass, Matrix3::from_diagonal(&principal))
    }

    /// Mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inertia tensor.
    #[must_use]
    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }

    /// Kinetic energy of the body moving with the twist `[u; ω]`.
    #[must_use]
    pub fn kinetic_energy(&self, twist: &Vector6<f64>) -> f64 {
        let u = twist.fixed_rows::<3>(0);
        let omega = twist.fixed_rows::<3>(3);
        0.5 * (self.mass * u.norm_squared() + omega.dot(&(self.inertia * omega)))
    }

    /// Check that the mass is positive and the inertia symmetric positive
    /// definite.
    pub fn validate(&self) -> Result<()> {
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(SimError::invalid_config("rigid body mass must be positive"));
        }
        let symmetric = (self.inertia - self.inertia.transpose()).norm()
            <= 1e-12 * self.inertia.norm();
        if !symmetric || self.inertia.cholesky().is_none() {
            return Err(SimError::invalid_config(
                "rigid body inertia must be symmetric positive definite",
            ));
        }
        Ok(())
    }
}

/// Rigid body element on one frame node.
///
/// The residual is the Newton-Euler equation
/// `[m (u̇ + ω × u); J ω̇ + ω × J ω]`, with no contribution in static
/// analysis.
#[derive(Debug, Clone)]
pub struct RigidBodyElement {
    props: RigidBodyProperties,
    mass_matrix: Matrix6<f64>,
}

impl RigidBodyElement {
    pub(crate) fn new(props: RigidBodyProperties) -> Self {
        let mut mass_matrix = Matrix6::zeros();
        mass_matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3::identity() * props.mass));
        mass_matrix.fixed_view_mut::<3, 3>(3, 3).copy_from(&props.inertia);
        Self { props, mass_matrix }
    }

    /// Properties of the body.
    #[must_use]
    pub fn properties(&self) -> &RigidBodyProperties {
        &self.props
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        loc_dof: &[usize],
        res: &mut DVector<f64>,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        if !ctx.analysis.is_dynamic() {
            res.fill(0.0);
            return Ok(());
        }
        let m = self.props.mass;
        let j = &self.props.inertia;

        let v = gather::<6>(ctx.velocity, loc_dof);
        let v_dot = gather::<6>(ctx.acceleration, loc_dof);
        let u: Vector3<f64> = v.fixed_rows::<3>(0).into_owned();
        let omega: Vector3<f64> = v.fixed_rows::<3>(3).into_owned();
        let u_dot = v_dot.fixed_rows::<3>(0);
        let omega_dot = v_dot.fixed_rows::<3>(3);

        let force = (u_dot + omega.cross(&u)) * m;
        let moment = j * omega_dot + omega.cross(&(j * omega));
        res.fixed_rows_mut::<3>(0).copy_from(&force);
        res.fixed_rows_mut::<3>(3).copy_from(&moment);

        let mut damping = Matrix6::zeros();
        damping
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&tilde(&(omega * m)));
        damping
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&tilde(&(u * -m)));
        damping
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(tilde(&omega) * j - tilde(&(j * omega))));

        tangents.damping = Some(to_dynamic(&damping));
        tangents.mass = Some(to_dynamic(&self.mass_matrix));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{AssemblyCoefficients, Model, Node};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use sim_lie::Frame;
    use sim_types::AnalysisType;

    fn body_model() -> Model {
        let mut model = Model::new();
        let node = model.add_node(Node::frame(Frame::identity())).unwrap();
        let mut inertia = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0));
        inertia[(0, 1)] = 0.2;
        inertia[(1, 0)] = 0.2;
        model
            .add_element(RigidBodyProperties::new(2.0, inertia), &[node])
            .unwrap();
        model.initialize(AnalysisType::Dynamic).unwrap();
        model
    }

    fn residual_at(
        model: &mut Model,
        v: &DVector<f64>,
        v_dot: &DVector<f64>,
    ) -> (DVector<f64>, LocalTangents) {
        let state = model.state_mut();
        state.velocity.copy_from(v);
        state.acceleration.copy_from(v_dot);
        model
            .assemble_res_st(&AssemblyCoefficients::new(1.0, 1.0, 1.0, 1.0))
            .unwrap();
        (model.residual().clone(), model.elements()[0].tangents().clone())
    }

    #[test]
    fn test_validate() {
        let body = RigidBodyProperties::with_principal_inertia(2.0, Vector3::new(1.0, 2.0, 3.0));
        assert!(body.validate().is_ok());
        assert!(RigidBodyProperties::with_principal_inertia(0.0, Vector3::new(1.0, 1.0, 1.0))
            .validate()
            .is_err());
        assert!(RigidBodyProperties::with_principal_inertia(1.0, Vector3::new(1.0, -1.0, 1.0))
            .validate()
            .is_err());
        let mut skew = Matrix3::identity();
        skew[(0, 1)] = 0.5;
        assert!(RigidBodyProperties::new(1.0, skew).validate().is_err());
    }

    #[test]
    fn test_kinetic_energy() {
        let body = RigidBodyProperties::with_principal_inertia(2.0, Vector3::new(1.0, 2.0, 3.0));
        let twist = Vector6::new(1.0, 0.0, 0.0, 0.0, 0.0, 2.0);
        assert_eq!(body.kinetic_energy(&twist), 0.5 * (2.0 + 12.0));
    }

    #[test]
    fn test_newton_euler_residual() {
        let mut model = body_model();
        let v = DVector::from_column_slice(&[1.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
        let (res, _) = residual_at(&mut model, &v, &DVector::zeros(6));
        // m ω × u = 2 (2 ez × ex) = 4 ey
        assert_relative_eq!(
            res,
            DVector::from_column_slice(&[0.0, 4.0, 0.0, 0.0, 0.0, 0.0]),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_tangents_match_finite_differences() {
        let mut model = body_model();
        let v = DVector::from_column_slice(&[0.4, -0.3, 0.2, 1.5, -0.7, 0.9]);
        let v_dot = DVector::from_column_slice(&[0.1, 0.2, -0.3, 0.5, 0.4, -0.2]);
        let direction = DVector::from_column_slice(&[0.3, 0.1, -0.2, -0.4, 0.6, 0.2]);
        let (_, tangents) = residual_at(&mut model, &v, &v_dot);
        let damping: DMatrix<f64> = tangents.damping.unwrap();
        let mass: DMatrix<f64> = tangents.mass.unwrap();

        let eps = 1e-6;
        let (plus, _) = residual_at(&mut model, &(&v + &direction * eps), &v_dot);
        let (minus, _) = residual_at(&mut model, &(&v - &direction * eps), &v_dot);
        let numeric = (plus - minus) / (2.0 * eps);
        assert_relative_eq!(numeric, &damping * &direction, epsilon = 1e-8);

        let (plus, _) = residual_at(&mut model, &v, &(&v_dot + &direction * eps));
        let (minus, _) = residual_at(&mut model, &v, &(&v_dot - &direction * eps));
        let numeric = (plus - minus) / (2.0 * eps);
        assert_relative_eq!(numeric, &mass * &direction, epsilon = 1e-8);
    }

    #[test]
    fn test_static_analysis_has_no_residual() {
        let mut model = Model::new();
        let node = model.add_node(Node::frame(Frame::identity())).unwrap();
        model
            .add_element(
                RigidBodyProperties::with_principal_inertia(1.0, Vector3::new(1.0, 1.0, 1.0)),
                &[node],
            )
            .unwrap();
        model.initialize(AnalysisType::Static).unwrap();
        model
            .assemble_res_st(&AssemblyCoefficients::static_equilibrium())
            .unwrap();
        assert_eq!(model.residual().norm(), 0.0);
        assert!(model.elements()[0].tangents().mass.is_none());
    }

    #[test]
    fn test_mass_matrix_layout() {
        let body = RigidBodyElement::new(RigidBodyProperties::with_principal_inertia(
            2.0,
            Vector3::new(1.0, 2.0, 3.0),
        ));
        assert_eq!(
            body.mass_matrix.diagonal(),
            Vector6::new(2.0, 2.0, 2.0, 1.0, 2.0, 3.0)
        );
    }
}

//! Geometrically exact two-node beam on SE(3).
//!
//! The strain measure is the parameter vector of the relative frame
//! `d = p(H_A⁻¹ H_B)`. With `d0` captured in the reference configuration
//! and `P = [-T⁻¹(-d), T⁻¹(d)]` mapping nodal increments to `δd`:
//!
//! ```text
//! r_int = Pᵀ (K/L) (d - d0)
//! K_int = Pᵀ (K/L) P + geometric terms from ∂(T⁻¹ᵀ f)/∂p
//! ```
//!
//! Distributed loads and inertia are integrated with Gauss points along the
//! beam, using the interpolation `Q(s) = [I - T*, T*]` with
//! `T* = s T(s d) T⁻¹(d)` that maps nodal twists to the twist at `s`.

use std::fmt;
use std::sync::Arc;

use nalgebra::{Matrix6, SMatrix, SVector, Vector3, Vector6};
use sim_lie::{
    breve6, derivative_inverse_transposed_tangent_operator, inverse_tangent_operator,
    tangent_operator, tilde, tilde6, Frame,
};
use sim_types::{ElementId, NodeId, Result, SimError};

use super::{
    gather, to_dynamic, AssemblyContext, Connectivity, DistributedLoadFunction,
    ElementProperties, LocalTangents,
};
use crate::node::NodeStore;
use crate::quadrature::GaussRule;
use crate::{Model, Node};

type Matrix12 = SMatrix<f64, 12, 12>;
type Matrix6x12 = SMatrix<f64, 6, 12>;
type Vector12 = SVector<f64, 12>;

/// Stiffness and mass resultants of a cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionResultants {
    /// Axial stiffness.
    pub ea: f64,
    /// Shear stiffness along the first section axis.
    pub ga_1: f64,
    /// Shear stiffness along the second section axis.
    pub ga_2: f64,
    /// Torsional stiffness.
    pub gj: f64,
    /// Bending stiffness about the first section axis.
    pub ei_1: f64,
    /// Bending stiffness about the second section axis.
    pub ei_2: f64,
    /// Mass per unit length.
    pub m: f64,
    /// Polar rotary inertia per unit length.
    pub m_11: f64,
    /// Rotary inertia per unit length about the first section axis.
    pub m_22: f64,
    /// Rotary inertia per unit length about the second section axis.
    pub m_33: f64,
}

/// Material and geometry of a cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    /// Young's modulus `E`.
    pub young_modulus: f64,
    /// Poisson's ratio `ν`.
    pub poisson_ratio: f64,
    /// Area `A`.
    pub area: f64,
    /// Shear area along the first section axis.
    pub shear_area_1: f64,
    /// Shear area along the second section axis.
    pub shear_area_2: f64,
    /// Torsion constant `J`.
    pub torsion_constant: f64,
    /// Second moment of area about the first section axis.
    pub inertia_1: f64,
    /// Second moment of area about the second section axis.
    pub inertia_2: f64,
    /// Mass density `ρ`.
    pub density: f64,
}

impl CrossSection {
    /// Solid square section of side `b`, with shear areas equal to the area.
    #[must_use]
    pub fn square(side: f64, young_modulus: f64, poisson_ratio: f64, density: f64) -> Self {
        let area = side * side;
        let inertia = side.powi(4) / 12.0;
        Self {
            young_modulus,
            poisson_ratio,
            area,
            shear_area_1: area,
            shear_area_2: area,
            torsion_constant: 2.0 * inertia,
            inertia_1: inertia,
            inertia_2: inertia,
            density,
        }
    }
}

/// Sectional properties and loads of a beam.
#[derive(Clone)]
pub struct BeamProperties {
    stiffness: Matrix6<f64>,
    mass: Matrix6<f64>,
    distributed_load: Option<DistributedLoadFunction>,
    distributed_follower_load: Option<DistributedLoadFunction>,
    gravity: Option<Vector3<f64>>,
    quadrature: GaussRule,
}

impl fmt::Debug for BeamProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeamProperties")
            .field("stiffness", &self.stiffness.diagonal())
            .field("mass", &self.mass.diagonal())
            .field("distributed_load", &self.distributed_load.is_some())
            .field("distributed_follower_load", &self.distributed_follower_load.is_some())
            .field("gravity", &self.gravity)
            .field("quadrature", &self.quadrature)
            .finish()
    }
}

impl BeamProperties {
    /// Properties from 6×6 sectional stiffness and mass matrices, ordered
    /// as (axial, shear 1, shear 2, torsion, bending 1, bending 2).
    #[must_use]
    pub fn new(stiffness: Matrix6<f64>, mass: Matrix6<f64>) -> Self {
        Self {
            stiffness,
            mass,
            distributed_load: None,
            distributed_follower_load: None,
            gravity: None,
            quadrature: GaussRule::Two,
        }
    }

    /// Properties from stiffness and mass resultants.
    #[must_use]
    pub fn from_resultants(r: &SectionResultants) -> Self {
        Self::new(
            Matrix6::from_diagonal(&Vector6::new(r.ea, r.ga_1, r.ga_2, r.gj, r.ei_1, r.ei_2)),
            Matrix6::from_diagonal(&Vector6::new(r.m, r.m, r.m, r.m_11, r.m_22, r.m_33)),
        )
    }

    /// Properties from material and section geometry, with
    /// `G = E / (2 (1 + ν))`.
    #[must_use]
    pub fn from_cross_section(c: &CrossSection) -> Self {
        let e = c.young_modulus;
        let g = e / (2.0 * (1.0 + c.poisson_ratio));
        Self::new(
            Matrix6::from_diagonal(&Vector6::new(
                e * c.area,
                g * c.shear_area_1,
                g * c.shear_area_2,
                g * c.torsion_constant,
                e * c.inertia_1,
                e * c.inertia_2,
            )),
            Matrix6::from_diagonal(&Vector6::new(
                c.area,
                c.area,
                c.area,
                c.torsion_constant,
                c.inertia_1,
                c.inertia_2,
            )) * c.density,
        )
    }

    /// Add a distributed load `f(s, t)` expressed in the global frame.
    #[must_use]
    pub fn with_distributed_load(
        mut self,
        load: impl Fn(f64, f64) -> Vector6<f64> + Send + Sync + 'static,
    ) -> Self {
        self.distributed_load = Some(Arc::new(load));
        self
    }

    /// Add a distributed load `f(s, t)` expressed in the section frame.
    #[must_use]
    pub fn with_distributed_follower_load(
        mut self,
        load: impl Fn(f64, f64) -> Vector6<f64> + Send + Sync + 'static,
    ) -> Self {
        self.distributed_follower_load = Some(Arc::new(load));
        self
    }

    /// Add the weight of the beam under the acceleration of gravity `g`.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = Some(gravity);
        self
    }

    /// Select the quadrature rule for loads and inertia.
    #[must_use]
    pub fn with_quadrature(mut self, rule: GaussRule) -> Self {
        self.quadrature = rule;
        self
    }

    /// Sectional stiffness matrix.
    #[must_use]
    pub fn stiffness(&self) -> &Matrix6<f64> {
        &self.stiffness
    }

    /// Sectional mass matrix.
    #[must_use]
    pub fn mass(&self) -> &Matrix6<f64> {
        &self.mass
    }

    /// Check that stiffness is positive and mass non-negative.
    pub fn validate(&self) -> Result<()> {
        if self.stiffness.diagonal().iter().any(|k| !k.is_finite() || *k <= 0.0) {
            return Err(SimError::invalid_config(
                "beam stiffness must be positive and finite",
            ));
        }
        if self.mass.iter().any(|m| !m.is_finite())
            || self.mass.diagonal().iter().any(|m| *m < 0.0)
        {
            return Err(SimError::invalid_config(
                "beam mass must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Two-node beam element.
#[derive(Debug, Clone)]
pub struct BeamElement {
    props: Arc<BeamProperties>,
    d0: Vector6<f64>,
    length: f64,
}

impl BeamElement {
    pub(crate) fn new(props: Arc<BeamProperties>) -> Self {
        Self {
            props,
            d0: Vector6::zeros(),
            length: 0.0,
        }
    }

    /// Properties of the beam.
    #[must_use]
    pub fn properties(&self) -> &BeamProperties {
        &self.props
    }

    /// Reference length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Relative motion parameters of the reference configuration.
    #[must_use]
    pub fn reference_parameters(&self) -> &Vector6<f64> {
        &self.d0
    }

    pub(crate) fn initialize(&mut self, nodes: &NodeStore, conn: &Connectivity) -> Result<()> {
        let ha = *nodes.frame_state(conn.motion(0))?.frame_ref();
        let hb = *nodes.frame_state(conn.motion(1))?.frame_ref();
        self.d0 = (ha.inverse() * hb).parameters();
        self.length = self.d0.fixed_rows::<3>(0).norm();
        if self.length <= 0.0 {
            return Err(SimError::invalid_topology(
                "beam",
                "end nodes share the same reference position",
            ));
        }
        Ok(())
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        loc_dof: &[usize],
        res: &mut nalgebra::DVector<f64>,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        let props = &*self.props;
        let ha = *ctx.frame(conn.motion(0))?;
        let hb = *ctx.frame(conn.motion(1))?;
        let d = (ha.inverse() * hb).parameters();

        let tinv_b = inverse_tangent_operator(&d)?;
        let mut p = Matrix6x12::zeros();
        p.fixed_view_mut::<6, 6>(0, 0)
            .copy_from(&(-inverse_tangent_operator(&(-d))?));
        p.fixed_view_mut::<6, 6>(0, 6).copy_from(&tinv_b);

        // Elastic forces and their exact tangent.
        let k_over_l = props.stiffness / self.length;
        let strain_force = k_over_l * (d - self.d0);
        let pt = p.transpose();
        let mut r: Vector12 = pt * strain_force;
        let mut kt: Matrix12 = pt * k_over_l * p;
        {
            let mut rows_a = kt.fixed_view_mut::<6, 12>(0, 0);
            rows_a += derivative_inverse_transposed_tangent_operator(&(-d), &strain_force)? * p;
        }
        {
            let mut rows_b = kt.fixed_view_mut::<6, 12>(6, 0);
            rows_b += derivative_inverse_transposed_tangent_operator(&d, &strain_force)? * p;
        }

        let dynamic = ctx.analysis.is_dynamic();
        let (v, v_dot) = if dynamic {
            (
                gather::<12>(ctx.velocity, loc_dof),
                gather::<12>(ctx.acceleration, loc_dof),
            )
        } else {
            (Vector12::zeros(), Vector12::zeros())
        };
        let mut ct = Matrix12::zeros();
        let mut mt = Matrix12::zeros();

        for point in props.quadrature.points() {
            let s = 0.5 * (point.x + 1.0);
            let half_wl = 0.5 * point.w * self.length;

            let t_star = s * tangent_operator(&(s * d))? * tinv_b;
            let mut q = Matrix6x12::zeros();
            q.fixed_view_mut::<6, 6>(0, 0)
                .copy_from(&(Matrix6::identity() - t_star));
            q.fixed_view_mut::<6, 6>(0, 6).copy_from(&t_star);

            let mut load = Vector6::zeros();
            let mut loaded = false;
            if let Some(f) = &props.distributed_load {
                load += f(s, ctx.time);
                loaded = true;
            }
            if let Some(g) = &props.gravity {
                let weight = g * props.mass[(0, 0)];
                let mut force = load.fixed_rows_mut::<3>(0);
                force += weight;
                loaded = true;
            }
            if loaded {
                // Global loads are pulled back to the section frame.
                let rt = (ha * Frame::from_parameters(&(s * d))?)
                    .rotation_matrix()
                    .transpose();
                let f = rt * load.fixed_rows::<3>(0);
                let m = rt * load.fixed_rows::<3>(3);
                load = Vector6::new(f.x, f.y, f.z, m.x, m.y, m.z);

                let q_rot = q.fixed_rows::<3>(3);
                let mut dload = Matrix6x12::zeros();
                dload
                    .fixed_rows_mut::<3>(0)
                    .copy_from(&(tilde(&(half_wl * f)) * q_rot));
                dload
                    .fixed_rows_mut::<3>(3)
                    .copy_from(&(tilde(&(half_wl * m)) * q_rot));
                kt -= q.transpose() * dload;
            }
            if let Some(f) = &props.distributed_follower_load {
                load += f(s, ctx.time);
                loaded = true;
            }
            if loaded {
                r -= q.transpose() * (half_wl * load);
            }

            if dynamic {
                let m_gp = props.mass * half_wl;
                let v_gp = q * v;
                let mv = m_gp * v_gp;
                let gyroscopic = tilde6(&v_gp).transpose();
                r -= q.transpose() * (gyroscopic * mv);
                ct -= q.transpose() * (gyroscopic * m_gp + breve6(&mv)) * q;
                let qtm = q.transpose() * m_gp;
                r += qtm * (q * v_dot);
                mt += qtm * q;
            }
        }

        res.copy_from(&r);
        tangents.stiffness = Some(to_dynamic(&kt));
        if dynamic {
            tangents.damping = Some(to_dynamic(&ct));
            tangents.mass = Some(to_dynamic(&mt));
        }
        Ok(())
    }
}

/// Split the beam between `start` and `end` into `segments` elements.
///
/// Intermediate nodes are placed at `H_start * H((i/n) p(H_start⁻¹ H_end))`,
/// i.e. at equal fractions of the relative motion parameters of the
/// reference frames. Returns the created elements in order from `start`.
pub fn discretize_beam(
    model: &mut Model,
    start: NodeId,
    end: NodeId,
    segments: usize,
    props: BeamProperties,
) -> Result<Vec<ElementId>> {
    if segments == 0 {
        return Err(SimError::invalid_config(
            "a beam needs at least one segment",
        ));
    }
    let frame_start = *model.nodes().frame_state(start)?.frame_ref();
    let frame_end = *model.nodes().frame_state(end)?.frame_ref();
    let relative = (frame_start.inverse() * frame_end).parameters();

    let props = Arc::new(props);
    let mut elements = Vec::with_capacity(segments);
    let mut previous = start;
    for i in 1..=segments {
        let next = if i == segments {
            end
        } else {
            let fraction = i as f64 / segments as f64;
            let frame = frame_start * Frame::from_parameters(&(relative * fraction))?;
            model.add_node(Node::frame(frame))?
        };
        let beam = ElementProperties::Beam(Arc::clone(&props));
        elements.push(model.add_element(beam, &[previous, next])?);
        previous = next;
    }
    Ok(elements)
}

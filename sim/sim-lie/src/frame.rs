//! Rigid frames: SE(3) elements as (position, orientation).

use std::ops::Mul;

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::quaternion::{half_angle_cosine, UnitQuat};
use crate::skew::{tilde, tilde_x_tilde};
use crate::Result;

/// A rigid transformation: position in R³ and a unit quaternion orientation.
///
/// Frames compose as `(x_a, q_a) * (x_b, q_b) = (x_a + q_a x_b, q_a q_b)`,
/// i.e. the right operand is expressed in the frame of the left operand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Position of the frame origin.
    pub position: Vector3<f64>,
    /// Orientation of the frame axes.
    pub orientation: UnitQuat,
}

impl Frame {
    /// Create a frame from position and orientation.
    #[must_use]
    pub fn new(position: Vector3<f64>, orientation: UnitQuat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The identity frame.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Frame at `position` with identity orientation.
    #[must_use]
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuat::identity())
    }

    /// Inverse frame.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let orientation = self.orientation.inverse();
        Self {
            position: orientation.rotate(&(-self.position)),
            orientation,
        }
    }

    /// Map a point expressed in this frame to the parent frame.
    #[must_use]
    pub fn transform_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.orientation.rotate(local)
    }

    /// Rotation matrix of the orientation.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.orientation.rotation_matrix()
    }

    /// Adjoint representation `[[R, R x~], [0, R]]`.
    #[must_use]
    pub fn adjoint(&self) -> Matrix6<f64> {
        let r = self.rotation_matrix();
        let mut out = Matrix6::zeros();
        out.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        out.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
        out.fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(r * tilde(&self.position)));
        out
    }

    /// Inverse adjoint `[[Rᵀ, -x~ Rᵀ], [0, Rᵀ]]`, equal to the adjoint of
    /// the inverse frame.
    #[must_use]
    pub fn inverse_adjoint(&self) -> Matrix6<f64> {
        let rt = self.rotation_matrix().transpose();
        let mut out = Matrix6::zeros();
        out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
        out.fixed_view_mut::<3, 3>(3, 3).copy_from(&rt);
        out.fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(-tilde(&self.position) * rt));
        out
    }

    /// Frame reached from the identity by the parameters `p = [p_u; p_w]`.
    ///
    /// The orientation uses the half-angle parametrization of `p_w`. The
    /// position is `T_u(p_w) p_u` with
    /// `T_u = (I + p~/2 p~/2) / e0 + p~/2`.
    pub fn from_parameters(p: &Vector6<f64>) -> Result<Self> {
        let pu = p.fixed_rows::<3>(0).into_owned();
        let pw = p.fixed_rows::<3>(3).into_owned();
        let e0 = half_angle_cosine(&pw)?;
        let half = 0.5 * pw;
        let coupling = (Matrix3::identity() + tilde_x_tilde(&half)) / e0 + tilde(&half);
        Ok(Self {
            position: coupling * pu,
            orientation: UnitQuat::from_parameters(&pw)?,
        })
    }

    /// Parameters of this frame: `p_u = (e0 I - e~) x`, `p_w = 2 e`.
    #[must_use]
    pub fn parameters(&self) -> Vector6<f64> {
        let e0 = self.orientation.scalar();
        let e = self.orientation.vector();
        let pu = e0 * self.position - e.cross(&self.position);
        let pw = self.orientation.parameters();
        Vector6::new(pu.x, pu.y, pu.z, pw.x, pw.y, pw.z)
    }
}

impl Mul for Frame {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            position: self.position + self.orientation.rotate(&rhs.position),
            orientation: self.orientation * rhs.orientation,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_frame() -> Frame {
        Frame::new(
            Vector3::new(0.5, -1.2, 2.0),
            UnitQuat::from_axis_angle(&Vector3::new(0.3, 1.0, -0.4), 0.8),
        )
    }

    #[test]
    fn test_inverse() {
        let f = sample_frame();
        let id = f * f.inverse();
        assert_relative_eq!(id.position, Vector3::zeros(), epsilon = 1e-14);
        assert_relative_eq!(id.rotation_matrix(), Matrix3::identity(), epsilon = 1e-14);
        let id = f.inverse() * f;
        assert_relative_eq!(id.position, Vector3::zeros(), epsilon = 1e-14);
    }

    #[test]
    fn test_transform_point_composes() {
        let a = sample_frame();
        let b = Frame::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuat::from_axis_angle(&Vector3::z(), 0.3),
        );
        let x = Vector3::new(0.1, 0.2, 0.3);
        assert_relative_eq!(
            (a * b).transform_point(&x),
            a.transform_point(&b.transform_point(&x)),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_inverse_adjoint_is_adjoint_inverse() {
        let f = sample_frame();
        assert_relative_eq!(
            f.adjoint() * f.inverse_adjoint(),
            Matrix6::identity(),
            epsilon = 1e-13
        );
        assert_relative_eq!(f.inverse_adjoint(), f.inverse().adjoint(), epsilon = 1e-13);
    }

    #[test]
    fn test_parameters_round_trip() {
        let f = sample_frame();
        let back = Frame::from_parameters(&f.parameters()).unwrap();
        assert_relative_eq!(back.position, f.position, epsilon = 1e-13);
        assert_relative_eq!(back.rotation_matrix(), f.rotation_matrix(), epsilon = 1e-13);
    }

    #[test]
    fn test_pure_translation_parameters() {
        let p = Vector6::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0);
        let f = Frame::from_parameters(&p).unwrap();
        assert_relative_eq!(f.position, Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-15);
        assert_relative_eq!(f.parameters(), p, epsilon = 1e-15);
    }

    #[test]
    fn test_from_parameters_rejects_large_rotation() {
        let p = Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.5);
        assert!(Frame::from_parameters(&p).is_err());
    }
}

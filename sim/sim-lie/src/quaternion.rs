//! Unit quaternions in scalar/vector form.

use std::ops::Mul;

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::skew::{tilde, tilde_x_tilde};
use crate::{LieError, Result};

/// Smallest admissible scalar part `e0` of a quaternion built from rotation
/// parameters. Below it the tangent operators divide by a vanishing number.
pub const MIN_HALF_ANGLE_COSINE: f64 = 1e-8;

/// Scalar part `e0 = sqrt(1 - |p|²/4)` of the quaternion with rotation
/// parameters `p`.
///
/// Fails with [`LieError::RotationOutOfRange`] when `e0` would fall below
/// [`MIN_HALF_ANGLE_COSINE`] (rotation of π or more).
pub fn half_angle_cosine(rotation: &Vector3<f64>) -> Result<f64> {
    let radicand = 1.0 - 0.25 * rotation.norm_squared();
    if !radicand.is_finite() || radicand <= MIN_HALF_ANGLE_COSINE * MIN_HALF_ANGLE_COSINE {
        return Err(LieError::RotationOutOfRange {
            magnitude: rotation.norm(),
        });
    }
    Ok(radicand.sqrt())
}

/// Unit quaternion `(e0, e)` representing a rotation.
///
/// The rotation of angle `θ` about the unit axis `n` is
/// `e0 = cos(θ/2)`, `e = sin(θ/2) n`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitQuat {
    e0: f64,
    e: Vector3<f64>,
}

impl Default for UnitQuat {
    fn default() -> Self {
        Self::identity()
    }
}

impl UnitQuat {
    /// The identity rotation.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            e0: 1.0,
            e: Vector3::zeros(),
        }
    }

    /// Build from rotation parameters `p = 2 e`.
    pub fn from_parameters(rotation: &Vector3<f64>) -> Result<Self> {
        Ok(Self {
            e0: half_angle_cosine(rotation)?,
            e: 0.5 * rotation,
        })
    }

    /// Rotation of `angle` radians about `axis` (normalized internally).
    ///
    /// A zero axis yields the identity.
    #[must_use]
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let norm = axis.norm();
        if norm == 0.0 {
            return Self::identity();
        }
        let half = 0.5 * angle;
        Self {
            e0: half.cos(),
            e: axis * (half.sin() / norm),
        }
    }

    /// Fit the orientation whose rotation matrix has the given triad as
    /// columns.
    ///
    /// `v1` fixes the first axis. `v2` is orthogonalized against it. When
    /// `v3` is `None` it is completed as `v1 × v2`. The quaternion is
    /// extracted from the largest of the four candidate pivots, so the fit is
    /// well conditioned for every orientation.
    pub fn from_triad(
        v1: &Vector3<f64>,
        v2: &Vector3<f64>,
        v3: Option<&Vector3<f64>>,
    ) -> Result<Self> {
        let n1 = v1.norm();
        if n1 == 0.0 {
            return Err(LieError::degenerate_triad("first vector is zero"));
        }
        let a1 = v1 / n1;
        let orthogonal = v2 - a1 * a1.dot(v2);
        let n2 = orthogonal.norm();
        if n2 <= 1e-12 * v2.norm().max(1.0) {
            return Err(LieError::degenerate_triad(
                "second vector is parallel to the first",
            ));
        }
        let a2 = orthogonal / n2;
        let a3 = match v3 {
            Some(v3) => {
                let n3 = v3.norm();
                if n3 == 0.0 {
                    return Err(LieError::degenerate_triad("third vector is zero"));
                }
                v3 / n3
            }
            None => a1.cross(&a2),
        };
        Ok(Self::from_rotation_matrix(&Matrix3::from_columns(&[a1, a2, a3])))
    }

    /// Extract the quaternion of a rotation matrix.
    ///
    /// Uses the four-way branch on the largest of `trace`, `R00`, `R11`,
    /// `R22`.
    #[must_use]
    pub fn from_rotation_matrix(r: &Matrix3<f64>) -> Self {
        let trace = r.trace();
        let pivots = [trace, r[(0, 0)], r[(1, 1)], r[(2, 2)]];
        let mut largest = 0;
        for (i, value) in pivots.iter().enumerate().skip(1) {
            if *value > pivots[largest] {
                largest = i;
            }
        }

        let (e0, e) = match largest {
            0 => {
                let s = 0.5 * (1.0 + trace).sqrt();
                let f = 0.25 / s;
                (
                    s,
                    Vector3::new(
                        f * (r[(2, 1)] - r[(1, 2)]),
                        f * (r[(0, 2)] - r[(2, 0)]),
                        f * (r[(1, 0)] - r[(0, 1)]),
                    ),
                )
            }
            1 => {
                let s = 0.5 * (1.0 + 2.0 * r[(0, 0)] - trace).sqrt();
                let f = 0.25 / s;
                (
                    f * (r[(2, 1)] - r[(1, 2)]),
                    Vector3::new(s, f * (r[(1, 0)] + r[(0, 1)]), f * (r[(2, 0)] + r[(0, 2)])),
                )
            }
            2 => {
                let s = 0.5 * (1.0 + 2.0 * r[(1, 1)] - trace).sqrt();
                let f = 0.25 / s;
                (
                    f * (r[(0, 2)] - r[(2, 0)]),
                    Vector3::new(f * (r[(1, 0)] + r[(0, 1)]), s, f * (r[(2, 1)] + r[(1, 2)])),
                )
            }
            _ => {
                let s = 0.5 * (1.0 + 2.0 * r[(2, 2)] - trace).sqrt();
                let f = 0.25 / s;
                (
                    f * (r[(1, 0)] - r[(0, 1)]),
                    Vector3::new(f * (r[(2, 0)] + r[(0, 2)]), f * (r[(2, 1)] + r[(1, 2)]), s),
                )
            }
        };
        Self { e0, e }
    }

    /// Scalar part `e0`.
    #[must_use]
    pub fn scalar(&self) -> f64 {
        self.e0
    }

    /// Vector part `e`.
    #[must_use]
    pub fn vector(&self) -> &Vector3<f64> {
        &self.e
    }

    /// Rotation parameters `p = 2 e`.
    #[must_use]
    pub fn parameters(&self) -> Vector3<f64> {
        2.0 * self.e
    }

    /// Inverse rotation `(e0, -e)`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            e0: self.e0,
            e: -self.e,
        }
    }

    /// Rotation matrix `R = I + 2 (e0 e~ + e~ e~)`.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        Matrix3::identity() + 2.0 * (self.e0 * tilde(&self.e) + tilde_x_tilde(&self.e))
    }

    /// Rotate a vector without forming the rotation matrix.
    #[must_use]
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        let t = 2.0 * self.e.cross(v);
        v + self.e0 * t + self.e.cross(&t)
    }

    /// Rotate a vector by the inverse rotation.
    #[must_use]
    pub fn inverse_rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.inverse().rotate(v)
    }

    /// Rotation angle in `[0, 2π)`.
    #[must_use]
    pub fn angle(&self) -> f64 {
        2.0 * self.e.norm().atan2(self.e0)
    }

    /// Convert to an `nalgebra` unit quaternion.
    #[must_use]
    pub fn to_unit_quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::new_unchecked(Quaternion::new(self.e0, self.e.x, self.e.y, self.e.z))
    }

    /// Convert from an `nalgebra` unit quaternion.
    #[must_use]
    pub fn from_unit_quaternion(q: &UnitQuaternion<f64>) -> Self {
        Self {
            e0: q.w,
            e: Vector3::new(q.i, q.j, q.k),
        }
    }

    /// The four components `[e0, e1, e2, e3]`.
    #[must_use]
    pub fn coordinates(&self) -> [f64; 4] {
        [self.e0, self.e.x, self.e.y, self.e.z]
    }
}

impl Mul for UnitQuat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            e0: self.e0 * rhs.e0 - self.e.dot(&rhs.e),
            e: self.e0 * rhs.e + rhs.e0 * self.e + self.e.cross(&rhs.e),
        }
    }
}

//! Skew-symmetric operators on R³ and their 6×6 counterparts on twists.
//!
//! For a 6-vector `x = [u; w]` (translation part `u`, rotation part `w`):
//!
//! ```text
//! tilde6(x) = | w~  u~ |        breve6(x) = | 0   u~ |
//!             | 0   w~ |                    | u~  w~ |
//! ```
//!
//! `tilde6(v)` is the adjoint action of the twist `v` on another twist and
//! `breve6(f)` its dual, satisfying `tilde6(a)ᵀ b = breve6(b) a`.

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

/// Skew-symmetric matrix of `x`, so that `tilde(x) * y = x × y`.
#[must_use]
pub fn tilde(x: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -x.z, x.y, //
        x.z, 0.0, -x.x, //
        -x.y, x.x, 0.0,
    )
}

/// Product `tilde(x) * tilde(x)` computed directly as `x xᵀ - |x|² I`.
#[must_use]
pub fn tilde_x_tilde(x: &Vector3<f64>) -> Matrix3<f64> {
    x * x.transpose() - Matrix3::identity() * x.norm_squared()
}

/// 6×6 twist adjoint operator.
#[must_use]
pub fn tilde6(x: &Vector6<f64>) -> Matrix6<f64> {
    let u = tilde(&x.fixed_rows::<3>(0).into_owned());
    let w = tilde(&x.fixed_rows::<3>(3).into_owned());
    let mut out = Matrix6::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&w);
    out.fixed_view_mut::<3, 3>(3, 3).copy_from(&w);
    out.fixed_view_mut::<3, 3>(0, 3).copy_from(&u);
    out
}

/// 6×6 dual (co-adjoint) operator.
#[must_use]
pub fn breve6(x: &Vector6<f64>) -> Matrix6<f64> {
    let u = tilde(&x.fixed_rows::<3>(0).into_owned());
    let w = tilde(&x.fixed_rows::<3>(3).into_owned());
    let mut out = Matrix6::zeros();
    out.fixed_view_mut::<3, 3>(0, 3).copy_from(&u);
    out.fixed_view_mut::<3, 3>(3, 0).copy_from(&u);
    out.fixed_view_mut::<3, 3>(3, 3).copy_from(&w);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tilde_is_cross_product() {
        let a = Vector3::new(1.0, -2.0, 0.5);
        let b = Vector3::new(0.3, 0.7, -1.1);
        assert_relative_eq!(tilde(&a) * b, a.cross(&b), epsilon = 1e-14);
        assert_relative_eq!(tilde(&a).transpose(), -tilde(&a), epsilon = 1e-14);
    }

    #[test]
    fn test_tilde_x_tilde() {
        let a = Vector3::new(0.4, 1.5, -0.9);
        assert_relative_eq!(tilde_x_tilde(&a), tilde(&a) * tilde(&a), epsilon = 1e-14);
    }

    #[test]
    fn test_tilde6_blocks() {
        let x = Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let t = tilde6(&x);
        let w = tilde(&Vector3::new(4.0, 5.0, 6.0));
        let u = tilde(&Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(t.fixed_view::<3, 3>(0, 0).into_owned(), w);
        assert_relative_eq!(t.fixed_view::<3, 3>(3, 3).into_owned(), w);
        assert_relative_eq!(t.fixed_view::<3, 3>(0, 3).into_owned(), u);
        assert_relative_eq!(t.fixed_view::<3, 3>(3, 0).into_owned(), Matrix3::zeros());
    }

    #[test]
    fn test_breve6_is_dual_of_tilde6() {
        let a = Vector6::new(0.1, -0.4, 0.7, 1.2, 0.3, -0.8);
        let b = Vector6::new(-1.0, 0.5, 0.25, 0.6, -0.2, 0.9);
        assert_relative_eq!(tilde6(&a).transpose() * b, breve6(&b) * a, epsilon = 1e-13);
        assert_relative_eq!(breve6(&b), breve6(&b).transpose(), epsilon = 1e-14);
    }
}

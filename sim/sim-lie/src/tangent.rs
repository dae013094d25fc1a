//! Tangent operators of the SE(3) exponential map in half-angle parameters.
//!
//! For a frame `H(p)` built from parameters `p` (see
//! [`Frame::from_parameters`](crate::Frame::from_parameters)):
//!
//! ```text
//! H(p + dp)    ≈ H(p) * H(T(p) dp)
//! p(H(p) * H(δ)) ≈ p + T⁻¹(p) δ
//! ```
//!
//! Both operators are block upper-triangular with equal diagonal blocks.

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::quaternion::half_angle_cosine;
use crate::skew::{tilde, tilde_x_tilde};
use crate::Result;

struct Split {
    pu: Vector3<f64>,
    pw: Vector3<f64>,
    e0: f64,
}

fn split(p: &Vector6<f64>) -> Result<Split> {
    let pu = p.fixed_rows::<3>(0).into_owned();
    let pw = p.fixed_rows::<3>(3).into_owned();
    let e0 = half_angle_cosine(&pw)?;
    Ok(Split { pu, pw, e0 })
}

fn block_upper(diagonal: &Matrix3<f64>, coupling: &Matrix3<f64>) -> Matrix6<f64> {
    let mut out = Matrix6::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(diagonal);
    out.fixed_view_mut::<3, 3>(3, 3).copy_from(diagonal);
    out.fixed_view_mut::<3, 3>(0, 3).copy_from(coupling);
    out
}

/// Diagonal and coupling blocks of `T⁻¹(p)`.
fn inverse_blocks(s: &Split) -> (Matrix3<f64>, Matrix3<f64>) {
    let rho = s.pu.dot(&s.pw);
    let diagonal = Matrix3::identity() * s.e0 + tilde(&(0.5 * s.pw));
    let coupling = Matrix3::identity() * (-0.25 * rho / s.e0) + tilde(&(0.5 * s.pu));
    (diagonal, coupling)
}

/// Inverse tangent operator `T⁻¹(p)`.
///
/// Diagonal blocks `e0 I + p_w~/2`, coupling block
/// `-(p_u·p_w)/(4 e0) I + p_u~/2`.
pub fn inverse_tangent_operator(p: &Vector6<f64>) -> Result<Matrix6<f64>> {
    let s = split(p)?;
    let (diagonal, coupling) = inverse_blocks(&s);
    Ok(block_upper(&diagonal, &coupling))
}

/// Tangent operator `T(p)`, the exact inverse of [`inverse_tangent_operator`].
///
/// Diagonal blocks `D = (I + h~ h~)/e0 - h~` with `h = p_w/2`, coupling block
/// `-D U D` where `U` is the coupling block of `T⁻¹(p)`.
pub fn tangent_operator(p: &Vector6<f64>) -> Result<Matrix6<f64>> {
    let s = split(p)?;
    let half = 0.5 * s.pw;
    let diagonal = (Matrix3::identity() + tilde_x_tilde(&half)) / s.e0 - tilde(&half);
    let (_, inverse_coupling) = inverse_blocks(&s);
    let coupling = -(diagonal * inverse_coupling * diagonal);
    Ok(block_upper(&diagonal, &coupling))
}

/// Derivative with respect to `p` of `T⁻¹(p)ᵀ f` for a fixed 6-vector `f`.
///
/// Used for the geometric stiffness of elements whose internal forces are
/// mapped by the transposed inverse tangent operator.
pub fn derivative_inverse_transposed_tangent_operator(
    p: &Vector6<f64>,
    f: &Vector6<f64>,
) -> Result<Matrix6<f64>> {
    let s = split(p)?;
    let fu = f.fixed_rows::<3>(0).into_owned();
    let fw = f.fixed_rows::<3>(3).into_owned();
    let rho = s.pu.dot(&s.pw);
    let c = 0.25 / s.e0;

    let cross = tilde(&(0.5 * fu)) - c * fu * s.pw.transpose();
    let rotation = tilde(&(0.5 * fw))
        - c * fw * s.pw.transpose()
        - (rho / (16.0 * s.e0.powi(3))) * fu * s.pw.transpose()
        - c * fu * s.pu.transpose();

    let mut out = Matrix6::zeros();
    out.fixed_view_mut::<3, 3>(0, 3).copy_from(&cross);
    out.fixed_view_mut::<3, 3>(3, 0).copy_from(&cross);
    out.fixed_view_mut::<3, 3>(3, 3).copy_from(&rotation);
    Ok(out)
}

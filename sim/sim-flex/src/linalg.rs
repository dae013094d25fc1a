//! Linear solve of the iteration matrix.
//!
//! The assembled sparse matrix is expanded to dense storage and solved by
//! nalgebra's LU factorization with partial pivoting. The iteration matrix of a
//! constrained system is an indefinite saddle-point matrix, so Cholesky is
//! not applicable.

use nalgebra::DVector;
use nalgebra_sparse::convert::serial::convert_csc_dense;
use nalgebra_sparse::CscMatrix;

/// Pivots below this magnitude are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-30;

/// The factorization met a zero pivot in `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SingularPivot {
    pub column: usize,
}

/// Solve `matrix · x = rhs`.
///
/// A pivot of `U` that is not finite or smaller than [`PIVOT_TOLERANCE`]
/// marks the matrix as singular. Saddle-point pivots scale like the inverse
/// of the stiffness, so the test is absolute.
pub(crate) fn solve(
    matrix: &CscMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<DVector<f64>, SingularPivot> {
    let lu = convert_csc_dense(matrix).lu();
    let pivots = lu.u().diagonal();
    if let Some(column) = pivots
        .iter()
        .position(|p| !p.is_finite() || p.abs() < PIVOT_TOLERANCE)
    {
        return Err(SingularPivot { column });
    }
    lu.solve(rhs).ok_or(SingularPivot {
        column: pivots.len().saturating_sub(1),
    })
}

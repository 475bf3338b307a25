//! Dense linear algebra helpers on faer matrices
//!
//! Products go through faer's operators, determinants through its LU
//! decomposition and least squares through a column-pivot-free QR.

use crate::{StatsError, StatsResult};
use faer::prelude::SpSolverLstsq;
use faer::{Col, Mat};

/// Relative size below which a diagonal entry of R marks a rank-deficient design
const RANK_TOL: f64 = 1e-10;

/// Sample covariance matrix (n - 1 denominator) of equal-length columns
pub fn covariance(columns: &[Vec<f64>]) -> Mat<f64> {
    let k = columns.len();
    let n = columns.first().map_or(0, Vec::len);
    let means: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>() / n as f64).collect();
    // centred data, one column per variable
    let centred = Mat::from_fn(n, k, |r, j| columns[j][r] - means[j]);
    let scale = 1.0 / (n as f64 - 1.0);
    let cross = centred.transpose() * &centred;
    Mat::from_fn(k, k, |i, j| cross[(i, j)] * scale)
}

/// Orthonormal Helmert contrasts, `(k - 1) x k`
pub fn helmert_contrasts(k: usize) -> Mat<f64> {
    Mat::from_fn(k.saturating_sub(1), k, |i, j| {
        let scale = (((i + 1) * (i + 2)) as f64).sqrt();
        if j <= i {
            1.0 / scale
        } else if j == i + 1 {
            -((i + 1) as f64) / scale
        } else {
            0.0
        }
    })
}

/// `C S C^T`
pub fn congruence(c: &Mat<f64>, s: &Mat<f64>) -> Mat<f64> {
    c * s * c.transpose()
}

pub fn trace(m: &Mat<f64>) -> f64 {
    (0..m.nrows().min(m.ncols())).map(|i| m[(i, i)]).sum()
}

/// Product `m * m`
pub fn square(m: &Mat<f64>) -> Mat<f64> {
    m * m
}

pub fn determinant(m: &Mat<f64>) -> f64 {
    m.determinant()
}

/// Residual sum of squares of the least squares fit `y ~ x`
///
/// Solved by QR. A design whose R factor has a (relatively) zero diagonal
/// entry is rank deficient and yields [`StatsError::SingularMatrix`].
pub fn residual_sum_of_squares(x: &Mat<f64>, y: &[f64]) -> StatsResult<f64> {
    if x.nrows() != y.len() {
        return Err(StatsError::InvalidInput(format!(
            "design has {} rows but the response has {} values",
            x.nrows(),
            y.len()
        )));
    }

    let qr = x.qr();
    let r = qr.compute_thin_r();
    let diagonal: Vec<f64> = (0..r.nrows().min(r.ncols())).map(|i| r[(i, i)].abs()).collect();
    let largest = diagonal.iter().copied().fold(0.0_f64, f64::max);
    if diagonal.len() < x.ncols() || diagonal.iter().any(|d| *d <= RANK_TOL * largest) {
        return Err(StatsError::SingularMatrix);
    }

    let response = Col::from_fn(y.len(), |i| y[i]);
    let beta = qr.solve_lstsq(&response);
    let fitted = x * &beta;
    let residual = &response - &fitted;
    Ok(residual.squared_norm_l2())
}

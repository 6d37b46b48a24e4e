//! Linear least squares.
//!
//! Once the orthogonal-basis roots are fixed, a lambda model is linear in its
//! coefficients, so every fit reduces to:
//!
//! ```text
//! minimize Σ (y_i - a_i^T λ)^2
//! ```
//!
//! Implementation choices:
//! - SVD solve, so tall design matrices (more rows than columns) are handled
//!   directly. (Nalgebra's `QR::solve` is intended for square systems.)
//! - The same routine solves the square Newton steps of the basis root solver.
//! - Parameter dimension is tiny (at most a handful of lambdas), so SVD cost is
//!   irrelevant next to robustness.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{AppError, Result};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Least-squares solution together with its residual statistics.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub beta: DVector<f64>,
    /// Sum of squared residuals.
    pub sse: f64,
    /// `(XᵀX)⁻¹ · SSE / (n - p)`.
    pub covariance: DMatrix<f64>,
}

/// Solve `x β ≈ y` and estimate the parameter covariance.
///
/// The covariance uses the residual variance as the noise scale (observation
/// errors are not assumed known), matching the usual curve-fitting convention.
/// Requires `n > p`.
pub fn least_squares_with_covariance(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LeastSquares> {
    let (n, p) = x.shape();
    if n <= p {
        return Err(AppError::InsufficientData {
            observations: n,
            coefficients: p,
        });
    }

    // Orthogonal-basis columns shrink by orders of magnitude per degree; unit
    // columns keep both the solve and (XᵀX)⁻¹ well conditioned.
    let norms: Vec<f64> = x.column_iter().map(|c| c.norm()).collect();
    if norms.iter().any(|c| !(c.is_finite() && *c > 0.0)) {
        return Err(AppError::DegenerateCovariance { determinant: 0.0 });
    }
    let mut scaled = x.clone();
    for (j, c) in norms.iter().enumerate() {
        scaled.column_mut(j).unscale_mut(*c);
    }

    let beta_scaled = solve_least_squares(&scaled, y)
        .ok_or_else(|| AppError::non_finite("least-squares solution"))?;

    let residuals = y - &scaled * &beta_scaled;
    let sse = residuals.norm_squared();
    if !sse.is_finite() {
        return Err(AppError::non_finite("sum of squared residuals"));
    }

    let gram = scaled.transpose() * &scaled;
    let gram_inv = match Cholesky::new(gram.clone()) {
        Some(chol) => chol.inverse(),
        None => gram.try_inverse().ok_or(AppError::DegenerateCovariance { determinant: 0.0 })?,
    };

    let s2 = sse / (n - p) as f64;
    let beta = DVector::from_fn(p, |j, _| beta_scaled[j] / norms[j]);
    let covariance = DMatrix::from_fn(p, p, |i, j| gram_inv[(i, j)] * s2 / (norms[i] * norms[j]));
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("covariance matrix"));
    }

    Ok(LeastSquares {
        beta,
        sse,
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn covariance_matches_textbook_line_fit() {
        // y = 1 + x with residuals (+0.1, -0.2, +0.1) around the best fit.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.1, 1.8, 3.1]);

        let fit = least_squares_with_covariance(&x, &y).unwrap();
        assert_relative_eq!(fit.beta[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.beta[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.sse, 0.06, epsilon = 1e-12);

        // (XᵀX)⁻¹ = [[5/6, -1/2], [-1/2, 1/2]], s² = 0.06 / 1.
        assert_relative_eq!(fit.covariance[(0, 0)], 0.05, epsilon = 1e-12);
        assert_relative_eq!(fit.covariance[(0, 1)], -0.03, epsilon = 1e-12);
        assert_relative_eq!(fit.covariance[(1, 1)], 0.03, epsilon = 1e-12);
    }

    #[test]
    fn graded_columns_keep_full_precision() {
        // Columns 1, 1e-6 t, 1e-12 t²: raw XᵀX has condition ~1e24.
        let ts = [-1.0, -0.5, 0.0, 0.5, 1.0, 0.25];
        let mut data = Vec::new();
        for &t in &ts {
            data.extend_from_slice(&[1.0, 1e-6 * t, 1e-12 * t * t]);
        }
        let x = DMatrix::from_row_slice(ts.len(), 3, &data);
        let y = DVector::from_iterator(ts.len(), ts.iter().map(|t| 2.0 - t + 0.5 * t * t));

        let fit = least_squares_with_covariance(&x, &y).unwrap();
        assert_relative_eq!(fit.beta[0], 2.0, max_relative = 1e-9);
        assert_relative_eq!(fit.beta[1], -1e6, max_relative = 1e-9);
        assert_relative_eq!(fit.beta[2], 0.5e12, max_relative = 1e-9);
        assert!(fit.covariance.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_column_is_degenerate() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let err = least_squares_with_covariance(&x, &y).unwrap_err();
        assert!(matches!(err, AppError::DegenerateCovariance { .. }));
    }

    #[test]
    fn covariance_requires_more_rows_than_columns() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let err = least_squares_with_covariance(&x, &y).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { .. }));
    }
}

//! Low-level lambda regression for a single coefficient count.
//!
//! Given:
//! - observed values `y_i` (missing values already removed)
//! - their x-coordinates `x_i`
//! - the index set `x_fit` the basis is orthogonal over
//! - a coefficient count `N`
//!
//! we solve the linear least-squares problem for `λ_0 … λ_{N-1}` and report the
//! covariance and reduced chi-squared of the fit.

use nalgebra::{DMatrix, DVector};

use crate::domain::LambdaFit;
use crate::error::{AppError, Result};
use crate::math::{BasisStore, OrthogonalBasisSolver, least_squares_with_covariance};
use crate::models::fill_design_row;

/// Fit `n` lambdas to `(x_data, y)`.
///
/// `std_dev` is the assumed instrumental error in percent. The reduced
/// chi-squared is `(SSE / (std_dev/100)) / (M' - N - 1)`, which needs at least
/// `N + 2` observations; fewer is an [`AppError::InsufficientData`].
pub fn fit_lambdas<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    y: &[f64],
    x_data: &[f64],
    x_fit: &[f64],
    n: usize,
    std_dev: f64,
) -> Result<LambdaFit> {
    if n == 0 {
        return Err(AppError::invalid("Lambda count must be >= 1."));
    }
    if y.len() != x_data.len() {
        return Err(AppError::invalid(format!(
            "Data length mismatch: {} values for {} x-coordinates.",
            y.len(),
            x_data.len()
        )));
    }
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return Err(AppError::invalid(format!("std_dev must be finite and > 0, got {std_dev}.")));
    }
    if y.iter().chain(x_data.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("fit inputs"));
    }

    let m = y.len();
    if m < n + 2 {
        return Err(AppError::InsufficientData {
            observations: m,
            coefficients: n,
        });
    }
    let dof = m - n - 1;

    let basis = solver.constants(x_fit, n)?;

    let mut design = DMatrix::<f64>::zeros(m, n);
    let mut row = vec![0.0; n];
    for (i, &x) in x_data.iter().enumerate() {
        fill_design_row(x, &basis, &mut row);
        for (j, &v) in row.iter().enumerate() {
            design[(i, j)] = v;
        }
    }
    let obs = DVector::from_column_slice(y);

    let ls = least_squares_with_covariance(&design, &obs)?;
    let lambdas: Vec<f64> = ls.beta.iter().copied().collect();

    let chi_squared = (ls.sse / (std_dev * 0.01)) / dof as f64;
    if !chi_squared.is_finite() {
        return Err(AppError::non_finite("reduced chi-squared"));
    }

    log::trace!("fit {n} lambdas to {m} points: chi2={chi_squared:.4e}");
    Ok(LambdaFit {
        lambdas,
        covariance: ls.covariance,
        chi_squared,
        sse: ls.sse,
        dof,
    })
}

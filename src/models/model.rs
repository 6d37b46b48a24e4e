//! Lambda model evaluation.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given x and basis (for least squares)
//! - predict f(x) given lambdas and basis (for residuals and reports)
//!
//! `basis[n]` holds the roots of the degree-`n` term; the term's value at `x`
//! is `Π (x - r)`, and 1 for the empty degree-0 tuple.

use crate::error::{AppError, Result};
use crate::math::{BasisConstants, BasisStore, OrthogonalBasisSolver};

/// Value of the orthogonal term with the given roots at `x`.
#[inline]
pub fn term(x: f64, roots: &[f64]) -> f64 {
    roots.iter().map(|r| x - r).product()
}

/// Fill a design row: one column per basis term.
///
/// `out` must hold one slot per basis term; callers size rows from the basis.
/// Debug builds assert this; release builds fill only the overlapping slots.
pub fn fill_design_row(x: f64, basis: &[BasisConstants], out: &mut [f64]) {
    debug_assert!(
        out.len() >= basis.len(),
        "design row has {} slots for {} basis terms",
        out.len(),
        basis.len()
    );
    for (slot, roots) in out.iter_mut().zip(basis.iter()) {
        *slot = term(x, roots);
    }
}

/// Predict `f(x) = Σ λ_n Π (x - r)` for one point.
pub fn predict(x: f64, lambdas: &[f64], basis: &[BasisConstants]) -> f64 {
    lambdas
        .iter()
        .zip(basis.iter())
        .map(|(lam, roots)| lam * term(x, roots))
        .sum()
}

/// Evaluate a lambda model at every point of `x_data`.
///
/// The basis is orthogonal over `x_fit` (normally the canonical radii) and has
/// one term per lambda.
pub fn lambdas_to_data<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    lambdas: &[f64],
    x_data: &[f64],
    x_fit: &[f64],
) -> Result<Vec<f64>> {
    if lambdas.is_empty() {
        return Err(AppError::invalid("At least one lambda is required."));
    }
    if lambdas.iter().chain(x_data.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("model evaluation inputs"));
    }

    let basis = solver.constants(x_fit, lambdas.len())?;
    let out: Vec<f64> = x_data.iter().map(|&x| predict(x, lambdas, &basis)).collect();

    if out.iter().any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("model evaluation"));
    }
    Ok(out)
}

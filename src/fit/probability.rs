//! Relative model likelihood from a fit's covariance and chi-squared.
//!
//! ```text
//! P = exp(-χ²/2) / sqrt((2π)^N · det Σ)
//! ```
//!
//! `P` is evaluated in log space. Tight fits have tiny covariance determinants,
//! so `P` itself routinely exceeds `f64::MAX` even when the comparison between
//! models is perfectly well defined.

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix};

use crate::domain::ModelScore;
use crate::error::{AppError, Result};

/// Score a fitted model; only comparable with other models on the same data.
pub fn probability_of_lambdas(covariance: &DMatrix<f64>, chi_squared: f64) -> Result<ModelScore> {
    if !covariance.is_square() || covariance.nrows() == 0 {
        return Err(AppError::invalid(format!(
            "Covariance must be a non-empty square matrix, got {}x{}.",
            covariance.nrows(),
            covariance.ncols()
        )));
    }
    if !chi_squared.is_finite() {
        return Err(AppError::non_finite("chi-squared"));
    }

    let n = covariance.nrows() as f64;
    let ln_determinant = ln_determinant(covariance)?;
    let ln_probability = -chi_squared / 2.0 - 0.5 * (n * (2.0 * PI).ln() + ln_determinant);

    if !ln_probability.is_finite() {
        return Err(AppError::non_finite("model probability"));
    }
    Ok(ModelScore {
        ln_probability,
        ln_determinant,
    })
}

/// `ln det Σ`, failing on a non-positive determinant.
///
/// With a positive diagonal, `Σ = D R D` where `R` is the correlation matrix,
/// so `ln det Σ = Σ ln Σ_ii + ln det R`. Lambda variances span many orders of
/// magnitude; `R` does not. Cholesky gives `ln det R` for SPD input; anything
/// it rejects goes through LU so the sign can be checked.
pub fn ln_determinant(m: &DMatrix<f64>) -> Result<f64> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("covariance matrix"));
    }

    let diag = m.diagonal();
    if diag.iter().all(|v| *v > 0.0) {
        let inv_sd: Vec<f64> = diag.iter().map(|v| v.sqrt().recip()).collect();
        let corr = DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)] * inv_sd[i] * inv_sd[j]);
        let ln_diag: f64 = diag.iter().map(|v| v.ln()).sum();

        if let Some(chol) = Cholesky::new(corr.clone()) {
            let ln_det = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
            if ln_det.is_finite() {
                return Ok(ln_diag + ln_det);
            }
        }
        let det = corr.lu().determinant();
        if det.is_finite() && det > 0.0 {
            return Ok(ln_diag + det.ln());
        }
    }

    let det = m.clone().lu().determinant();
    if !(det.is_finite() && det > 0.0) {
        return Err(AppError::DegenerateCovariance { determinant: det });
    }
    Ok(det.ln())
}

/// Normalize log-scores into probabilities that sum to one.
pub fn normalize_log_scores(ln_scores: &[f64]) -> Result<Vec<f64>> {
    if ln_scores.is_empty() {
        return Err(AppError::invalid("No scores to normalize."));
    }
    if ln_scores.iter().any(|v| !v.is_finite()) {
        return Err(AppError::non_finite("log scores"));
    }
    let max = ln_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = ln_scores.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

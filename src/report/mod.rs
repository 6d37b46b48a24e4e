//! Reporting utilities: per-element residuals and formatted terminal output.

use serde::Serialize;

use crate::data::ReeTable;
use crate::domain::LambdaFit;
use crate::error::{AppError, Result};
use crate::math::BasisConstants;
use crate::models::predict;

pub mod format;

pub use format::*;

/// Observed vs modelled value for one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementResidual {
    pub element: String,
    pub radius: f64,
    pub observed: Option<f64>,
    pub fitted: f64,
    /// `observed - fitted`; absent when the element was not measured.
    pub residual: Option<f64>,
}

/// Fitted values and residuals at every table radius.
///
/// `basis` must be the constants the fit was computed with (one per lambda).
pub fn compute_residuals(
    table: &ReeTable,
    ree: &[Option<f64>],
    fit: &LambdaFit,
    basis: &[BasisConstants],
) -> Result<Vec<ElementResidual>> {
    table.check_observation(ree)?;
    if basis.len() != fit.n() {
        return Err(AppError::invalid(format!(
            "Basis has {} terms but the fit has {} lambdas.",
            basis.len(),
            fit.n()
        )));
    }

    let mut out = Vec::with_capacity(ree.len());
    for (i, (&x, obs)) in table.radii.iter().zip(ree.iter()).enumerate() {
        let fitted = predict(x, &fit.lambdas, basis);
        if !fitted.is_finite() {
            return Err(AppError::non_finite("fitted pattern"));
        }
        out.push(ElementResidual {
            element: table.name(i).to_string(),
            radius: x,
            observed: *obs,
            fitted,
            residual: obs.map(|o| o - fitted),
        });
    }
    Ok(out)
}

//! Anomaly hypothesis selection (none / Eu / Ce / Eu+Ce) for a fixed lambda
//! count.
//!
//! Each hypothesis drops its anomalous elements (on top of any missing
//! observations) and refits. The hypothesis with the lowest reduced
//! chi-squared wins; exact ties keep the earlier hypothesis in
//! [`AnomalyCode::ALL`] order.
//!
//! Degrees of freedom differ between hypotheses whenever an excluded element
//! was not already missing, so the compared chi-squared values have different
//! denominators. That asymmetry is kept as-is and each candidate's `dof` is
//! reported alongside its chi-squared.

use std::collections::BTreeSet;

use crate::data::ReeTable;
use crate::domain::{AnomalyCandidate, AnomalyCode, AnomalyFit, AnomalyMagnitude, LambdaFit};
use crate::error::Result;
use crate::fit::fitter::fit_lambdas;
use crate::math::{BasisStore, OrthogonalBasisSolver};
use crate::models::lambdas_to_data;

/// Pick the anomaly hypothesis that best fits `ree` with `n` lambdas.
///
/// `ree` must have one entry per table element; `None` marks missing data.
/// A failure in any candidate fit is returned as-is.
pub fn best_fit_anomaly<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    table: &ReeTable,
    ree: &[Option<f64>],
    n: usize,
    std_dev: f64,
) -> Result<AnomalyFit> {
    table.validate()?;
    table.check_observation(ree)?;

    let missing: BTreeSet<usize> = ree
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.is_none().then_some(i))
        .collect();

    let mut fits: Vec<(AnomalyCode, LambdaFit)> = Vec::with_capacity(AnomalyCode::ALL.len());
    for anomaly in AnomalyCode::ALL {
        let mask = exclusion_mask(table, &missing, anomaly);
        if anomaly != AnomalyCode::None && mask.len() == missing.len() {
            log::debug!(
                "{} hypothesis excludes nothing beyond missing data",
                anomaly.display_name()
            );
        }

        let (x, y): (Vec<f64>, Vec<f64>) = table
            .radii
            .iter()
            .zip(ree.iter())
            .enumerate()
            .filter(|(i, _)| !mask.contains(i))
            .filter_map(|(_, (&x, v))| v.map(|y| (x, y)))
            .unzip();

        let fit = fit_lambdas(solver, &y, &x, &table.radii, n, std_dev)?;
        fits.push((anomaly, fit));
    }

    let candidates: Vec<AnomalyCandidate> = fits
        .iter()
        .map(|(anomaly, fit)| AnomalyCandidate {
            anomaly: *anomaly,
            chi_squared: fit.chi_squared,
            dof: fit.dof,
        })
        .collect();

    // Deterministic selection: minimum chi-squared; ties keep the earlier hypothesis.
    let mut best_idx = 0;
    for (i, (_, fit)) in fits.iter().enumerate().skip(1) {
        if fit.chi_squared < fits[best_idx].1.chi_squared {
            best_idx = i;
        }
    }
    let (anomaly, fit) = fits.swap_remove(best_idx);

    let anomalies = anomaly_magnitudes(solver, table, ree, anomaly, &fit)?;
    log::debug!(
        "n={n}: best anomaly {} (chi2={:.4e})",
        anomaly.display_name(),
        fit.chi_squared
    );

    Ok(AnomalyFit {
        fit,
        anomaly,
        candidates,
        anomalies,
    })
}

fn exclusion_mask(table: &ReeTable, missing: &BTreeSet<usize>, anomaly: AnomalyCode) -> BTreeSet<usize> {
    let mut mask = missing.clone();
    if anomaly.excludes_eu() {
        mask.insert(table.eu_position);
    }
    if anomaly.excludes_ce() {
        mask.insert(table.ce_position);
    }
    mask
}

/// `observed - modelled` at each excluded anomaly position with data.
fn anomaly_magnitudes<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    table: &ReeTable,
    ree: &[Option<f64>],
    anomaly: AnomalyCode,
    fit: &LambdaFit,
) -> Result<Vec<AnomalyMagnitude>> {
    let mut positions = Vec::new();
    if anomaly.excludes_ce() {
        positions.push(table.ce_position);
    }
    if anomaly.excludes_eu() {
        positions.push(table.eu_position);
    }

    let mut out = Vec::with_capacity(positions.len());
    for position in positions {
        let Some(observed) = ree[position] else {
            continue;
        };
        let modelled = lambdas_to_data(solver, &fit.lambdas, &[table.radii[position]], &table.radii)?;
        out.push(AnomalyMagnitude {
            element: table.name(position).to_string(),
            position,
            log_ratio: observed - modelled[0],
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RADII;
    use crate::error::AppError;
    use approx::assert_abs_diff_eq;

    fn smooth_pattern(solver: &OrthogonalBasisSolver) -> Vec<Option<f64>> {
        let y = lambdas_to_data(solver, &[1.2, -8.0, -30.0, 150.0], &RADII, &RADII).unwrap();
        // Small deterministic wiggle so no hypothesis fits exactly.
        y.iter()
            .enumerate()
            .map(|(i, v)| Some(v + if i % 2 == 0 { 0.004 } else { -0.004 }))
            .collect()
    }

    #[test]
    fn detects_injected_eu_anomaly() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let mut ree = smooth_pattern(&solver);
        ree[5] = ree[5].map(|v| v - 0.4);

        let best = best_fit_anomaly(&solver, &table, &ree, 4, 2.0).unwrap();
        assert!(best.anomaly.excludes_eu());
        assert_eq!(best.candidates.len(), 4);

        let eu = best.anomalies.iter().find(|a| a.element == "Eu").unwrap();
        assert_abs_diff_eq!(eu.log_ratio, -0.4, epsilon = 0.02);
    }

    #[test]
    fn detects_injected_ce_anomaly() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let mut ree = smooth_pattern(&solver);
        ree[1] = ree[1].map(|v| v + 0.3);

        let best = best_fit_anomaly(&solver, &table, &ree, 4, 2.0).unwrap();
        assert!(best.anomaly.excludes_ce());
    }

    #[test]
    fn ties_keep_the_earlier_hypothesis() {
        // With both Eu and Ce missing, all four masks are identical.
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let mut ree = smooth_pattern(&solver);
        ree[1] = None;
        ree[5] = None;

        let best = best_fit_anomaly(&solver, &table, &ree, 3, 2.0).unwrap();
        assert_eq!(best.anomaly, AnomalyCode::None);
        assert!(best.anomalies.is_empty());
        for c in &best.candidates {
            assert_eq!(c.dof, 12 - 3 - 1);
            assert_eq!(c.chi_squared, best.fit.chi_squared);
        }
    }

    #[test]
    fn candidate_degrees_of_freedom_follow_masks() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let mut ree = smooth_pattern(&solver);
        ree[9] = None;

        let best = best_fit_anomaly(&solver, &table, &ree, 2, 2.0).unwrap();
        let dofs: Vec<usize> = best.candidates.iter().map(|c| c.dof).collect();
        assert_eq!(dofs, vec![10, 9, 9, 8]);
    }

    #[test]
    fn insufficient_data_in_any_candidate_propagates() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let mut ree = smooth_pattern(&solver);
        for v in ree.iter_mut().skip(8) {
            *v = None;
        }
        // 8 usable points; the Eu+Ce mask leaves 6, too few for 5 lambdas.
        let err = best_fit_anomaly(&solver, &table, &ree, 5, 2.0).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { observations: 6, .. }));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        assert!(best_fit_anomaly(&solver, &table, &[Some(1.0); 10], 2, 2.0).is_err());
    }
}

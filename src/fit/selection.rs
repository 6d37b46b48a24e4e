//! Model-order selection over a range of lambda counts.
//!
//! For each `N` in `[min_n, max_n]`:
//! 1. pick the best anomaly hypothesis (`fit::anomaly`)
//! 2. score the winning fit: `P = exp(-χ²/2) / sqrt((2π)^N det Σ)`
//!
//! The scores are then normalized against each other, giving a self-relative
//! distribution over `N`. Orders are independent, so they are fitted in
//! parallel; the shared basis cache makes the work after the first order
//! mostly linear algebra.

use rayon::prelude::*;

use crate::data::ReeTable;
use crate::domain::{OrderDistribution, OrderEntry};
use crate::error::{AppError, Result};
use crate::fit::anomaly::best_fit_anomaly;
use crate::fit::probability::{normalize_log_scores, probability_of_lambdas};
use crate::math::{BasisStore, OrthogonalBasisSolver};

/// Relative probabilities of fitting `min_n ..= max_n` lambdas to `ree`.
///
/// Any failing order fails the whole call; there is no partial distribution.
pub fn probability_of_n_lambdas<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    table: &ReeTable,
    ree: &[Option<f64>],
    min_n: usize,
    max_n: usize,
    std_dev: f64,
) -> Result<OrderDistribution> {
    if min_n == 0 {
        return Err(AppError::invalid("Minimum lambda count must be >= 1."));
    }
    if min_n > max_n {
        return Err(AppError::invalid(format!(
            "Invalid lambda range: min_n={min_n} > max_n={max_n}."
        )));
    }
    table.validate()?;
    table.check_observation(ree)?;

    // Evaluate each order independently (parallel). `collect` keeps range order.
    let scored: Vec<_> = (min_n..=max_n)
        .into_par_iter()
        .map(|n| {
            let best = best_fit_anomaly(solver, table, ree, n, std_dev)?;
            let score = probability_of_lambdas(&best.fit.covariance, best.fit.chi_squared)?;
            Ok((n, best, score))
        })
        .collect::<Result<Vec<_>>>()?;

    let ln_scores: Vec<f64> = scored.iter().map(|(_, _, s)| s.ln_probability).collect();
    let probabilities = normalize_log_scores(&ln_scores)?;

    let entries: Vec<OrderEntry> = scored
        .into_iter()
        .zip(probabilities)
        .map(|((n, best, score), probability)| OrderEntry {
            n,
            probability,
            score,
            best,
        })
        .collect();

    let distribution = OrderDistribution { entries };
    if let Some(top) = distribution.most_probable() {
        log::info!(
            "most probable lambda count: {} (p={:.4}, anomaly {})",
            top.n,
            top.probability,
            top.best.anomaly.display_name()
        );
    }
    Ok(distribution)
}

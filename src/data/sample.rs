//! Synthetic REE pattern generation.
//!
//! Patterns are built from known lambdas, so they are handy for checking that
//! fitting and selection recover what went in:
//!
//! - evaluate the lambda model at the table radii
//! - add Gaussian noise with σ = `noise_pct / 100` (log units)
//! - add fixed log-offsets at the Eu and Ce positions

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::data::ReeTable;
use crate::error::{AppError, Result};
use crate::math::{BasisStore, OrthogonalBasisSolver};
use crate::models::lambdas_to_data;

/// Recipe for one synthetic pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec {
    pub lambdas: Vec<f64>,
    /// Noise standard deviation in percent (0 disables noise).
    pub noise_pct: f64,
    /// Log-offset added at Eu (`ln(Eu/Eu*)`).
    pub eu_anomaly: f64,
    /// Log-offset added at Ce (`ln(Ce/Ce*)`).
    pub ce_anomaly: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            lambdas: vec![1.0, 10.0, 100.0, 1000.0, 10000.0],
            noise_pct: 0.0,
            eu_anomaly: 0.0,
            ce_anomaly: 0.0,
            seed: 42,
        }
    }
}

/// Generate a chondrite-normalized (log) pattern with every element present.
pub fn generate_pattern<S: BasisStore>(
    solver: &OrthogonalBasisSolver<S>,
    table: &ReeTable,
    spec: &SampleSpec,
) -> Result<Vec<f64>> {
    table.validate()?;
    if !(spec.noise_pct.is_finite() && spec.noise_pct >= 0.0) {
        return Err(AppError::invalid("Noise must be finite and >= 0."));
    }
    if !(spec.eu_anomaly.is_finite() && spec.ce_anomaly.is_finite()) {
        return Err(AppError::invalid("Anomaly offsets must be finite."));
    }

    let mut values = lambdas_to_data(solver, &spec.lambdas, &table.radii, &table.radii)?;

    if spec.noise_pct > 0.0 {
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let normal = Normal::new(0.0, spec.noise_pct / 100.0)
            .map_err(|e| AppError::invalid(format!("Noise distribution error: {e}")))?;
        for v in values.iter_mut() {
            *v += normal.sample(&mut rng);
        }
    }

    values[table.eu_position] += spec.eu_anomaly;
    values[table.ce_position] += spec.ce_anomaly;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_pattern_matches_model() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let spec = SampleSpec::default();
        let a = generate_pattern(&solver, &table, &spec).unwrap();
        let b = lambdas_to_data(&solver, &spec.lambdas, &table.radii, &table.radii).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let spec = SampleSpec {
            noise_pct: 2.0,
            ..SampleSpec::default()
        };
        let a = generate_pattern(&solver, &table, &spec).unwrap();
        let b = generate_pattern(&solver, &table, &spec).unwrap();
        assert_eq!(a, b);

        let c = generate_pattern(&solver, &table, &SampleSpec { seed: 7, ..spec }).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn anomalies_shift_only_their_elements() {
        let solver = OrthogonalBasisSolver::default();
        let table = ReeTable::default();
        let base = generate_pattern(&solver, &table, &SampleSpec::default()).unwrap();
        let spec = SampleSpec {
            eu_anomaly: -0.5,
            ce_anomaly: 0.25,
            ..SampleSpec::default()
        };
        let shifted = generate_pattern(&solver, &table, &spec).unwrap();
        for (i, (a, b)) in base.iter().zip(shifted.iter()).enumerate() {
            let expected = match i {
                5 => -0.5,
                1 => 0.25,
                _ => 0.0,
            };
            assert!((b - a - expected).abs() < 1e-12);
        }
    }
}

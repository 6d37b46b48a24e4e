//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and selection
//! - printed by the `lambdas` binary as JSON

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// One observation per index position; `None` marks a missing value.
pub type Observation = [Option<f64>];

/// Default convergence tolerance for the basis root solve.
pub const DEFAULT_TOL: f64 = 1e-12;

/// Default iteration cap for the basis root solve.
pub const DEFAULT_MAX_ITER: usize = 100;

/// Numerical settings for the orthogonal-basis solver.
///
/// `rounding` and `tol` are part of the basis cache key, so roots solved with
/// different values are never shared. `max_iter` only bounds the solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Round converged roots to this many decimal places.
    pub rounding: Option<u32>,
    /// Converged when every orthogonality residual is within `tol`.
    pub tol: f64,
    /// Newton iteration cap per degree.
    pub max_iter: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounding: None,
            tol: DEFAULT_TOL,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

/// Which elements were excluded from the fit as anomalous.
///
/// The discriminant matches the conventional numeric code
/// (`0` none, `1` Eu, `2` Ce, `3` Eu and Ce).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyCode {
    None = 0,
    Eu = 1,
    Ce = 2,
    EuCe = 3,
}

impl AnomalyCode {
    /// Candidates in tie-break priority order.
    pub const ALL: [AnomalyCode; 4] = [
        AnomalyCode::None,
        AnomalyCode::Eu,
        AnomalyCode::Ce,
        AnomalyCode::EuCe,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn excludes_eu(self) -> bool {
        matches!(self, AnomalyCode::Eu | AnomalyCode::EuCe)
    }

    pub fn excludes_ce(self) -> bool {
        matches!(self, AnomalyCode::Ce | AnomalyCode::EuCe)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AnomalyCode::None => "none",
            AnomalyCode::Eu => "Eu",
            AnomalyCode::Ce => "Ce",
            AnomalyCode::EuCe => "Eu+Ce",
        }
    }
}

/// Output of a single lambda regression.
#[derive(Debug, Clone, Serialize)]
pub struct LambdaFit {
    pub lambdas: Vec<f64>,
    /// N×N covariance of the lambdas.
    pub covariance: DMatrix<f64>,
    /// Reduced chi-squared.
    pub chi_squared: f64,
    /// Sum of squared residuals.
    pub sse: f64,
    /// Degrees of freedom `M' - N - 1`.
    pub dof: usize,
}

impl LambdaFit {
    pub fn n(&self) -> usize {
        self.lambdas.len()
    }
}

/// Chi-squared of one anomaly hypothesis (kept for diagnostics).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnomalyCandidate {
    pub anomaly: AnomalyCode,
    pub chi_squared: f64,
    pub dof: usize,
}

/// Size of an excluded anomaly: `observed - modelled` in log units
/// (e.g. `ln(Eu/Eu*)`).
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyMagnitude {
    pub element: String,
    pub position: usize,
    pub log_ratio: f64,
}

/// Best anomaly hypothesis for a fixed lambda count.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFit {
    pub fit: LambdaFit,
    pub anomaly: AnomalyCode,
    /// All four hypotheses in priority order.
    pub candidates: Vec<AnomalyCandidate>,
    /// Magnitudes of the excluded anomalies that have an observation.
    pub anomalies: Vec<AnomalyMagnitude>,
}

/// Self-relative likelihood of a fitted model.
///
/// Only comparable between models fitted to the same data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelScore {
    pub ln_probability: f64,
    pub ln_determinant: f64,
}

impl ModelScore {
    /// `exp(ln P)`; may overflow to infinity for very tight fits.
    pub fn probability(&self) -> f64 {
        self.ln_probability.exp()
    }
}

/// One lambda count with its winning fit and normalized probability.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEntry {
    pub n: usize,
    pub probability: f64,
    pub score: ModelScore,
    pub best: AnomalyFit,
}

/// Normalized probability distribution over lambda counts.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDistribution {
    /// Ascending in `n`.
    pub entries: Vec<OrderEntry>,
}

impl OrderDistribution {
    pub fn orders(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.n).collect()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.probability).collect()
    }

    /// Entry with the highest probability (lowest `n` on ties).
    pub fn most_probable(&self) -> Option<&OrderEntry> {
        let mut best: Option<&OrderEntry> = None;
        for e in &self.entries {
            if best.is_none_or(|b| e.probability > b.probability) {
                best = Some(e);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_codes_match_numeric_convention() {
        let codes: Vec<u8> = AnomalyCode::ALL.iter().map(|a| a.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
        assert!(AnomalyCode::EuCe.excludes_eu() && AnomalyCode::EuCe.excludes_ce());
        assert!(!AnomalyCode::Ce.excludes_eu());
    }

    #[test]
    fn score_probability_is_exp_of_log() {
        let s = ModelScore {
            ln_probability: 0.0,
            ln_determinant: 0.0,
        };
        assert_eq!(s.probability(), 1.0);
    }
}

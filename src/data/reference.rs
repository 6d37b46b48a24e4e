//! Reference tables for the 14 lanthanides (Pm excluded).
//!
//! Radii and CI chondrite abundances are from O'Neill (2016), "The Smoothness
//! and Shapes of Chondrite-normalized Rare Earth Element Patterns in Basalts",
//! J. Petrology 57:1463–1508. They are configuration data: the engine never
//! derives them, and callers may substitute their own [`ReeTable`].

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Element labels in index order.
pub const REE_NAMES: [&str; 14] = [
    "La", "Ce", "Pr", "Nd", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu",
];

/// Ionic radii (Å), the canonical index set for the orthogonal basis.
pub const RADII: [f64; 14] = [
    1.160, 1.143, 1.126, // La Ce Pr
    1.109, 1.079, 1.066, // Nd Sm Eu
    1.053, 1.040, 1.027, // Gd Tb Dy
    1.015, 1.004, 0.994, // Ho Er Tm
    0.985, 0.977, // Yb Lu
];

/// CI chondrite abundances (ppm).
pub const CI_CHONDRITE: [f64; 14] = [
    0.2472, 0.6308, 0.0950, // La Ce Pr
    0.4793, 0.1542, 0.0592, // Nd Sm Eu
    0.2059, 0.0375, 0.2540, // Gd Tb Dy
    0.0554, 0.1645, 0.0258, // Ho Er Tm
    0.1684, 0.0251, // Yb Lu
];

/// Position of Ce in the canonical ordering.
pub const CE_POSITION: usize = 1;

/// Position of Eu in the canonical ordering.
pub const EU_POSITION: usize = 5;

/// Index set, normalization vector and labels for one problem instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReeTable {
    pub names: Vec<String>,
    pub radii: Vec<f64>,
    pub chondrite: Vec<f64>,
    pub ce_position: usize,
    pub eu_position: usize,
}

impl Default for ReeTable {
    fn default() -> Self {
        Self {
            names: REE_NAMES.iter().map(|s| s.to_string()).collect(),
            radii: RADII.to_vec(),
            chondrite: CI_CHONDRITE.to_vec(),
            ce_position: CE_POSITION,
            eu_position: EU_POSITION,
        }
    }
}

impl ReeTable {
    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    /// Check table shape; every public engine entry point calls this.
    pub fn validate(&self) -> Result<()> {
        let n = self.radii.len();
        if self.names.len() != n || self.chondrite.len() != n {
            return Err(AppError::invalid(format!(
                "Reference table mismatch: {} names, {} radii, {} chondrite values.",
                self.names.len(),
                n,
                self.chondrite.len()
            )));
        }
        if self.ce_position >= n || self.eu_position >= n || self.ce_position == self.eu_position {
            return Err(AppError::invalid("Ce/Eu positions must be distinct and inside the table."));
        }
        Ok(())
    }

    pub fn name(&self, position: usize) -> &str {
        self.names.get(position).map(String::as_str).unwrap_or("?")
    }

    /// Ensure an observation vector lines up with the table.
    pub fn check_observation(&self, ree: &[Option<f64>]) -> Result<()> {
        if ree.len() != self.len() {
            return Err(AppError::invalid(format!(
                "Expected {} REE values, got {}.",
                self.len(),
                ree.len()
            )));
        }
        if ree.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AppError::non_finite("REE observation vector"));
        }
        Ok(())
    }
}

/// Convert concentrations to `ln(c / c_CI)`.
///
/// Missing values stay missing; zero, negative or non-finite concentrations
/// are rejected since their logarithm is undefined.
pub fn normalize_to_chondrite(raw: &[Option<f64>], table: &ReeTable) -> Result<Vec<Option<f64>>> {
    if raw.len() != table.len() {
        return Err(AppError::invalid(format!(
            "Expected {} concentrations, got {}.",
            table.len(),
            raw.len()
        )));
    }

    raw.iter()
        .zip(table.chondrite.iter())
        .enumerate()
        .map(|(i, (value, &ci))| match *value {
            None => Ok(None),
            Some(c) if c.is_finite() && c > 0.0 => Ok(Some((c / ci).ln())),
            Some(c) => Err(AppError::invalid(format!(
                "{} concentration must be positive, got {c}.",
                table.name(i)
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_table_is_consistent() {
        let table = ReeTable::default();
        table.validate().unwrap();
        assert_eq!(table.name(CE_POSITION), "Ce");
        assert_eq!(table.name(EU_POSITION), "Eu");
        assert!(RADII.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn normalization_matches_log_ratio() {
        let table = ReeTable::default();
        let raw = [
            1.447, 5.241, 1.014, 5.722, 2.277, 1.005, 3.285, 0.646, 4.336, 0.906, 2.715, 0.412,
            2.501, 0.351,
        ];
        let mut input: Vec<Option<f64>> = raw.iter().copied().map(Some).collect();
        input[7] = None;

        let out = normalize_to_chondrite(&input, &table).unwrap();
        assert_abs_diff_eq!(out[0].unwrap(), (1.447f64 / 0.2472).ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(out[13].unwrap(), (0.351f64 / 0.0251).ln(), epsilon = 1e-15);
        assert!(out[7].is_none());
    }

    #[test]
    fn normalization_rejects_non_positive() {
        let table = ReeTable::default();
        let mut input = vec![Some(1.0); 14];
        input[3] = Some(0.0);
        let err = normalize_to_chondrite(&input, &table).unwrap_err();
        assert!(err.to_string().contains("Nd"));
    }

    #[test]
    fn observation_length_is_checked() {
        let table = ReeTable::default();
        assert!(table.check_observation(&[Some(1.0); 13]).is_err());
        assert!(table.check_observation(&[None; 14]).is_ok());
    }
}

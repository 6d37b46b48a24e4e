//! Long-lived entry point that owns the basis cache and reference table.
//!
//! Shared by the CLI and by library callers so the workflow lives in one
//! place: evaluate → fit → anomaly selection → order selection.
//!
//! The engine is `Sync`; one instance can serve many threads, and every
//! thread benefits from roots solved by the others.

use crate::data::{ReeTable, SampleSpec, generate_pattern, normalize_to_chondrite};
use crate::domain::{AnomalyFit, EngineConfig, LambdaFit, ModelScore, OrderDistribution};
use crate::error::Result;
use crate::fit::{best_fit_anomaly, fit_lambdas, probability_of_lambdas, probability_of_n_lambdas};
use crate::math::{BasisConstants, BasisStore, MemoryStore, OrthogonalBasisSolver};
use crate::models::lambdas_to_data;

#[derive(Debug)]
pub struct LambdaEngine<S = MemoryStore> {
    solver: OrthogonalBasisSolver<S>,
    table: ReeTable,
}

impl LambdaEngine<MemoryStore> {
    pub fn new(config: EngineConfig, table: ReeTable) -> Result<Self> {
        Self::with_store(MemoryStore::new(), config, table)
    }
}

impl Default for LambdaEngine<MemoryStore> {
    fn default() -> Self {
        Self {
            solver: OrthogonalBasisSolver::default(),
            table: ReeTable::default(),
        }
    }
}

impl<S: BasisStore> LambdaEngine<S> {
    pub fn with_store(store: S, config: EngineConfig, table: ReeTable) -> Result<Self> {
        table.validate()?;
        Ok(Self {
            solver: OrthogonalBasisSolver::with_store(store, config),
            table,
        })
    }

    pub fn solver(&self) -> &OrthogonalBasisSolver<S> {
        &self.solver
    }

    pub fn table(&self) -> &ReeTable {
        &self.table
    }

    /// Basis constants `C_0 … C_{n-1}` over the table radii.
    pub fn basis(&self, n: usize) -> Result<Vec<BasisConstants>> {
        self.solver.constants(&self.table.radii, n)
    }

    /// Model values at `x_data` (basis orthogonal over the table radii).
    pub fn evaluate(&self, lambdas: &[f64], x_data: &[f64]) -> Result<Vec<f64>> {
        lambdas_to_data(&self.solver, lambdas, x_data, &self.table.radii)
    }

    /// Model values at every table radius.
    pub fn evaluate_pattern(&self, lambdas: &[f64]) -> Result<Vec<f64>> {
        self.evaluate(lambdas, &self.table.radii)
    }

    /// Fit `n` lambdas to `(x_data, y)`.
    pub fn fit(&self, y: &[f64], x_data: &[f64], n: usize, std_dev: f64) -> Result<LambdaFit> {
        fit_lambdas(&self.solver, y, x_data, &self.table.radii, n, std_dev)
    }

    pub fn score(&self, fit: &LambdaFit) -> Result<ModelScore> {
        probability_of_lambdas(&fit.covariance, fit.chi_squared)
    }

    pub fn best_fit_anomaly(&self, ree: &[Option<f64>], n: usize, std_dev: f64) -> Result<AnomalyFit> {
        best_fit_anomaly(&self.solver, &self.table, ree, n, std_dev)
    }

    pub fn order_probabilities(
        &self,
        ree: &[Option<f64>],
        min_n: usize,
        max_n: usize,
        std_dev: f64,
    ) -> Result<OrderDistribution> {
        probability_of_n_lambdas(&self.solver, &self.table, ree, min_n, max_n, std_dev)
    }

    /// `ln(c / c_CI)` for raw concentrations.
    pub fn normalize(&self, raw: &[Option<f64>]) -> Result<Vec<Option<f64>>> {
        normalize_to_chondrite(raw, &self.table)
    }

    pub fn synthesize(&self, spec: &SampleSpec) -> Result<Vec<f64>> {
        generate_pattern(&self.solver, &self.table, spec)
    }
}

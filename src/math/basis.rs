//! Orthogonal polynomial basis over a fixed, non-uniform index set.
//!
//! Lambda models are expansions in polynomials of the form
//!
//! ```text
//! f(x) = λ0
//!      + λ1 (x - β0)
//!      + λ2 (x - γ0)(x - γ1)
//!      + λ3 (x - δ0)(x - δ1)(x - δ2)
//!      + …
//! ```
//!
//! where the roots of each degree-`d` term are chosen so that the term is
//! orthogonal to every lower power of `x` over the index set:
//!
//! ```text
//! Σ_{x ∈ xs} x^k · Π_{r ∈ C_d} (x - r) = 0      for k = 0 … d-1
//! ```
//!
//! Numerical notes:
//! - Each degree is an independent `d × d` nonlinear system, evaluated by
//!   direct summation over `xs` and solved by damped Newton with an analytic
//!   Jacobian `∂F_k/∂r_j = -Σ x^k Π_{i≠j} (x - r_i)`.
//! - The system is solved in centred coordinates `t = (x - mean) / spread`
//!   and the roots are mapped back afterwards. Orthogonality is invariant
//!   under that affine change, while in raw coordinates (radii ≈ 1) the
//!   equations for different `k` are nearly collinear and their residuals
//!   hit the rounding floor long before the roots are right.
//! - Each equation is divided by `Σ |t^k Π (t - r)|` at the seed, so the
//!   tolerance is relative to the size of the terms being cancelled.
//! - The seed is the `d` interior points of a uniform `(d+2)`-point grid over
//!   `[min xs, max xs]`; the discrete orthogonal polynomial has all of its
//!   roots inside that interval, so the seed sits in the right basin.
//! - Roots are returned in ascending order.
//!
//! Solved degrees are cached per `(xs, degree, rounding, tol)` in a
//! [`BasisStore`] owned by the solver, so repeated fits only pay for the root
//! solve once per process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nalgebra::{DMatrix, DVector};

use crate::domain::EngineConfig;
use crate::error::{AppError, Result};
use crate::math::newton::{NewtonOptions, damped_newton};

/// Roots of one orthogonal term (empty for degree 0).
pub type BasisConstants = Arc<[f64]>;

/// Cache key: the exact bit patterns of the inputs, so equal queries hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasisKey {
    xs: Vec<u64>,
    degree: usize,
    rounding: Option<u32>,
    tol: u64,
}

impl BasisKey {
    pub fn new(xs: &[f64], degree: usize, rounding: Option<u32>, tol: f64) -> Self {
        Self {
            xs: xs.iter().map(|x| x.to_bits()).collect(),
            degree,
            rounding,
            tol: tol.to_bits(),
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

/// Append-only storage for solved basis roots.
///
/// Implementations must be safe to share between threads. Inserting a key
/// that already exists keeps the stored value and returns it, so a race
/// between two solvers only costs a redundant solve.
pub trait BasisStore: Send + Sync {
    fn get(&self, key: &BasisKey) -> Option<BasisConstants>;

    fn insert(&self, key: BasisKey, roots: BasisConstants) -> BasisConstants;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store guarded by a read/write lock. Never evicts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<BasisKey, BasisConstants>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BasisStore for MemoryStore {
    fn get(&self, key: &BasisKey) -> Option<BasisConstants> {
        // Stored values are always complete, so a poisoned lock is still usable.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn insert(&self, key: BasisKey, roots: BasisConstants) -> BasisConstants {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert(roots).clone()
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Long-lived solver that owns the basis cache.
#[derive(Debug)]
pub struct OrthogonalBasisSolver<S = MemoryStore> {
    store: S,
    config: EngineConfig,
}

impl OrthogonalBasisSolver<MemoryStore> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl Default for OrthogonalBasisSolver<MemoryStore> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: BasisStore> OrthogonalBasisSolver<S> {
    pub fn with_store(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Basis constants `C_0 … C_{degree-1}` for `xs`.
    ///
    /// `degree` is the number of terms (the lambda count), so the highest
    /// polynomial degree solved is `degree - 1`.
    pub fn constants(&self, xs: &[f64], degree: usize) -> Result<Vec<BasisConstants>> {
        validate_index_set(xs)?;
        if degree > xs.len() {
            return Err(AppError::invalid(format!(
                "Cannot build {degree} orthogonal terms over {} index points.",
                xs.len()
            )));
        }
        (0..degree).map(|d| self.roots_unchecked(xs, d)).collect()
    }

    /// Roots `C_d` of the single degree-`d` term.
    pub fn roots(&self, xs: &[f64], d: usize) -> Result<BasisConstants> {
        validate_index_set(xs)?;
        if d >= xs.len() {
            return Err(AppError::invalid(format!(
                "Degree {d} term is not defined over {} index points.",
                xs.len()
            )));
        }
        self.roots_unchecked(xs, d)
    }

    fn roots_unchecked(&self, xs: &[f64], d: usize) -> Result<BasisConstants> {
        let cfg = &self.config;
        let key = BasisKey::new(xs, d, cfg.rounding, cfg.tol);
        if let Some(hit) = self.store.get(&key) {
            log::trace!("basis cache hit for degree {d}");
            return Ok(hit);
        }

        let roots = solve_degree(xs, d, cfg)?;
        Ok(self.store.insert(key, roots.into()))
    }
}

/// Residuals `F_k = Σ x^k Π (x - r)` for `k = 0 … roots.len()-1`.
///
/// All entries are ~0 when `roots` are the orthogonal roots for `xs`.
pub fn orthogonality_residuals(xs: &[f64], roots: &[f64]) -> Vec<f64> {
    let d = roots.len();
    let mut out = vec![0.0; d];
    for &x in xs {
        let p: f64 = roots.iter().map(|r| x - r).product();
        let mut xk = 1.0;
        for fk in out.iter_mut() {
            *fk += xk * p;
            xk *= x;
        }
    }
    out
}

/// `Σ |x^k Π (x - r)|` per equation, the magnitude of the terms that cancel.
fn residual_scales(xs: &[f64], roots: &[f64]) -> DVector<f64> {
    let d = roots.len();
    let mut out = DVector::<f64>::zeros(d);
    for &x in xs {
        let p: f64 = roots.iter().map(|r| (x - r).abs()).product();
        let mut xk = 1.0;
        for sk in out.iter_mut() {
            *sk += xk * p;
            xk *= x.abs();
        }
    }
    out.map(|s| s.max(f64::MIN_POSITIVE))
}

fn jacobian(xs: &[f64], roots: &[f64]) -> DMatrix<f64> {
    let d = roots.len();
    let mut jac = DMatrix::<f64>::zeros(d, d);
    for &x in xs {
        for j in 0..d {
            let partial: f64 = roots
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != j)
                .map(|(_, r)| x - r)
                .product();
            let mut xk = 1.0;
            for k in 0..d {
                jac[(k, j)] -= xk * partial;
                xk *= x;
            }
        }
    }
    jac
}

fn solve_degree(xs: &[f64], d: usize, cfg: &EngineConfig) -> Result<Vec<f64>> {
    if d == 0 {
        return Ok(Vec::new());
    }

    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let spread = xs.iter().map(|x| (x - mean).abs()).fold(0.0, f64::max);
    let ts: Vec<f64> = xs.iter().map(|x| (x - mean) / spread).collect();

    let (lo, hi) = ts
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));
    let spacing = (hi - lo) / (d as f64 + 1.0);
    let seed = DVector::from_iterator(d, (1..=d).map(|i| lo + spacing * i as f64));

    // Row scales are fixed at the seed so the line-search merit stays the same function.
    let scales = residual_scales(&ts, seed.as_slice());

    let out = damped_newton(
        seed,
        |r| {
            let mut f = DVector::from_vec(orthogonality_residuals(&ts, r.as_slice()));
            f.component_div_assign(&scales);
            f
        },
        |r| {
            let mut jac = jacobian(&ts, r.as_slice());
            for (k, s) in scales.iter().enumerate() {
                jac.row_mut(k).unscale_mut(*s);
            }
            jac
        },
        NewtonOptions {
            tol: cfg.tol,
            max_iter: cfg.max_iter,
        },
    );

    if !out.converged {
        log::warn!(
            "basis degree {d} failed to converge: {} iterations, relative residual {:.3e}",
            out.iterations,
            out.residual
        );
        return Err(AppError::Convergence {
            degree: d,
            iterations: out.iterations,
            residual: out.residual,
        });
    }
    log::debug!(
        "solved basis degree {d} in {} iterations (relative residual {:.3e})",
        out.iterations,
        out.residual
    );

    let mut roots: Vec<f64> = out.x.iter().map(|t| mean + spread * t).collect();
    roots.sort_by(|a, b| a.total_cmp(b));
    if let Some(places) = cfg.rounding {
        let scale = 10f64.powi(places as i32);
        for r in roots.iter_mut() {
            *r = (*r * scale).round() / scale;
        }
    }
    Ok(roots)
}

fn validate_index_set(xs: &[f64]) -> Result<()> {
    if xs.len() < 2 {
        return Err(AppError::invalid("Index set needs at least two points."));
    }
    if xs.iter().any(|x| !x.is_finite()) {
        return Err(AppError::invalid("Index set contains a non-finite value."));
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(AppError::invalid("Index set values must be distinct."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RADII;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_root_is_the_mean() {
        let solver = OrthogonalBasisSolver::default();
        let c = solver.constants(&RADII, 2).unwrap();
        assert!(c[0].is_empty());
        let mean = RADII.iter().sum::<f64>() / RADII.len() as f64;
        assert_abs_diff_eq!(c[1][0], mean, epsilon = 1e-12);
    }

    fn column(xs: &[f64], roots: &[f64]) -> Vec<f64> {
        xs.iter().map(|x| roots.iter().map(|r| x - r).product()).collect()
    }

    fn cosine(a: &[f64], b: &[f64]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(p, q)| p * q).sum();
        let na: f64 = a.iter().map(|p| p * p).sum::<f64>().sqrt();
        let nb: f64 = b.iter().map(|q| q * q).sum::<f64>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn terms_are_mutually_orthogonal_up_to_full_degree() {
        let solver = OrthogonalBasisSolver::default();
        let basis = solver.constants(&RADII, RADII.len()).unwrap();
        let columns: Vec<Vec<f64>> = basis.iter().map(|r| column(&RADII, r)).collect();
        for d in 1..columns.len() {
            assert_eq!(basis[d].len(), d);
            for k in 0..d {
                let c = cosine(&columns[d], &columns[k]);
                assert!(c.abs() < 1e-9, "cos(P{d}, P{k}) = {c:e}");
            }
        }
    }

    #[test]
    fn highest_degree_roots_interlace_the_index_set() {
        // Degree n-1 over n points has one root between each pair of neighbours.
        let solver = OrthogonalBasisSolver::default();
        let roots = solver.roots(&RADII, RADII.len() - 1).unwrap();
        let mut xs = RADII.to_vec();
        xs.sort_by(|a, b| a.total_cmp(b));
        for (r, w) in roots.iter().zip(xs.windows(2)) {
            assert!(w[0] < *r && *r < w[1], "root {r} outside ({}, {})", w[0], w[1]);
        }
    }

    #[test]
    fn raw_residuals_vanish_for_solved_roots() {
        let solver = OrthogonalBasisSolver::default();
        for roots in solver.constants(&RADII, 8).unwrap().iter() {
            for r in orthogonality_residuals(&RADII, roots) {
                assert!(r.abs() <= 1e-12, "degree {}: residual {r:e}", roots.len());
            }
        }
    }

    #[test]
    fn roots_are_sorted_and_inside_the_index_range() {
        let solver = OrthogonalBasisSolver::default();
        let roots = solver.roots(&RADII, 5).unwrap();
        assert!(roots.windows(2).all(|w| w[0] < w[1]));
        assert!(roots[0] > 0.977 && roots[4] < 1.160);
    }

    #[test]
    fn symmetric_grid_gives_symmetric_roots() {
        // Discrete Legendre-like case: roots mirror around the centre.
        let xs = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let solver = OrthogonalBasisSolver::default();
        let roots = solver.roots(&xs, 2).unwrap();
        assert_abs_diff_eq!(roots[0], -(2f64.sqrt()), epsilon = 1e-10);
        assert_abs_diff_eq!(roots[1], 2f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let solver = OrthogonalBasisSolver::default();
        let a = solver.constants(&RADII, 4).unwrap();
        assert_eq!(solver.store().len(), 4);
        let b = solver.constants(&RADII, 4).unwrap();
        assert_eq!(solver.store().len(), 4);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(Arc::ptr_eq(x, y));
        }

        // A larger query reuses the lower degrees.
        let c = solver.constants(&RADII, 5).unwrap();
        assert_eq!(solver.store().len(), 5);
        assert!(Arc::ptr_eq(&a[3], &c[3]));
    }

    #[test]
    fn rounding_is_part_of_the_key() {
        let store = MemoryStore::new();
        let rounded = OrthogonalBasisSolver::with_store(
            store,
            EngineConfig {
                rounding: Some(3),
                ..EngineConfig::default()
            },
        );
        let roots = rounded.roots(&RADII, 2).unwrap();
        for r in roots.iter() {
            assert_abs_diff_eq!(*r, (r * 1000.0).round() / 1000.0, epsilon = 1e-15);
        }
        let plain = OrthogonalBasisSolver::default();
        assert_ne!(plain.roots(&RADII, 2).unwrap()[0], roots[0]);
    }

    #[test]
    fn iteration_limit_is_not_part_of_the_key() {
        let xs = [0.5, 1.0, 1.5, 2.5];
        let cfg = EngineConfig::default();
        let generous = EngineConfig {
            max_iter: cfg.max_iter * 5,
            ..cfg
        };
        assert_eq!(
            BasisKey::new(&xs, 2, cfg.rounding, cfg.tol),
            BasisKey::new(&xs, 2, generous.rounding, generous.tol)
        );
        let a = OrthogonalBasisSolver::new(cfg).roots(&xs, 2).unwrap();
        let b = OrthogonalBasisSolver::new(generous).roots(&xs, 2).unwrap();
        assert_eq!(&a[..], &b[..]);
    }

    #[test]
    fn store_keeps_first_insert() {
        let store = MemoryStore::new();
        let key = BasisKey::new(&[1.0, 2.0], 1, None, 1e-12);
        let first = store.insert(key.clone(), vec![1.5].into());
        let second = store.insert(key.clone(), vec![9.0].into());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.get(&key).unwrap()[0], 1.5);
    }

    #[test]
    fn non_convergence_is_reported() {
        let solver = OrthogonalBasisSolver::new(EngineConfig {
            max_iter: 0,
            ..EngineConfig::default()
        });
        let err = solver.roots(&RADII, 3).unwrap_err();
        assert!(matches!(err, AppError::Convergence { degree: 3, .. }));
        assert!(solver.store().is_empty());
    }

    #[test]
    fn invalid_index_sets_are_rejected() {
        let solver = OrthogonalBasisSolver::default();
        assert!(solver.constants(&[1.0], 1).is_err());
        assert!(solver.constants(&[1.0, 1.0, 2.0], 2).is_err());
        assert!(solver.constants(&[1.0, f64::NAN], 1).is_err());
        assert!(solver.constants(&[1.0, 2.0, 3.0], 4).is_err());
    }
}

//! Damped Newton iteration for small square nonlinear systems.
//!
//! Each step solves `J(x) Δ = -F(x)` with the SVD least-squares routine (so a
//! nearly singular Jacobian yields a minimum-norm step instead of a panic),
//! then backtracks `x + t Δ` with `t = 1, 1/2, 1/4, …` until the residual norm
//! decreases. The iteration count is always bounded.
//!
//! Convergence is only accepted after at least one step, so a seed whose
//! residual happens to be small is still refined and checked.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Smallest step fraction tried by the backtracking line search.
const MIN_STEP: f64 = 1e-10;

/// Options for [`damped_newton`].
#[derive(Debug, Clone, Copy)]
pub struct NewtonOptions {
    /// Converged when `max_k |F_k(x)| <= tol` after at least one step.
    pub tol: f64,
    pub max_iter: usize,
}

/// Final state of a Newton run, converged or not.
#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    pub x: DVector<f64>,
    pub iterations: usize,
    /// Max-norm of the residual at `x`.
    pub residual: f64,
    pub converged: bool,
}

/// Solve `F(x) = 0` starting at `x0`.
///
/// `residual` fills `F(x)`; `jacobian` fills `∂F_k/∂x_j` at row `k`, column `j`.
pub fn damped_newton<F, J>(
    x0: DVector<f64>,
    residual: F,
    jacobian: J,
    opts: NewtonOptions,
) -> NewtonOutcome
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let mut x = x0;
    let mut f = residual(&x);
    let mut iterations = 0;

    loop {
        let res = f.amax();
        if !res.is_finite() {
            return NewtonOutcome {
                x,
                iterations,
                residual: res,
                converged: false,
            };
        }
        if iterations > 0 && res <= opts.tol {
            return NewtonOutcome {
                x,
                iterations,
                residual: res,
                converged: true,
            };
        }
        if iterations >= opts.max_iter {
            return NewtonOutcome {
                x,
                iterations,
                residual: res,
                converged: false,
            };
        }
        iterations += 1;

        let jac = jacobian(&x);
        let Some(step) = solve_least_squares(&jac, &(-&f)) else {
            return NewtonOutcome {
                x,
                iterations,
                residual: res,
                converged: false,
            };
        };

        let norm = f.norm();
        let mut t = 1.0;
        let (x_next, f_next) = loop {
            let trial = &x + &step * t;
            let f_trial = residual(&trial);
            if f_trial.norm() < norm || t <= MIN_STEP {
                break (trial, f_trial);
            }
            t *= 0.5;
        };

        if x_next == x {
            // The step vanished in floating point; further iterations cannot help.
            return NewtonOutcome {
                x,
                iterations,
                residual: res,
                converged: res <= opts.tol,
            };
        }

        log::trace!("newton iter {iterations}: |F|max={res:.3e}, step fraction {t}");
        x = x_next;
        f = f_next;
    }
}

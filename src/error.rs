//! Error type shared by the numerical engine and the `lambdas` binary.
//!
//! Every failure is caller-visible and never retried internally. The binary
//! maps each kind to a process exit code:
//!
//! - `2`: invalid input or configuration
//! - `3`: not enough usable observations for the requested model
//! - `4`: numerical failure (no convergence, degenerate covariance, NaN/inf)

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// The orthogonal-basis root solve did not reach the tolerance.
    #[error(
        "Basis root solve for degree {degree} did not converge after {iterations} iterations (max residual {residual:.3e})."
    )]
    Convergence {
        degree: usize,
        iterations: usize,
        residual: f64,
    },

    /// Degrees of freedom `observations - coefficients - 1` is not positive.
    #[error(
        "Insufficient data: {observations} usable observations cannot support {coefficients} lambdas (need at least {}).",
        .coefficients + 2
    )]
    InsufficientData {
        observations: usize,
        coefficients: usize,
    },

    /// Covariance determinant is zero or negative.
    #[error("Degenerate covariance matrix (determinant {determinant:.3e}).")]
    DegenerateCovariance { determinant: f64 },

    /// A NaN or infinity appeared in an intermediate result.
    #[error("Non-finite value in {0}.")]
    NonFinite(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn non_finite(context: impl Into<String>) -> Self {
        AppError::NonFinite(context.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InvalidInput(_) => 2,
            AppError::InsufficientData { .. } => 3,
            AppError::Convergence { .. }
            | AppError::DegenerateCovariance { .. }
            | AppError::NonFinite(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(AppError::invalid("bad").exit_code(), 2);
        let err = AppError::InsufficientData {
            observations: 5,
            coefficients: 4,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("need at least 6"));
        assert_eq!(AppError::non_finite("lambdas").exit_code(), 4);
    }
}

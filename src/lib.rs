//! `ree-lambdas` library crate.
//!
//! Shape coefficients ("lambdas") of rare-earth-element patterns: an
//! orthogonal polynomial basis over the ionic radii, least-squares fitting,
//! Eu/Ce anomaly selection and model-order probabilities.
//!
//! The binary (`lambdas`) is a thin wrapper so the numerical code is testable
//! and reusable without spawning processes. Most callers want
//! [`engine::LambdaEngine`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod report;

pub use engine::LambdaEngine;
pub use error::{AppError, Result};

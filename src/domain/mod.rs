//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - numerical settings (`EngineConfig`)
//! - the anomaly hypotheses (`AnomalyCode`)
//! - fit outputs (`LambdaFit`, `AnomalyFit`, `OrderDistribution`, etc.)

pub mod types;

pub use types::*;

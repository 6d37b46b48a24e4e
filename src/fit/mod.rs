//! Lambda fitting orchestration.
//!
//! Responsibilities:
//!
//! - regress lambdas for one coefficient count (`fitter`)
//! - score a fit by relative likelihood (`probability`)
//! - choose the best Eu/Ce anomaly hypothesis (`anomaly`)
//! - build a probability distribution over coefficient counts (`selection`)

pub mod anomaly;
pub mod fitter;
pub mod probability;
pub mod selection;

pub use anomaly::*;
pub use fitter::*;
pub use probability::*;
pub use selection::*;

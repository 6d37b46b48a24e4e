//! Lambda model implementation.
//!
//! Models are implemented as small, pure functions so that fitting/selection
//! code can stay generic over the basis.

pub mod model;

pub use model::*;

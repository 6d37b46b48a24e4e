//! Mathematical utilities: orthogonal basis construction, Newton root
//! finding, and least squares.

pub mod basis;
pub mod newton;
pub mod ols;

pub use basis::*;
pub use newton::*;
pub use ols::*;

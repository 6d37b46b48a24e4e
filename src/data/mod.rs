//! Static reference data and synthetic inputs.

pub mod reference;
pub mod sample;

pub use reference::*;
pub use sample::*;

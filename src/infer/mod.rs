//! Inference boundary.
//!
//! - checkpoint hyperparameters (`config`)
//! - the `SpectrumModel` seam and the batch driver (`driver`)

pub mod config;
pub mod driver;

pub use config::*;
pub use driver::*;

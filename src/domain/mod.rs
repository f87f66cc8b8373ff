//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the parameter lattice description (`ParameterBounds`, `Spacing`)
//! - geometry records and their file layout (`GeometryRecord`, `GeometryLayout`)
//! - lookup inputs and outputs (`TargetSpectrum`, `Candidate`, `LookupConfig`)

pub mod types;

pub use types::*;

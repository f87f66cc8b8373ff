//! `nanospec` library crate.
//!
//! The binary (`nspec`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the grid, dataset and lookup stages can be driven from other tools
//! - an inference backend only has to implement `infer::SpectrumModel`

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod grid;
pub mod infer;
pub mod io;
pub mod lookup;
pub mod plot;
pub mod report;

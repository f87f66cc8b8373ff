//! Input/output helpers.
//!
//! - CSV discovery in sorted order (`files`)
//! - candidate geometry streaming (`geometry`)
//! - training dataset ingest (`dataset`)
//! - spectrum library and target files (`library`)
//! - grid sidecar manifest (`manifest`)
//! - candidate exports (`export`)

pub mod dataset;
pub mod export;
pub mod files;
pub mod geometry;
pub mod library;
pub mod manifest;

pub use dataset::*;
pub use export::*;
pub use files::*;
pub use geometry::*;
pub use library::*;
pub use manifest::*;

//! Spectrum library lookup.
//!
//! Responsibilities:
//!
//! - score library spectra against a partial target (`score`)
//! - keep the best K in bounded memory (`topk`)
//! - scan a library file and report ranked candidates (`search`)

pub mod score;
pub mod search;
pub mod topk;

pub use score::*;
pub use search::*;
pub use topk::*;

//! Parameter lattice enumeration.
//!
//! - per-axis values with NumPy `arange` semantics (`axis`)
//! - streaming Cartesian product into a grid file (`enumerate`)

pub mod axis;
pub mod enumerate;

pub use axis::*;
pub use enumerate::*;

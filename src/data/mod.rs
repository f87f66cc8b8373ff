//! Training data preparation.
//!
//! - label decimation (`resample`)
//! - shuffle/batch/repeat adaptors (`stream`)
//! - train/validation assembly (`split`)
//! - ratio feature augmentation (`augment`)

pub mod augment;
pub mod resample;
pub mod split;
pub mod stream;

pub use augment::*;
pub use resample::*;
pub use split::*;
pub use stream::*;

//! utilities for interpolation.

mod bilinear;
pub use bilinear::*;

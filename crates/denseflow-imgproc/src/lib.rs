#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// feature detection module.
pub mod features;

/// image filtering module.
pub mod filter;

/// optical flow estimation module.
pub mod flow;

/// utilities for interpolation.
pub mod interpolation;

/// Pyramid operations
pub mod pyramid;

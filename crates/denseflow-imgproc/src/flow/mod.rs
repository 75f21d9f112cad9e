//! optical flow estimation module.
//!
//! Two estimators are provided: [`farneback`], a dense estimator based on
//! polynomial expansion, and [`lucas_kanade`], a sparse pyramidal tracker
//! for a set of feature points.

mod farneback;
pub use farneback::*;

mod lucas_kanade;
pub use lucas_kanade::*;

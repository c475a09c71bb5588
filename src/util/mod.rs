//! Utility types and functions.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Tick`] and tick/second conversion
//! - Math type re-exports from glam, [`BBox3f`]

mod error;
mod math;

pub use error::*;
pub use math::*;

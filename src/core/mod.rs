//! Core layer - time intervals and sampling configuration.
//!
//! This module provides:
//! - [`ValidityInterval`] - Tick range over which a sample is unchanged
//! - [`SamplingPolicy`] - Per-call sampling flags

mod interval;
mod policy;

pub use interval::ValidityInterval;
pub use policy::{SamplingPolicy, DEFAULT_TIME_STEP_SCALE};

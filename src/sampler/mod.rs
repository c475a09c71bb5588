//! Velocity sampling.
//!
//! - [`VelocitySampler`] - Single-object sampling with adaptive search
//! - [`VelocitySampler::sample_batch`] - Many objects in parallel

mod batch;
mod velocity;

pub use velocity::{Sampled, VelocitySampler};

//! # Motion Sampler
//!
//! Per-vertex velocity for animated meshes whose topology may change over
//! time.
//!
//! A mesh is sampled at a start tick; velocity is the finite difference
//! against a second sample that shares the start topology. When no such
//! sample exists at the requested end tick, the sampler searches for one
//! by shrinking the step geometrically towards the start, then tries one
//! tick before the start, and only then degrades or fails as configured.
//!
//! ## Modules
//!
//! - [`util`] - Ticks, math helpers, errors
//! - [`core`] - Validity intervals and sampling policy
//! - [`geom`] - Faces, snapshots, transforms, channels, output meshes
//! - [`source`] - Snapshot sources (keyframed scenes, caching)
//! - [`sampler`] - The velocity sampler
//!
//! ## Example
//!
//! ```ignore
//! use motion_sampler::prelude::*;
//!
//! let source = KeyframeSource::load("scene.json")?;
//! let sampler = VelocitySampler::new(SamplingPolicy::default());
//! let (mesh, validity) = sampler.sample_mesh(&source, "cube", 0, 200)?;
//! println!("{} vertices, valid {validity}", mesh.vertex_count());
//! ```

pub mod util;
pub mod core;
pub mod geom;
pub mod source;
pub mod sampler;

// Re-export commonly used types
pub use util::{Error, Result, Tick, TICKS_PER_SECOND};
pub use core::{SamplingPolicy, ValidityInterval};
pub use sampler::{Sampled, VelocitySampler};
pub use source::SnapshotSource;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{BBox3f, Error, Result, Tick, TICKS_PER_SECOND};
    pub use crate::core::{SamplingPolicy, ValidityInterval};
    pub use crate::geom::{
        copy_topology, Channel, ChannelCopier, FaceView, OutputMesh, PolyFaces, Snapshot,
        TransformSample, TriFaces,
    };
    pub use crate::source::{CachedSource, KeyframeSource, SnapshotSource};
    pub use crate::sampler::{Sampled, VelocitySampler};
}

//! Geometry types consumed and produced by the sampler.
//!
//! This module provides:
//! - [`FaceView`] with [`TriFaces`] / [`PolyFaces`] - Face storage
//! - [`Snapshot`] - Geometry of one object at one tick
//! - [`OutputMesh`] / [`copy_topology`] - Sampler output
//! - [`TransformSample`] / [`XformOp`] - Object-to-output transforms
//! - [`Channel`] / [`ChannelCopier`] - Auxiliary per-vertex/per-face data
//! - [`topology_equal`] - Topology comparison

pub mod channel;
pub mod face;
pub mod mesh;
pub mod snapshot;
pub mod topology;
pub mod xform;

pub use channel::{
    BulkChannelCopier, Channel, ChannelCopier, ChannelData, ElementCounts, GeometryScope,
    VELOCITY_CHANNEL,
};
pub use face::{FaceView, PolyFaces, TriFaces};
pub use mesh::{copy_topology, OutputMesh};
pub use snapshot::Snapshot;
pub use topology::{faces_equal, topology_equal};
pub use xform::{compose_ops, lerp_matrix, TransformSample, XformOp};

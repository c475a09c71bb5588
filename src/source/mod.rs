//! Snapshot sources - the oracles the sampler queries.
//!
//! A source answers three questions about an object at a tick: what its
//! geometry is, how it is placed in output space, and (for producers that
//! know it) what its per-vertex velocity is. Every answer carries the
//! interval over which it stays valid.
//!
//! - [`KeyframeSource`] - In-memory keyframed objects, loadable from JSON
//! - [`CachedSource`] - Memoizing wrapper around any source

mod cached;
mod keyframe;

use std::fmt::Display;

use glam::Vec3;

use crate::core::ValidityInterval;
use crate::geom::{FaceView, Snapshot, TransformSample};
use crate::util::{Result, Tick};

pub use cached::{CacheStats, CachedSource};
pub use keyframe::{Interpolation, KeyframeSource, MeshKey, ObjectTrack, Scene, TransformKey};

/// Time-indexed geometry provider.
///
/// Implementations report failures (missing objects, broken data) through
/// the crate [`Error`](crate::Error); the sampler propagates them unchanged.
pub trait SnapshotSource<F: FaceView> {
    /// Identifies an object. Its `Display` form names the object in errors.
    type Handle: ?Sized + Display;

    /// Geometry at `time` and the interval over which it is unchanged.
    fn snapshot(&self, handle: &Self::Handle, time: Tick) -> Result<(Snapshot<F>, ValidityInterval)>;

    /// Object-to-output transform at `time`.
    fn transform(&self, handle: &Self::Handle, time: Tick) -> Result<TransformSample>;

    /// Output-space per-vertex velocity at `time`, in units per tick.
    ///
    /// Only producers that track velocity natively return `Some`.
    fn direct_velocity(&self, _handle: &Self::Handle, _time: Tick) -> Result<Option<Vec<Vec3>>> {
        Ok(None)
    }
}

impl<F: FaceView, S: SnapshotSource<F> + ?Sized> SnapshotSource<F> for &S {
    type Handle = S::Handle;

    fn snapshot(&self, handle: &Self::Handle, time: Tick) -> Result<(Snapshot<F>, ValidityInterval)> {
        (**self).snapshot(handle, time)
    }

    fn transform(&self, handle: &Self::Handle, time: Tick) -> Result<TransformSample> {
        (**self).transform(handle, time)
    }

    fn direct_velocity(&self, handle: &Self::Handle, time: Tick) -> Result<Option<Vec<Vec3>>> {
        (**self).direct_velocity(handle, time)
    }
}

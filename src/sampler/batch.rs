//! Parallel sampling of many objects over the same interval.

use std::borrow::Borrow;

use rayon::prelude::*;

use super::{Sampled, VelocitySampler};
use crate::geom::FaceView;
use crate::source::SnapshotSource;
use crate::util::{Result, Tick};

impl VelocitySampler {
    /// Sample every handle over `[start, end]` on the rayon pool.
    ///
    /// Results come back in handle order. One object failing does not stop
    /// the others; each gets its own `Result`.
    #[tracing::instrument(skip_all, fields(count = handles.len(), start, end))]
    pub fn sample_batch<F, S, H>(
        &self,
        source: &S,
        handles: &[H],
        start: Tick,
        end: Tick,
    ) -> Vec<Result<Sampled<F>>>
    where
        F: FaceView,
        S: SnapshotSource<F> + Sync + ?Sized,
        H: Borrow<S::Handle> + Sync,
    {
        handles
            .par_iter()
            .map(|handle| self.sample(source, handle.borrow(), start, end))
            .collect()
    }
}

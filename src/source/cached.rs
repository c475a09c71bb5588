//! Memoizing snapshot source.
//!
//! The adaptive search and overlapping frame ranges query the same object
//! repeatedly. [`CachedSource`] remembers every snapshot and transform it
//! has seen together with its validity interval, and answers any later
//! query whose tick falls inside a remembered interval without touching
//! the wrapped source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;
use parking_lot::RwLock;

use super::SnapshotSource;
use crate::core::ValidityInterval;
use crate::geom::{FaceView, Snapshot, TransformSample};
use crate::util::{Result, Tick};

type SnapshotEntries<F> = HashMap<String, Vec<(ValidityInterval, Snapshot<F>)>>;
type TransformEntries = HashMap<String, Vec<TransformSample>>;

/// Hit/miss counters of a [`CachedSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Thread-safe caching wrapper around a snapshot source.
///
/// Objects are keyed by the `Display` form of their handle. Errors from
/// the wrapped source are passed through and never cached; direct
/// velocities are not cached.
pub struct CachedSource<S, F> {
    inner: S,
    snapshots: RwLock<SnapshotEntries<F>>,
    transforms: RwLock<TransformEntries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S, F: FaceView> CachedSource<S, F> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            snapshots: RwLock::new(HashMap::new()),
            transforms: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached entry and reset the counters.
    pub fn clear(&self) {
        self.snapshots.write().clear();
        self.transforms.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached snapshots across all objects.
    pub fn len(&self) -> usize {
        self.snapshots.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl<S, F> SnapshotSource<F> for CachedSource<S, F>
where
    S: SnapshotSource<F>,
    F: FaceView,
{
    type Handle = S::Handle;

    fn snapshot(&self, handle: &Self::Handle, time: Tick) -> Result<(Snapshot<F>, ValidityInterval)> {
        let key = handle.to_string();
        {
            let cache = self.snapshots.read();
            let hit = cache
                .get(&key)
                .and_then(|entries| entries.iter().find(|(validity, _)| validity.contains(time)));
            if let Some((validity, snapshot)) = hit {
                self.record(true);
                return Ok((snapshot.clone(), *validity));
            }
        }

        self.record(false);
        let (snapshot, validity) = self.inner.snapshot(handle, time)?;
        self.snapshots
            .write()
            .entry(key)
            .or_default()
            .push((validity, snapshot.clone()));
        Ok((snapshot, validity))
    }

    fn transform(&self, handle: &Self::Handle, time: Tick) -> Result<TransformSample> {
        let key = handle.to_string();
        {
            let cache = self.transforms.read();
            let hit = cache
                .get(&key)
                .and_then(|entries| entries.iter().find(|xf| xf.validity.contains(time)));
            if let Some(xf) = hit {
                self.record(true);
                return Ok(*xf);
            }
        }

        self.record(false);
        let xf = self.inner.transform(handle, time)?;
        self.transforms.write().entry(key).or_default().push(xf);
        Ok(xf)
    }

    fn direct_velocity(&self, handle: &Self::Handle, time: Tick) -> Result<Option<Vec<Vec3>>> {
        self.inner.direct_velocity(handle, time)
    }
}

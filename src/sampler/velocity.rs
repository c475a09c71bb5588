//! Temporal-consistency velocity sampling.
//!
//! Given a source and an interval `[start, end]`, produce the start-time
//! mesh in output space together with per-vertex velocity. The second
//! sample used for the finite difference must share the start topology;
//! when the geometry is not stable up to `end`, the sampler searches for
//! one by shrinking the step geometrically towards `start`, and finally
//! tries one tick before `start`.

use std::marker::PhantomData;

use glam::Vec3;
use tracing::{debug, trace};

use crate::core::{SamplingPolicy, ValidityInterval};
use crate::geom::{
    copy_topology, topology_equal, BulkChannelCopier, ChannelCopier, FaceView, OutputMesh,
    PolyFaces, Snapshot, TransformSample, TriFaces,
};
use crate::source::SnapshotSource;
use crate::util::{ticks_to_seconds, Error, Result, Tick, TICKS_PER_SECOND};

/// Result of one sampling call: the mesh and the interval it is valid for.
pub type Sampled<F> = (OutputMesh<F>, ValidityInterval);

/// Produces velocity-annotated meshes from a snapshot source.
///
/// The sampler holds only configuration; every call is independent.
pub struct VelocitySampler {
    policy: SamplingPolicy,
    copier: Box<dyn ChannelCopier>,
}

impl VelocitySampler {
    /// Sampler with the default [`BulkChannelCopier`].
    pub fn new(policy: SamplingPolicy) -> Self {
        Self {
            policy,
            copier: Box::new(BulkChannelCopier::all()),
        }
    }

    /// Replace the auxiliary channel copier.
    pub fn with_channel_copier(mut self, copier: impl ChannelCopier + 'static) -> Self {
        self.copier = Box::new(copier);
        self
    }

    pub fn policy(&self) -> &SamplingPolicy {
        &self.policy
    }

    /// Sample a triangle mesh.
    pub fn sample_mesh<S>(&self, source: &S, handle: &S::Handle, start: Tick, end: Tick) -> Result<Sampled<TriFaces>>
    where
        S: SnapshotSource<TriFaces> + ?Sized,
    {
        self.sample(source, handle, start, end)
    }

    /// Sample a polygon mesh.
    pub fn sample_poly_mesh<S>(&self, source: &S, handle: &S::Handle, start: Tick, end: Tick) -> Result<Sampled<PolyFaces>>
    where
        S: SnapshotSource<PolyFaces> + ?Sized,
    {
        self.sample(source, handle, start, end)
    }

    /// Sample any face layout.
    pub fn sample<F, S>(&self, source: &S, handle: &S::Handle, start: Tick, end: Tick) -> Result<Sampled<F>>
    where
        F: FaceView,
        S: SnapshotSource<F> + ?Sized,
    {
        self.policy.validate()?;
        let span = end
            .checked_sub(start)
            .filter(|span| *span >= 0)
            .ok_or(Error::InvalidTimeRange { start, end })?;

        let run = Run {
            source,
            handle,
            start,
            end,
            span,
            policy: &self.policy,
            _faces: PhantomData,
        };
        let (mut mesh, first, validity) = match run.execute()? {
            Outcome::Empty => {
                debug!(object = %handle, start, "empty mesh ignored");
                return Ok((OutputMesh::empty(), ValidityInterval::instant(start)));
            }
            Outcome::Mesh { mesh, first, validity } => (mesh, first, validity),
        };

        let counts = first.counts();
        self.copier.copy_channels(&first.channels, counts, &mut mesh.channels)?;
        Ok((mesh, validity))
    }
}

impl Default for VelocitySampler {
    fn default() -> Self {
        Self::new(SamplingPolicy::default())
    }
}

enum Outcome<F> {
    Empty,
    Mesh {
        mesh: OutputMesh<F>,
        /// Start-time snapshot, source of the auxiliary channels.
        first: Snapshot<F>,
        validity: ValidityInterval,
    },
}

/// Second sample found by the search.
struct Partner<F> {
    time: Tick,
    snapshot: Snapshot<F>,
}

/// State of a single sampling call.
struct Run<'a, F, S: SnapshotSource<F> + ?Sized>
where
    F: FaceView,
{
    source: &'a S,
    handle: &'a S::Handle,
    start: Tick,
    end: Tick,
    /// `end - start`, known not to overflow.
    span: Tick,
    policy: &'a SamplingPolicy,
    _faces: PhantomData<F>,
}

impl<'a, F, S> Run<'a, F, S>
where
    F: FaceView,
    S: SnapshotSource<F> + ?Sized,
{
    fn execute(&self) -> Result<Outcome<F>> {
        let (start, end) = (self.start, self.end);
        let xf_start = self.transform_at(start)?;
        let (first, first_validity) = self.source.snapshot(self.handle, start)?;

        if first.is_empty() {
            if self.policy.ignore_empty_meshes {
                return Ok(Outcome::Empty);
            }
            return Err(Error::EmptyGeometry {
                object: self.handle.to_string(),
            });
        }

        // Direct velocities are in output space, which object space bypasses
        let direct = if self.policy.use_object_space {
            None
        } else {
            self.source.direct_velocity(self.handle, start)?
        };
        if let Some(per_tick) = direct {
            trace!(object = %self.handle, start, "using direct velocities");
            let mut mesh = copy_topology(&first, &xf_start.matrix);
            let scale = TICKS_PER_SECOND as f32;
            mesh.set_velocities(per_tick.into_iter().map(|v| v * scale).collect())?;
            return Ok(Outcome::Mesh {
                mesh,
                first,
                validity: ValidityInterval::instant(start),
            });
        }

        if first_validity.contains(end) {
            let mut mesh = copy_topology(&first, &xf_start.matrix);
            if xf_start.validity.contains(end) {
                trace!(object = %self.handle, start, end, "static over interval");
                let validity = first_validity.intersect(&xf_start.validity);
                return Ok(Outcome::Mesh { mesh, first, validity });
            }

            // Stable geometry carried by a moving transform
            let xf_end = self.transform_at(end)?;
            let velocities = finite_difference(
                &xf_start,
                &first.positions,
                &xf_end,
                &first.positions,
                self.span,
            );
            mesh.set_velocities(velocities)?;
            return Ok(Outcome::Mesh {
                mesh,
                first,
                validity: ValidityInterval::instant(start),
            });
        }

        let mut mesh = copy_topology(&first, &xf_start.matrix);
        if let Some(partner) = self.search_forward(&first)? {
            debug!(object = %self.handle, start, partner = partner.time, "forward sample found");
            let xf_partner = self.transform_at(partner.time)?;
            let velocities = finite_difference(
                &xf_start,
                &first.positions,
                &xf_partner,
                &partner.snapshot.positions,
                partner.time - start,
            );
            mesh.set_velocities(velocities)?;
        } else if let Some(partner) = self.sample_backward(&first)? {
            debug!(object = %self.handle, start, "backward sample used");
            let xf_partner = self.transform_at(partner.time)?;
            let velocities = finite_difference(
                &xf_partner,
                &partner.snapshot.positions,
                &xf_start,
                &first.positions,
                start - partner.time,
            );
            mesh.set_velocities(velocities)?;
        } else if self.policy.ignore_topology_mismatch {
            debug!(object = %self.handle, start, "no consistent sample, velocity dropped");
        } else {
            return Err(Error::TopologyInstability {
                object: self.handle.to_string(),
                time: start,
            });
        }

        Ok(Outcome::Mesh {
            mesh,
            first,
            validity: ValidityInterval::instant(start),
        })
    }

    fn transform_at(&self, time: Tick) -> Result<TransformSample> {
        if self.policy.use_object_space {
            return Ok(TransformSample::identity());
        }
        self.source.transform(self.handle, time)
    }

    /// Shrink the step from `end` towards `start` until the topology matches.
    ///
    /// Candidates that round to an already queried tick are skipped and do
    /// not count against `max_search_iterations`.
    fn search_forward(&self, first: &Snapshot<F>) -> Result<Option<Partner<F>>> {
        let start = self.start;
        let scale = self.policy.time_step_scale;
        let cap = self.policy.max_search_iterations;
        let mut candidate = self.end;
        let mut step = self.span as f64;
        let mut last_checked = None;
        let mut evaluated = 0u32;

        for _ in 0..step_bound(self.span, scale) {
            if candidate == start {
                return Ok(None);
            }
            if last_checked != Some(candidate) {
                if cap.is_some_and(|cap| evaluated >= cap) {
                    debug!(evaluated, "forward search hit candidate cap");
                    return Ok(None);
                }
                trace!(candidate, "trying forward candidate");
                let (snapshot, _) = self.source.snapshot(self.handle, candidate)?;
                if topology_equal(first, &snapshot) {
                    return Ok(Some(Partner { time: candidate, snapshot }));
                }
                evaluated += 1;
                last_checked = Some(candidate);
            }
            step *= scale;
            candidate = start + (step.round() as Tick).min(self.span);
        }
        Ok(None)
    }

    /// One sample a single tick before `start`.
    fn sample_backward(&self, first: &Snapshot<F>) -> Result<Option<Partner<F>>> {
        let Some(time) = self.start.checked_sub(1) else {
            return Ok(None);
        };
        let (snapshot, _) = self.source.snapshot(self.handle, time)?;
        Ok(topology_equal(first, &snapshot).then_some(Partner { time, snapshot }))
    }
}

/// Number of steps after which `span * scale^n` rounds to zero, plus slack.
fn step_bound(span: Tick, scale: f64) -> u64 {
    let span = span.max(1) as f64;
    ((0.5 / span).ln() / scale.ln()).ceil() as u64 + 2
}

/// Per-vertex velocity between two samples in output space, per second.
///
/// `earlier` is sampled `ticks` before `later`; both position arrays share
/// topology.
fn finite_difference(
    xf_earlier: &TransformSample,
    earlier: &[Vec3],
    xf_later: &TransformSample,
    later: &[Vec3],
    ticks: Tick,
) -> Vec<Vec3> {
    let inv_seconds = (1.0 / ticks_to_seconds(ticks)) as f32;
    earlier
        .iter()
        .zip(later)
        .map(|(&a, &b)| (xf_later.apply(b) - xf_earlier.apply(a)) * inv_seconds)
        .collect()
}

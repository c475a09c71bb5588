//! Output mesh produced by the sampler.

use glam::{Mat4, Vec3};

use super::channel::{Channel, ElementCounts};
use super::face::FaceView;
use super::snapshot::Snapshot;
use crate::util::{transform_points, BBox3f, Error, Result};

/// Mesh in output space with optional per-vertex velocity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputMesh<F> {
    /// Vertex positions in output space.
    pub positions: Vec<Vec3>,
    /// Faces copied verbatim from the start-time snapshot.
    pub faces: F,
    /// Per-vertex velocity, output-space units per second.
    pub velocities: Option<Vec<Vec3>>,
    /// Auxiliary channels.
    pub channels: Vec<Channel>,
}

impl<F: FaceView> OutputMesh<F> {
    /// Empty mesh (no vertices, no faces, no velocity).
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.face_count()
    }

    pub fn counts(&self) -> ElementCounts {
        ElementCounts::new(self.vertex_count(), self.face_count())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn has_velocities(&self) -> bool {
        self.velocities.is_some()
    }

    /// Attach a velocity channel, checking its length.
    pub fn set_velocities(&mut self, velocities: Vec<Vec3>) -> Result<()> {
        if velocities.len() != self.vertex_count() {
            return Err(Error::ChannelLength {
                name: super::channel::VELOCITY_CHANNEL.to_string(),
                expected: self.vertex_count(),
                actual: velocities.len(),
            });
        }
        self.velocities = Some(velocities);
        Ok(())
    }

    /// Output-space bounds of the positions.
    pub fn bounds(&self) -> BBox3f {
        BBox3f::from_points(&self.positions)
    }

    /// Largest velocity magnitude, zero without a velocity channel.
    pub fn max_speed(&self) -> f32 {
        self.velocities
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|v| v.length())
            .fold(0.0, f32::max)
    }

    /// Positions as a flat `[x, y, z, x, y, z, ...]` slice.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(self.positions.as_slice())
    }

    /// Velocities as a flat slice, if present.
    pub fn velocities_flat(&self) -> Option<&[f32]> {
        self.velocities.as_deref().map(|v| bytemuck::cast_slice(v))
    }
}

/// Copy a snapshot's geometry through a transform.
///
/// Produces positions and faces only; velocity and auxiliary channels are
/// layered on afterwards.
pub fn copy_topology<F: FaceView>(snapshot: &Snapshot<F>, transform: &Mat4) -> OutputMesh<F> {
    let positions = if *transform == Mat4::IDENTITY {
        snapshot.positions.clone()
    } else {
        transform_points(transform, &snapshot.positions)
    };
    OutputMesh {
        positions,
        faces: snapshot.faces.clone(),
        velocities: None,
        channels: Vec::new(),
    }
}

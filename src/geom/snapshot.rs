//! Point-in-time geometry captured from a snapshot source.

use glam::Vec3;

use super::channel::{Channel, ElementCounts};
use super::face::FaceView;
use crate::util::{BBox3f, Result};

/// Geometry of one object at one tick.
///
/// Created fresh by a source on every query and owned by the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot<F> {
    /// Vertex positions in object space.
    pub positions: Vec<Vec3>,
    /// Face connectivity.
    pub faces: F,
    /// Auxiliary channels (uv, color, material ids...).
    pub channels: Vec<Channel>,
}

impl<F: FaceView> Snapshot<F> {
    pub fn new(positions: Vec<Vec3>, faces: F) -> Self {
        Self {
            positions,
            faces,
            channels: Vec::new(),
        }
    }

    /// Add an auxiliary channel.
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.face_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn counts(&self) -> ElementCounts {
        ElementCounts::new(self.vertex_count(), self.face_count())
    }

    /// Check face indices and channel lengths.
    pub fn validate(&self) -> Result<()> {
        self.faces.validate(self.vertex_count())?;
        let counts = self.counts();
        for channel in &self.channels {
            channel.validate(counts)?;
        }
        Ok(())
    }

    /// Object-space bounds.
    pub fn bounds(&self) -> BBox3f {
        BBox3f::from_points(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{ChannelData, TriFaces};

    #[test]
    fn test_snapshot_empty() {
        let s: Snapshot<TriFaces> = Snapshot::default();
        assert!(s.is_empty());
        assert_eq!(s.face_count(), 0);
        assert!(s.validate().is_ok());
        assert!(s.bounds().is_empty());
    }

    #[test]
    fn test_snapshot_validate() {
        let s = Snapshot::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            TriFaces::new(vec![[0, 1, 2]]),
        );
        assert!(s.validate().is_ok());

        let bad_channel = s.clone().with_channel(Channel::vertex("w", ChannelData::Float(vec![0.0])));
        assert!(bad_channel.validate().is_err());

        let bad_face = Snapshot::new(vec![Vec3::ZERO], TriFaces::new(vec![[0, 1, 2]]));
        assert!(bad_face.validate().is_err());
    }
}

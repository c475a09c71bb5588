//! Auxiliary per-vertex and per-face channels.
//!
//! Channels are opaque to the velocity logic. Once the sampler has settled
//! topology and velocity it hands the start-time channels to a
//! [`ChannelCopier`], which decides what ends up on the output mesh.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Name reserved for the velocity channel produced by the sampler.
pub const VELOCITY_CHANNEL: &str = "velocity";

/// Which elements a channel holds one value for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryScope {
    /// One value per vertex.
    #[default]
    Vertex,
    /// One value per face.
    Face,
}

impl GeometryScope {
    /// Parse from string (short or long form).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "vtx" | "vertex" => Some(Self::Vertex),
            "uni" | "face" => Some(Self::Face),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Face => "face",
        }
    }
}

/// Typed channel payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ChannelData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
}

impl ChannelData {
    /// Number of elements (not scalars).
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Vec2(v) => v.len(),
            Self::Vec3(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar components per element.
    pub fn arity(&self) -> usize {
        match self {
            Self::Float(_) | Self::Int(_) => 1,
            Self::Vec2(_) => 2,
            Self::Vec3(_) => 3,
        }
    }
}

/// A named auxiliary channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub scope: GeometryScope,
    #[serde(flatten)]
    pub data: ChannelData,
}

impl Channel {
    pub fn new(name: impl Into<String>, scope: GeometryScope, data: ChannelData) -> Self {
        Self { name: name.into(), scope, data }
    }

    pub fn vertex(name: impl Into<String>, data: ChannelData) -> Self {
        Self::new(name, GeometryScope::Vertex, data)
    }

    pub fn face(name: impl Into<String>, data: ChannelData) -> Self {
        Self::new(name, GeometryScope::Face, data)
    }

    /// Check the element count against the mesh it belongs to.
    pub fn validate(&self, counts: ElementCounts) -> Result<()> {
        let expected = counts.for_scope(self.scope);
        let actual = self.data.len();
        if actual != expected {
            return Err(Error::ChannelLength {
                name: self.name.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// Vertex and face counts of a mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub vertices: usize,
    pub faces: usize,
}

impl ElementCounts {
    pub fn new(vertices: usize, faces: usize) -> Self {
        Self { vertices, faces }
    }

    #[inline]
    pub fn for_scope(&self, scope: GeometryScope) -> usize {
        match scope {
            GeometryScope::Vertex => self.vertices,
            GeometryScope::Face => self.faces,
        }
    }
}

/// Copies auxiliary channels from a snapshot onto an output mesh.
pub trait ChannelCopier: Send + Sync {
    fn copy_channels(
        &self,
        source: &[Channel],
        counts: ElementCounts,
        target: &mut Vec<Channel>,
    ) -> Result<()>;
}

/// Copies channels verbatim, optionally restricted to a set of names.
///
/// The reserved [`VELOCITY_CHANNEL`] is never copied; velocity always comes
/// from the sampler.
#[derive(Clone, Debug, Default)]
pub struct BulkChannelCopier {
    only: Option<Vec<String>>,
}

impl BulkChannelCopier {
    /// Copier that takes every channel.
    pub fn all() -> Self {
        Self { only: None }
    }

    /// Copier that takes only the named channels.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    fn wants(&self, name: &str) -> bool {
        if name == VELOCITY_CHANNEL {
            return false;
        }
        match &self.only {
            Some(names) => names.iter().any(|n| n == name),
            None => true,
        }
    }
}

impl ChannelCopier for BulkChannelCopier {
    fn copy_channels(
        &self,
        source: &[Channel],
        counts: ElementCounts,
        target: &mut Vec<Channel>,
    ) -> Result<()> {
        for channel in source.iter().filter(|c| self.wants(&c.name)) {
            channel.validate(counts)?;
            target.retain(|c| c.name != channel.name);
            target.push(channel.clone());
        }
        Ok(())
    }
}

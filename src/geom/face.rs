//! Face storage for triangle and polygon meshes.
//!
//! [`FaceView`] is the one capability the sampler needs from face data:
//! walk the faces in order and see each one as a slice of vertex indices.
//! [`TriFaces`] stores fixed-arity triangles, [`PolyFaces`] stores n-gons
//! in the counts/indices layout.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Read access to the faces of a mesh.
pub trait FaceView: Clone + Debug + Default + PartialEq + Send + Sync {
    /// Short name of the face layout (for diagnostics).
    const KIND: &'static str;

    /// Number of faces.
    fn face_count(&self) -> usize;

    /// Total number of face-vertex indices.
    fn index_count(&self) -> usize;

    /// Iterate faces in order, each as its vertex index slice.
    fn faces(&self) -> impl Iterator<Item = &[u32]> + '_;

    /// Check that every index is below `vertex_count`.
    fn validate(&self, vertex_count: usize) -> Result<()> {
        for (i, face) in self.faces().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(Error::invalid(format!(
                    "face {i} references vertex {bad}, mesh has {vertex_count} vertices"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Triangles
// ============================================================================

/// Fixed-arity triangle faces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriFaces(pub Vec<[u32; 3]>);

impl TriFaces {
    pub fn new(faces: Vec<[u32; 3]>) -> Self {
        Self(faces)
    }

    /// Flat index buffer, three indices per face.
    pub fn as_flat(&self) -> &[u32] {
        bytemuck::cast_slice(self.0.as_slice())
    }
}

impl FaceView for TriFaces {
    const KIND: &'static str = "triangles";

    #[inline]
    fn face_count(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn index_count(&self) -> usize {
        self.0.len() * 3
    }

    fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.0.iter().map(|f| f.as_slice())
    }
}

impl TryFrom<PolyFaces> for TriFaces {
    type Error = Error;

    fn try_from(poly: PolyFaces) -> Result<Self> {
        TriFaces::try_from(&poly)
    }
}

impl TryFrom<&PolyFaces> for TriFaces {
    type Error = Error;

    fn try_from(poly: &PolyFaces) -> Result<Self> {
        let mut tris = Vec::with_capacity(poly.face_count());
        for (i, face) in poly.faces().enumerate() {
            match face {
                &[a, b, c] => tris.push([a, b, c]),
                _ => {
                    return Err(Error::invalid(format!(
                        "face {i} has {} vertices, triangle mesh expected",
                        face.len()
                    )))
                }
            }
        }
        Ok(Self(tris))
    }
}

// ============================================================================
// Polygons
// ============================================================================

/// Variable-arity polygon faces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyFaces {
    /// Number of vertices per face.
    pub face_counts: Vec<u32>,
    /// Face vertex indices, concatenated.
    pub face_indices: Vec<u32>,
}

impl PolyFaces {
    /// Create from counts and indices, checking that they agree.
    pub fn new(face_counts: Vec<u32>, face_indices: Vec<u32>) -> Result<Self> {
        let total: usize = face_counts.iter().map(|&c| c as usize).sum();
        if total != face_indices.len() {
            return Err(Error::invalid(format!(
                "face counts sum to {total}, but {} face indices given",
                face_indices.len()
            )));
        }
        Ok(Self { face_counts, face_indices })
    }

    /// Build from one index list per face.
    pub fn from_polygons<I, P>(polygons: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u32]>,
    {
        let mut faces = Self::default();
        for poly in polygons {
            let poly = poly.as_ref();
            faces.face_counts.push(poly.len() as u32);
            faces.face_indices.extend_from_slice(poly);
        }
        faces
    }

    /// Copy faces out as one `Vec` per polygon.
    pub fn to_polygons(&self) -> Vec<Vec<u32>> {
        self.faces().map(|f| f.to_vec()).collect()
    }
}

impl FaceView for PolyFaces {
    const KIND: &'static str = "polygons";

    #[inline]
    fn face_count(&self) -> usize {
        self.face_counts.len()
    }

    #[inline]
    fn index_count(&self) -> usize {
        self.face_indices.len()
    }

    fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        let mut offset = 0usize;
        self.face_counts.iter().map(move |&count| {
            let start = offset.min(self.face_indices.len());
            offset += count as usize;
            let end = offset.min(self.face_indices.len());
            &self.face_indices[start..end]
        })
    }
}

impl From<&TriFaces> for PolyFaces {
    fn from(tris: &TriFaces) -> Self {
        Self {
            face_counts: vec![3; tris.0.len()],
            face_indices: tris.as_flat().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_faces() {
        let tris = TriFaces::new(vec![[0, 1, 2], [2, 1, 3]]);
        assert_eq!(tris.face_count(), 2);
        assert_eq!(tris.index_count(), 6);
        assert_eq!(tris.as_flat(), &[0, 1, 2, 2, 1, 3]);
        let faces: Vec<&[u32]> = tris.faces().collect();
        assert_eq!(faces[1], &[2, 1, 3]);
    }

    #[test]
    fn test_poly_faces_walk() {
        let poly = PolyFaces::from_polygons([vec![0, 1, 2, 3], vec![3, 2, 4]]);
        assert_eq!(poly.face_counts, vec![4, 3]);
        let faces: Vec<&[u32]> = poly.faces().collect();
        assert_eq!(faces, vec![&[0u32, 1, 2, 3][..], &[3, 2, 4][..]]);
        assert_eq!(poly.to_polygons(), vec![vec![0, 1, 2, 3], vec![3, 2, 4]]);
    }

    #[test]
    fn test_poly_faces_count_mismatch() {
        assert!(PolyFaces::new(vec![3, 3], vec![0, 1, 2]).is_err());
        assert!(PolyFaces::new(vec![3], vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn test_validate_indices() {
        let tris = TriFaces::new(vec![[0, 1, 5]]);
        assert!(tris.validate(6).is_ok());
        let err = tris.validate(5).unwrap_err();
        assert!(err.to_string().contains("vertex 5"));
    }

    #[test]
    fn test_poly_to_tri_conversion() {
        let poly = PolyFaces::from_polygons([[0u32, 1, 2], [2, 1, 3]]);
        let tris = TriFaces::try_from(&poly).unwrap();
        assert_eq!(tris.0, vec![[0, 1, 2], [2, 1, 3]]);
        assert_eq!(PolyFaces::from(&tris), poly);

        let quad = PolyFaces::from_polygons([[0u32, 1, 2, 3]]);
        assert!(TriFaces::try_from(quad).is_err());
    }
}

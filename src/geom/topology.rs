//! Topology comparison between snapshots.
//!
//! Two meshes share topology when they have the same vertex and face
//! counts and face `i` of one touches the same set of vertex indices as
//! face `i` of the other. Winding order inside a face is ignored; face
//! order is not. Meshes holding the same faces in a different order are
//! reported as different.
//!
//! The comparison runs inside the sampler's search loop, so index sets are
//! kept in an inline [`SmallVec`] and triangles or quads never allocate.

use smallvec::SmallVec;

use super::face::FaceView;
use super::snapshot::Snapshot;

/// Sorted, deduplicated vertex indices of one face.
type IndexSet = SmallVec<[u32; 4]>;

/// Insertion-sort a face's indices into `set`, dropping repeats.
#[inline]
fn fill_index_set(face: &[u32], set: &mut IndexSet) {
    set.clear();
    for &v in face {
        if let Err(pos) = set.binary_search(&v) {
            set.insert(pos, v);
        }
    }
}

/// Compare two face lists face-by-face as unordered index sets.
pub fn faces_equal<F: FaceView>(a: &F, b: &F) -> bool {
    if a.face_count() != b.face_count() {
        return false;
    }

    let mut set_a = IndexSet::new();
    let mut set_b = IndexSet::new();
    for (fa, fb) in a.faces().zip(b.faces()) {
        if fa.len() != fb.len() {
            return false;
        }
        fill_index_set(fa, &mut set_a);
        fill_index_set(fb, &mut set_b);
        if set_a != set_b {
            return false;
        }
    }
    true
}

/// Check whether two snapshots have identical topology.
pub fn topology_equal<F: FaceView>(a: &Snapshot<F>, b: &Snapshot<F>) -> bool {
    a.vertex_count() == b.vertex_count() && faces_equal(&a.faces, &b.faces)
}

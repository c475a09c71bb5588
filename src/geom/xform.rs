//! Transforms from object space to output space.
//!
//! Sources report a [`TransformSample`] per tick: a matrix plus the interval
//! over which it holds. Keyframed scenes describe transforms as a stack of
//! [`XformOp`]s composed in order.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::ValidityInterval;

/// A single transform operation. Angles are in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XformOp {
    Translate([f32; 3]),
    Scale([f32; 3]),
    RotateX(f32),
    RotateY(f32),
    RotateZ(f32),
    /// Axis (x, y, z) + angle.
    Rotate([f32; 4]),
    /// Row-major 4x4 matrix.
    Matrix([f32; 16]),
}

impl XformOp {
    /// Matrix of this operation alone.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Translate(t) => Mat4::from_translation(Vec3::from(t)),
            Self::Scale(s) => Mat4::from_scale(Vec3::from(s)),
            Self::RotateX(deg) => Mat4::from_rotation_x(deg.to_radians()),
            Self::RotateY(deg) => Mat4::from_rotation_y(deg.to_radians()),
            Self::RotateZ(deg) => Mat4::from_rotation_z(deg.to_radians()),
            Self::Rotate([x, y, z, deg]) => {
                let axis = Vec3::new(x, y, z).normalize_or_zero();
                if axis.length_squared() > 0.0001 {
                    Mat4::from_axis_angle(axis, deg.to_radians())
                } else {
                    Mat4::IDENTITY
                }
            }
            // Stored row-major, glam is column-major
            Self::Matrix(m) => Mat4::from_cols_array(&m).transpose(),
        }
    }
}

/// Compose an op stack into one matrix. Empty stack is identity.
pub fn compose_ops(ops: &[XformOp]) -> Mat4 {
    // Leftmost op is outermost: result = op0 * op1 * ... (column vectors)
    ops.iter().fold(Mat4::IDENTITY, |acc, op| acc * op.matrix())
}

/// Component-wise linear blend of two matrices.
///
/// Exact for translation and for linearly animated matrices; rotations
/// blended this way are not orthonormal in between.
#[inline]
pub fn lerp_matrix(a: &Mat4, b: &Mat4, t: f32) -> Mat4 {
    *a * (1.0 - t) + *b * t
}

/// Object-to-output matrix at one tick, with its validity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSample {
    pub matrix: Mat4,
    pub validity: ValidityInterval,
}

impl TransformSample {
    pub fn new(matrix: Mat4, validity: ValidityInterval) -> Self {
        Self { matrix, validity }
    }

    /// Identity transform valid for all time.
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            validity: ValidityInterval::FOREVER,
        }
    }

    /// Transform a point into output space.
    #[inline]
    pub fn apply(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }
}

impl Default for TransformSample {
    fn default() -> Self {
        Self::identity()
    }
}

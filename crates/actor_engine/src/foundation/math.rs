//! Math types for actor transforms
//!
//! Thin aliases over `nalgebra` plus a TRS [`Transform`] that can be composed,
//! inverted and rebuilt from a matrix. Reparenting relies on the last two.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Scale magnitudes below this are treated as degenerate during decomposition
const MIN_SCALE: f32 = 1e-8;

/// Local transform of an actor: position, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,

    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from all three parts
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Builder: replace the uniform scale
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Convert to a transformation matrix (T * R * S)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Rebuild a transform from an affine TRS matrix
    ///
    /// Shear introduced by non-uniform parent scale is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let column = |c: usize| Vec3::new(matrix[(0, c)], matrix[(1, c)], matrix[(2, c)]);
        let (x, y, z) = (column(0), column(1), column(2));
        let mut scale = Vec3::new(x.magnitude(), y.magnitude(), z.magnitude());

        // A mirrored basis keeps its handedness in the scale, not the rotation
        if x.cross(&y).dot(&z) < 0.0 {
            scale.x = -scale.x;
        }

        let axis = |v: Vec3, s: f32| if s.abs() > MIN_SCALE { v / s } else { Vec3::zeros() };
        let rotation_matrix = Mat3::from_columns(&[
            axis(x, scale.x),
            axis(y, scale.y),
            axis(z, scale.z),
        ]);
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        self.to_matrix().transform_point(point)
    }

    /// Combine this transform with a child transform (`self * other`)
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            position: self.position + self.rotation * self.scale.component_mul(&other.position),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Self {
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        let inv_rotation = self.rotation.inverse();
        let inv_position = inv_rotation * (-self.position.component_mul(&inv_scale));

        Self {
            position: inv_position,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }
}

/// Math utility functions
pub mod utils {
    use super::{Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Rotation whose -Z axis points along `direction`, Y-up right-handed
    ///
    /// Returns `None` when `direction` is too short to normalize.
    pub fn look_rotation(direction: Vec3, up: Vec3) -> Option<Quat> {
        let forward = direction.try_normalize(1e-6)?;
        // face_towards maps +Z onto its argument; actors look down -Z
        let up = if forward.cross(&up).magnitude() < 1e-6 {
            Vec3::z()
        } else {
            up
        };
        Some(Quat::face_towards(&-forward, &up))
    }
}

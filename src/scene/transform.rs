//! World matrix decomposition for Transform, Viewpoint and light nodes.

use glam::{Mat3, Mat4, Quat, Vec3};

/// A world matrix split into translation, axis-angle rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translation: Vec3,
    /// Rotation as a quaternion.
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Decomposed {
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Rotation as (axis, angle in radians).
    ///
    /// A zero rotation reports the Z axis, so identity transforms always
    /// print as `0 0 1 0`.
    pub fn axis_angle(&self) -> (Vec3, f32) {
        let (axis, angle) = self.rotation.to_axis_angle();
        if angle == 0.0 || !axis.is_finite() {
            (Vec3::Z, 0.0)
        } else {
            (axis, angle)
        }
    }

    /// Rotation as the four numbers of an X3D SFRotation.
    pub fn rotation_values(&self) -> [f32; 4] {
        let (axis, angle) = self.axis_angle();
        [axis.x, axis.y, axis.z, angle]
    }
}

/// The direction the matrix's local -Z axis points in world space.
pub fn neg_z_direction(matrix: &Mat4) -> Vec3 {
    (Mat3::from_mat4(*matrix) * Vec3::NEG_Z).normalize_or_zero()
}

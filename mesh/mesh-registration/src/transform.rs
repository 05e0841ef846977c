//! Rigid transformation type for registration results.

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

/// A rigid-body transformation: rotation followed by translation.
///
/// There is no scale term. Registration maps model space onto tracked world
/// space, and physical anatomy does not change size between the two.
///
/// # Example
///
/// ```
/// use mesh_registration::RigidTransform;
/// use nalgebra::{Point3, Rotation3, Vector3};
/// use std::f64::consts::PI;
///
/// // Rotate 90 degrees around Z, then translate
/// let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
/// let transform = RigidTransform::new(rotation, Vector3::new(1.0, 2.0, 3.0));
///
/// let p = transform.apply(&Point3::new(1.0, 0.0, 0.0));
/// assert!((p - Point3::new(1.0, 3.0, 3.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Proper rotation (determinant +1).
    pub rotation: Rotation3<f64>,
    /// Translation vector.
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Creates a new rigid transform with the given rotation and translation.
    #[must_use]
    pub const fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Creates an identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Creates a transform with only translation.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation,
        }
    }

    /// Creates a transform with only rotation.
    #[must_use]
    pub fn from_rotation(rotation: Rotation3<f64>) -> Self {
        Self {
            rotation,
            translation: Vector3::zeros(),
        }
    }

    /// Maps a model-space point into world space: `R·p + t`.
    #[must_use]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    /// The 3x3 rotation matrix.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        *self.rotation.matrix()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_transform() {
        let transform = RigidTransform::identity();
        let point = Point3::new(1.0, 2.0, 3.0);
        let result = transform.apply(&point);
        assert_relative_eq!(result.coords, point.coords, epsilon = 1e-10);
    }

    #[test]
    fn test_translation_only() {
        let translation = Vector3::new(1.0, 2.0, 3.0);
        let transform = RigidTransform::from_translation(translation);
        let result = transform.apply(&Point3::origin());
        assert_relative_eq!(result.coords, translation, epsilon = 1e-10);
    }

    #[test]
    fn test_rotation_90_degrees_z() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let transform = RigidTransform::from_rotation(rotation);
        let result = transform.apply(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(result.x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(result.y, 1.0, epsilon = 1e-10);
        assert_relative_eq!(result.z, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_default_is_identity() {
        assert_eq!(RigidTransform::default(), RigidTransform::identity());
    }
}

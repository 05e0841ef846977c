//! Homogeneous 4x4 transforms with slide/scale/rotate edits.
//!
//! Edits right-multiply the current matrix, so they act in the object's own
//! local frame: after a rotation, a slide along "up" moves along the object's
//! rotated Z axis rather than the world Z axis.
//!
//! For persistence a transform is split into translation, intrinsic XYZ Euler
//! angles (degrees) and per-axis scale; see [`TransformComponents`].

use mesh_types::Axis;
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Scale magnitudes below this are treated as zero when decomposing.
pub const DEGENERATE_SCALE: f64 = 1e-8;

/// Threshold on `|sin(y)|` above which the Y angle is treated as ±90°.
const GIMBAL_LOCK: f64 = 1.0 - 1e-12;

/// A 4x4 homogeneous transform: `rotation · scale` in the upper-left block,
/// translation in the last column, `[0, 0, 0, 1]` as the bottom row.
///
/// # Example
///
/// ```
/// use mesh_types::Axis;
/// use nalgebra::Point3;
/// use scene_transform::AffineTransform;
///
/// let t = AffineTransform::identity()
///     .compose_rotation(Axis::Z, 90.0)
///     .compose_translation(1.0, 0.0, 0.0);
///
/// // The slide happened along the rotated X axis, i.e. world +Y.
/// let p = t.transform_point(&Point3::origin());
/// assert!((p - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wraps an existing homogeneous matrix.
    #[must_use]
    pub const fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Builds a transform from 16 coefficients in row-major order.
    #[must_use]
    pub fn from_row_major(coefficients: &[f64; 16]) -> Self {
        Self {
            matrix: Matrix4::from_row_slice(coefficients),
        }
    }

    /// The 16 coefficients in row-major order.
    #[must_use]
    pub fn to_row_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.matrix[(i / 4, i % 4)];
        }
        out
    }

    /// The underlying matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// `M · T(dx, dy, dz)`.
    #[must_use]
    pub fn compose_translation(&self, dx: f64, dy: f64, dz: f64) -> Self {
        let step = Matrix4::new_translation(&Vector3::new(dx, dy, dz));
        Self {
            matrix: self.matrix * step,
        }
    }

    /// `M · S(sx, sy, sz)`.
    #[must_use]
    pub fn compose_scale(&self, sx: f64, sy: f64, sz: f64) -> Self {
        let step = Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz));
        Self {
            matrix: self.matrix * step,
        }
    }

    /// `M · R_axis(angle)`, angle in degrees.
    #[must_use]
    pub fn compose_rotation(&self, axis: Axis, angle_degrees: f64) -> Self {
        let rotation =
            Rotation3::from_axis_angle(&Unit::new_unchecked(axis.unit()), angle_degrees.to_radians());
        Self {
            matrix: self.matrix * rotation.to_homogeneous(),
        }
    }

    /// Splits the transform into translation, Euler angles and scale.
    ///
    /// Scale is the length of each column of the upper-left 3x3 block; the
    /// rotation is that block with each column normalized. When any scale is
    /// approximately zero the rotation is not recoverable and is reported as
    /// identity (all angles zero).
    #[must_use]
    pub fn decompose(&self) -> TransformComponents {
        let block: Matrix3<f64> = self.matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vector3::new(
            block.column(0).norm(),
            block.column(1).norm(),
            block.column(2).norm(),
        );
        let translation: Vector3<f64> = self.matrix.fixed_view::<3, 1>(0, 3).into_owned();

        let rotation_deg = if scale.iter().any(|s| s.abs() < DEGENERATE_SCALE) {
            Vector3::zeros()
        } else {
            let mut rotation = block;
            for (i, s) in scale.iter().enumerate() {
                rotation.column_mut(i).unscale_mut(*s);
            }
            euler_xyz_from_matrix(&rotation).map(f64::to_degrees)
        };

        TransformComponents {
            translation,
            rotation_deg,
            scale,
        }
    }

    /// Rebuilds a transform from its components.
    ///
    /// The rotation is built from the Euler angles, each column is scaled by
    /// the matching scale factor and the translation fills the last column.
    #[must_use]
    pub fn compose(components: &TransformComponents) -> Self {
        let rotation = matrix_from_euler_xyz(&components.rotation_deg.map(f64::to_radians));
        let block = rotation * Matrix3::from_diagonal(&components.scale);

        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&block);
        matrix
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&components.translation);
        Self { matrix }
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Whether every coefficient is within `epsilon` of the identity.
    #[must_use]
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.matrix - Matrix4::identity()).abs().max() <= epsilon
    }
}

/// Translation, rotation and scale of an [`AffineTransform`].
///
/// Rotation is stored as intrinsic XYZ Euler angles in degrees, i.e. the
/// rotation matrix is `Rx(x) · Ry(y) · Rz(z)`: rotate about X, then about the
/// rotated Y, then about the twice-rotated Z.
///
/// This is not the extrinsic `xyz` order (lowercase `"xyz"` in scipy, or
/// nalgebra's [`Rotation3::from_euler_angles`]), which builds
/// `Rz(z) · Ry(y) · Rx(x)` and equals intrinsic ZYX. Rows written with that
/// convention decode to a different rotation here unless converted first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformComponents {
    /// Translation along x, y, z.
    pub translation: Vector3<f64>,
    /// Euler angles about x, y, z in degrees.
    pub rotation_deg: Vector3<f64>,
    /// Scale factor along each local axis.
    pub scale: Vector3<f64>,
}

impl Default for TransformComponents {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation_deg: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
        }
    }
}

impl TransformComponents {
    /// Creates components from plain arrays.
    #[must_use]
    pub fn new(translation: [f64; 3], rotation_deg: [f64; 3], scale: [f64; 3]) -> Self {
        Self {
            translation: Vector3::from(translation),
            rotation_deg: Vector3::from(rotation_deg),
            scale: Vector3::from(scale),
        }
    }

    /// The nine values in persisted order: translation, rotation, scale.
    #[must_use]
    pub fn to_array(&self) -> [f64; 9] {
        let t = &self.translation;
        let r = &self.rotation_deg;
        let s = &self.scale;
        [t.x, t.y, t.z, r.x, r.y, r.z, s.x, s.y, s.z]
    }

    /// Inverse of [`to_array`](Self::to_array).
    #[must_use]
    pub fn from_array(values: [f64; 9]) -> Self {
        Self::new(
            [values[0], values[1], values[2]],
            [values[3], values[4], values[5]],
            [values[6], values[7], values[8]],
        )
    }
}

/// `Rx(a) · Ry(b) · Rz(c)` for angles in radians.
fn matrix_from_euler_xyz(angles: &Vector3<f64>) -> Matrix3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), angles.x);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), angles.y);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), angles.z);
    (rx * ry * rz).into_inner()
}

/// Angles `(a, b, c)` in radians such that `Rx(a) · Ry(b) · Rz(c) = r`.
///
/// At gimbal lock (`b = ±90°`) only `a ± c` is determined; `c` is set to 0.
fn euler_xyz_from_matrix(r: &Matrix3<f64>) -> Vector3<f64> {
    let sin_b = r[(0, 2)].clamp(-1.0, 1.0);
    let b = sin_b.asin();

    if sin_b.abs() < GIMBAL_LOCK {
        let a = (-r[(1, 2)]).atan2(r[(2, 2)]);
        let c = (-r[(0, 1)]).atan2(r[(0, 0)]);
        Vector3::new(a, b, c)
    } else {
        let a = r[(2, 1)].atan2(r[(1, 1)]);
        Vector3::new(a, b, 0.0)
    }
}

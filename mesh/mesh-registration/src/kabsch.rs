//! Kabsch algorithm for computing optimal rigid transformations.
//!
//! The Kabsch algorithm finds the rotation and translation that minimize the
//! sum of squared distances between two paired sets of points.
//!
//! # Degenerate input
//!
//! At least three non-collinear pairs are needed for a unique rotation.
//! Collinear input still produces a proper rotation, but the spin about the
//! common line is arbitrary; a warning is logged in that case. Planar input
//! (all points on one plane) is well-posed: the reflection correction picks
//! the rotation rather than the mirror image.

use crate::{RegistrationError, RegistrationResult, RigidTransform};
use nalgebra::{Matrix3, Point3, Rotation3, Unit, UnitQuaternion, Vector3};
use tracing::warn;

/// Ratio of the second to the first singular value below which the
/// cross-covariance is treated as rank one (collinear points).
const COLLINEAR_RATIO: f64 = 1e-9;

/// Computes the least-squares rigid transform mapping `model_points` onto
/// `world_points`.
///
/// Steps: center both sets on their centroids, build the cross-covariance
/// `H = Σ aᵢ bᵢᵀ`, decompose `H = U Σ Vᵀ`, then
/// `R = V · diag(1, 1, d) · Uᵀ` with `d = sign(det(V Uᵀ))` and
/// `t = c_world − R · c_model`. The result never contains a scale term.
///
/// # Errors
///
/// Returns an error if:
/// - Either point set is empty
/// - The point sets have different lengths
/// - SVD computation fails
///
/// # Example
///
/// ```
/// use mesh_registration::compute_rigid_transform;
/// use nalgebra::Point3;
///
/// let model = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
///
/// // World is model translated by (1, 2, 3)
/// let world = vec![
///     Point3::new(1.0, 2.0, 3.0),
///     Point3::new(2.0, 2.0, 3.0),
///     Point3::new(1.0, 3.0, 3.0),
/// ];
///
/// let transform = compute_rigid_transform(&model, &world).unwrap();
///
/// let aligned = transform.apply(&model[0]);
/// assert!((aligned - world[0]).norm() < 1e-6);
/// ```
pub fn compute_rigid_transform(
    model_points: &[Point3<f64>],
    world_points: &[Point3<f64>],
) -> RegistrationResult<RigidTransform> {
    if model_points.is_empty() {
        return Err(RegistrationError::EmptyModelPoints);
    }
    if world_points.is_empty() {
        return Err(RegistrationError::EmptyWorldPoints);
    }
    if model_points.len() != world_points.len() {
        return Err(RegistrationError::MismatchedLengths {
            model: model_points.len(),
            world: world_points.len(),
        });
    }

    let model_centroid = compute_centroid(model_points);
    let world_centroid = compute_centroid(world_points);

    // H = sum(a_i * b_i^T)
    let mut h = Matrix3::zeros();
    for (m, w) in model_points.iter().zip(world_points) {
        let a = m.coords - model_centroid;
        let b = w.coords - world_centroid;
        h += a * b.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(RegistrationError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(RegistrationError::SvdFailed)?;

    let sigma = svd.singular_values;
    if sigma[0] > 0.0 && sigma[1] / sigma[0] < COLLINEAR_RATIO {
        warn!(
            points = model_points.len(),
            "correspondences are collinear, rigid fit is not unique"
        );
    }

    let rotation = orthonormalize(&proper_rotation(&u, &v_t));
    let translation = world_centroid - rotation * model_centroid;

    Ok(RigidTransform::new(rotation, translation))
}

/// `V · diag(1, 1, d) · Uᵀ` with `d` the sign of `det(V Uᵀ)`.
///
/// Singular values from `svd` are sorted in descending order, so the flipped
/// column of `V` belongs to the smallest one.
fn proper_rotation(u: &Matrix3<f64>, v_t: &Matrix3<f64>) -> Matrix3<f64> {
    let v = v_t.transpose();
    let d = if (v * u.transpose()).determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    v * correction * u.transpose()
}

/// Projects a nearly orthonormal matrix back onto SO(3).
///
/// The SVD product drifts by a few ulps, enough to push the trace of a
/// pure translation fit above 3. Rebuilding from the quaternion's axis and
/// angle keeps every diagonal entry at most 1; the angle uses `atan2` so it
/// stays accurate near the identity.
fn orthonormalize(m: &Matrix3<f64>) -> Rotation3<f64> {
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*m)).into_inner();
    let (w, imag) = if q.scalar() < 0.0 {
        (-q.scalar(), -q.imag())
    } else {
        (q.scalar(), q.imag())
    };
    match Unit::try_new_and_get(imag, 0.0) {
        Some((axis, sin_half)) => {
            UnitQuaternion::from_axis_angle(&axis, 2.0 * sin_half.atan2(w)).to_rotation_matrix()
        }
        None => Rotation3::identity(),
    }
}

/// Computes the centroid of a set of points.
fn compute_centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    sum / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn make_tetrahedron() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.3, 0.4, 2.0),
        ]
    }

    fn transformed(points: &[Point3<f64>], transform: &RigidTransform) -> Vec<Point3<f64>> {
        points.iter().map(|p| transform.apply(p)).collect()
    }

    #[test]
    fn test_pure_translation() {
        let model = make_tetrahedron();
        let translation = Vector3::new(5.0, 3.0, 2.0);
        let world = transformed(&model, &RigidTransform::from_translation(translation));

        let transform = compute_rigid_transform(&model, &world).unwrap();

        let angle = transform.rotation.angle();
        assert!(angle.is_finite(), "angle {angle}");
        assert!(angle < 1e-6);
        let trace = transform.rotation_matrix().trace();
        assert!(trace <= 3.0, "trace {trace}");
        assert_relative_eq!(transform.translation, translation, epsilon = 1e-6);
    }

    #[test]
    fn test_fit_rotation_stays_orthonormal() {
        let model = make_tetrahedron();
        let truth = RigidTransform::new(
            Rotation3::from_euler_angles(1.1, 0.4, -2.6),
            Vector3::new(-80.0, 15.0, 300.0),
        );
        let world = transformed(&model, &truth);

        let r = compute_rigid_transform(&model, &world)
            .unwrap()
            .rotation_matrix();

        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pure_rotation() {
        let model = make_tetrahedron();
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 4.0);
        let world = transformed(&model, &RigidTransform::from_rotation(rotation));

        let transform = compute_rigid_transform(&model, &world).unwrap();

        assert_relative_eq!(transform.rotation.angle(), PI / 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_recovers_rotation_and_translation() {
        let model = make_tetrahedron();
        let truth = RigidTransform::new(
            Rotation3::from_euler_angles(0.3, -0.7, 1.9),
            Vector3::new(10.0, -5.0, 42.0),
        );
        let world = transformed(&model, &truth);

        let transform = compute_rigid_transform(&model, &world).unwrap();

        assert_relative_eq!(
            transform.rotation_matrix(),
            truth.rotation_matrix(),
            epsilon = 1e-6
        );
        assert_relative_eq!(transform.translation, truth.translation, epsilon = 1e-6);
        for (m, w) in model.iter().zip(&world) {
            assert_relative_eq!(transform.apply(m), *w, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_planar_points() {
        // Three points always lie on a plane; the fit must still be exact.
        let model = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let truth = RigidTransform::new(
            Rotation3::from_axis_angle(&Vector3::y_axis(), PI / 3.0),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let world = transformed(&model, &truth);

        let transform = compute_rigid_transform(&model, &world).unwrap();

        for (m, w) in model.iter().zip(&world) {
            assert_relative_eq!(transform.apply(m), *w, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_reflection_handling() {
        let model = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        // Mirror across YZ plane
        let world: Vec<Point3<f64>> = model.iter().map(|p| Point3::new(-p.x, p.y, p.z)).collect();

        let transform = compute_rigid_transform(&model, &world).unwrap();

        assert_relative_eq!(
            transform.rotation_matrix().determinant(),
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_model() {
        let model: Vec<Point3<f64>> = vec![];
        let world = vec![Point3::new(1.0, 0.0, 0.0)];
        let result = compute_rigid_transform(&model, &world);
        assert!(matches!(result, Err(RegistrationError::EmptyModelPoints)));
    }

    #[test]
    fn test_empty_world() {
        let model = vec![Point3::new(1.0, 0.0, 0.0)];
        let world: Vec<Point3<f64>> = vec![];
        let result = compute_rigid_transform(&model, &world);
        assert!(matches!(result, Err(RegistrationError::EmptyWorldPoints)));
    }

    #[test]
    fn test_mismatched_lengths() {
        let model = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let world = vec![Point3::new(1.0, 0.0, 0.0)];
        let result = compute_rigid_transform(&model, &world);
        assert!(matches!(
            result,
            Err(RegistrationError::MismatchedLengths { model: 2, world: 1 })
        ));
    }

    #[test]
    fn test_collinear_points_still_return_rotation() {
        let model = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let world = transformed(
            &model,
            &RigidTransform::from_translation(Vector3::new(0.0, 1.0, 0.0)),
        );

        let transform = compute_rigid_transform(&model, &world).unwrap();

        assert_relative_eq!(
            transform.rotation_matrix().determinant(),
            1.0,
            epsilon = 1e-9
        );
        for (m, w) in model.iter().zip(&world) {
            assert_relative_eq!(transform.apply(m), *w, epsilon = 1e-6);
        }
    }
}

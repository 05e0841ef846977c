//! Property-based tests for rigid point registration.
//!
//! Run with: cargo test -p mesh-registration -- proptest

use mesh_registration::{RigidTransform, compute_rigid_transform};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A random proper rotation from a non-degenerate axis and an angle in (-pi, pi).
fn arb_rotation() -> impl Strategy<Value = Rotation3<f64>> {
    (
        prop::array::uniform3(-1.0..1.0f64),
        -std::f64::consts::PI + 1e-6..std::f64::consts::PI,
    )
        .prop_filter("axis must not be degenerate", |(axis, _)| {
            Vector3::from(*axis).norm() > 0.1
        })
        .prop_map(|(axis, angle)| {
            Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::from(axis)), angle)
        })
}

fn arb_rigid() -> impl Strategy<Value = RigidTransform> {
    (arb_rotation(), prop::array::uniform3(-500.0..500.0f64))
        .prop_map(|(rotation, t)| RigidTransform::new(rotation, Vector3::from(t)))
}

/// A well-spread tetrahedron plus up to 16 random points.
fn arb_model_points() -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(prop::array::uniform3(-100.0..100.0f64), 0..16).prop_map(|extra| {
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(40.0, 0.0, 0.0),
            Point3::new(0.0, 40.0, 0.0),
            Point3::new(0.0, 0.0, 40.0),
        ];
        points.extend(extra.into_iter().map(Point3::from));
        points
    })
}

/// Points on a 5x5 grid in the z = 0 plane, each lifted by its entry in `lifts`.
fn planar_grid(lifts: &[f64]) -> Vec<Point3<f64>> {
    lifts
        .iter()
        .enumerate()
        .map(|(i, dz)| {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = ((i % 5) as f64 * 12.5 - 25.0, (i / 5) as f64 * 12.5 - 25.0);
            Point3::new(x, y, *dz)
        })
        .collect()
}

/// A 5x5 grid whose first point sits `max_lift` above the plane and whose
/// other points are lifted by at most `max_lift`.
fn arb_near_planar_points(max_lift: f64) -> impl Strategy<Value = Vec<Point3<f64>>> {
    prop::collection::vec(-max_lift..max_lift, 24).prop_map(move |rest| {
        let mut lifts = vec![max_lift];
        lifts.extend(rest);
        planar_grid(&lifts)
    })
}

/// Largest distance of a point from the centroid of `points`.
fn spread(points: &[Point3<f64>]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let centroid = points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
    points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .fold(0.0, f64::max)
}

/// Relative accuracy expected from a fit whose cross-covariance has a
/// near-zero singular value.
const ILL_CONDITIONED_RELATIVE_TOLERANCE: f64 = 1e-7;

fn apply_all(transform: &RigidTransform, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    points.iter().map(|p| transform.apply(p)).collect()
}

// =============================================================================
// Property Tests: Exact Recovery
// =============================================================================

proptest! {
    /// A known rigid motion is recovered from exact correspondences.
    #[test]
    fn kabsch_recovers_known_motion(model in arb_model_points(), truth in arb_rigid()) {
        let world = apply_all(&truth, &model);

        let fit = compute_rigid_transform(&model, &world).unwrap();

        let rotation_error = (fit.rotation_matrix() - truth.rotation_matrix()).abs().max();
        prop_assert!(rotation_error < 1e-6, "rotation error {}", rotation_error);
        prop_assert!((fit.translation - truth.translation).norm() < 1e-6);

        for (m, w) in model.iter().zip(&world) {
            prop_assert!((fit.apply(m) - w).norm() < 1e-6);
        }
    }

    /// The fitted rotation is always proper, whatever the input.
    #[test]
    fn kabsch_rotation_is_proper(
        model in arb_model_points(),
        world in prop::collection::vec(prop::array::uniform3(-100.0..100.0f64), 20),
    ) {
        let world: Vec<Point3<f64>> = world
            .into_iter()
            .take(model.len())
            .map(Point3::from)
            .collect();

        let fit = compute_rigid_transform(&model, &world).unwrap();

        let det = fit.rotation_matrix().determinant();
        prop_assert!((det - 1.0).abs() < 1e-9, "determinant {}", det);
    }
}

// =============================================================================
// Property Tests: Ill-conditioned Input
// =============================================================================

proptest! {
    /// Exactly planar correspondences still yield the true motion.
    #[test]
    fn kabsch_planar_points(truth in arb_rigid()) {
        let model = planar_grid(&[0.0; 25]);
        let world = apply_all(&truth, &model);

        let fit = compute_rigid_transform(&model, &world).unwrap();

        prop_assert!((fit.rotation_matrix().determinant() - 1.0).abs() < 1e-9);
        for (m, w) in model.iter().zip(&world) {
            prop_assert!((fit.apply(m) - w).norm() < 1e-6);
        }
    }

    /// Nearly planar correspondences reproduce world points to a tolerance
    /// relative to the size of the problem.
    #[test]
    fn kabsch_near_planar_points(model in arb_near_planar_points(1e-3), truth in arb_rigid()) {
        let lift = model.iter().map(|p| p.z.abs()).fold(0.0, f64::max);
        prop_assert!(lift >= 1e-3, "points are exactly planar");

        let world = apply_all(&truth, &model);
        let fit = compute_rigid_transform(&model, &world).unwrap();

        let tolerance =
            ILL_CONDITIONED_RELATIVE_TOLERANCE * (spread(&model) + truth.translation.norm());
        prop_assert!((fit.rotation_matrix().determinant() - 1.0).abs() < 1e-9);
        for (m, w) in model.iter().zip(&world) {
            let residual = (fit.apply(m) - w).norm();
            prop_assert!(residual < tolerance, "residual {} tolerance {}", residual, tolerance);
        }
    }
}

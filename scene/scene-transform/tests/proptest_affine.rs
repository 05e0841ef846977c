//! Property-based tests for transform decomposition and prosthesis edits.
//!
//! Run with: cargo test -p scene-transform -- proptest

use mesh_types::{Axis, MeshRef};
use proptest::prelude::*;
use scene_transform::{
    AffineTransform, SceneRecord, SceneTransforms, SlideDirection, TransformComponents,
    TransformStack, TransformTarget,
};

// =============================================================================
// Strategies
// =============================================================================

/// Euler angles with the middle angle kept away from gimbal lock, where the
/// decomposition is unique.
fn arb_rotation_deg() -> impl Strategy<Value = [f64; 3]> {
    (-179.0..179.0f64, -89.0..89.0f64, -179.0..179.0f64).prop_map(|(a, b, c)| [a, b, c])
}

fn arb_components() -> impl Strategy<Value = TransformComponents> {
    (
        prop::array::uniform3(-300.0..300.0f64),
        arb_rotation_deg(),
        prop::array::uniform3(0.05..5.0f64),
    )
        .prop_map(|(t, r, s)| TransformComponents::new(t, r, s))
}

fn arb_axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

fn max_abs_diff(a: &AffineTransform, b: &AffineTransform) -> f64 {
    (a.matrix() - b.matrix()).abs().max()
}

// =============================================================================
// Property Tests: Decomposition
// =============================================================================

proptest! {
    /// Composing then decomposing recovers every component.
    #[test]
    fn decompose_inverts_compose(components in arb_components()) {
        let recovered = AffineTransform::compose(&components).decompose();

        prop_assert!((recovered.translation - components.translation).abs().max() < 1e-6);
        prop_assert!((recovered.rotation_deg - components.rotation_deg).abs().max() < 1e-6);
        prop_assert!((recovered.scale - components.scale).abs().max() < 1e-6);
    }

    /// Any edited transform survives a decompose/compose round trip.
    #[test]
    fn edited_transform_survives_round_trip(
        angles in prop::collection::vec((arb_axis(), -180.0..180.0f64), 1..6),
        slide in prop::array::uniform3(-50.0..50.0f64),
        scale in prop::array::uniform3(0.2..3.0f64),
    ) {
        let mut transform = AffineTransform::identity();
        for (axis, angle) in &angles {
            transform = transform.compose_rotation(*axis, *angle);
        }
        transform = transform
            .compose_translation(slide[0], slide[1], slide[2])
            .compose_scale(scale[0], scale[1], scale[2]);

        let rebuilt = AffineTransform::compose(&transform.decompose());

        prop_assert!(max_abs_diff(&rebuilt, &transform) < 1e-6);
    }

    /// A zero scale component reports identity rotation.
    #[test]
    fn degenerate_scale_gives_identity_rotation(
        rotation in arb_rotation_deg(),
        zero_axis in 0usize..3,
    ) {
        let mut scale = [1.0, 2.0, 0.5];
        scale[zero_axis] = 0.0;
        let components = TransformComponents::new([1.0, 2.0, 3.0], rotation, scale);

        let recovered = AffineTransform::compose(&components).decompose();

        prop_assert!(recovered.rotation_deg.iter().all(|a| *a == 0.0));
        prop_assert!((recovered.translation - components.translation).abs().max() < 1e-9);
    }
}

// =============================================================================
// Property Tests: Prosthesis Edits
// =============================================================================

proptest! {
    /// Sliding by an offset and then by its negation restores the transform.
    #[test]
    fn slide_then_reverse_restores(
        start in arb_components(),
        offsets in prop::collection::vec(-40.0..40.0f64, 6),
    ) {
        let mut stack = TransformStack::load(MeshRef::from("femur.stl"));
        stack.attach_prosthesis(MeshRef::from("cup-52.stl"));
        let start = AffineTransform::compose(&start);
        stack
            .set_matrix(TransformTarget::Prosthesis, &start.to_row_major())
            .unwrap();

        for (direction, value) in SlideDirection::ALL.iter().zip(&offsets) {
            stack.slide(*direction, *value).unwrap();
        }
        for (direction, value) in SlideDirection::ALL.iter().zip(&offsets) {
            stack.slide(*direction, -*value).unwrap();
        }

        let end = stack.prosthesis().unwrap();
        prop_assert!(max_abs_diff(end, &start) < 1e-6);
    }

    /// A saved record restores the same matrices into a fresh scene.
    #[test]
    fn record_restores_scene(bone in arb_components(), prosthesis in arb_components()) {
        let mut original = TransformStack::load(MeshRef::from("tibia.stl"));
        original.attach_prosthesis(MeshRef::from("tray-4.stl"));
        original.restore(&SceneTransforms {
            bone,
            prosthesis: Some(prosthesis),
        });

        let record = SceneRecord::from(&original.snapshot());
        let transforms = record.transforms().unwrap();

        let mut fresh = TransformStack::load(MeshRef::from("tibia.stl"));
        fresh.attach_prosthesis(MeshRef::from("tray-4.stl"));
        prop_assert!(fresh.restore(&transforms));

        prop_assert!(max_abs_diff(fresh.bone(), original.bone()) < 1e-6);
        prop_assert!(
            max_abs_diff(fresh.prosthesis().unwrap(), original.prosthesis().unwrap()) < 1e-6
        );
    }
}

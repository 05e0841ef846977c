//! Bone and prosthesis transforms of a single planning scene.

use std::fmt;
use std::str::FromStr;

use mesh_types::{Axis, MeshRef};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affine::AffineTransform;
use crate::error::{SceneError, SceneResult};
use crate::record::SceneTransforms;

/// Direction of a prosthesis slide, in the prosthesis' local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideDirection {
    /// +Z
    Up,
    /// -Z
    Down,
    /// -X
    Left,
    /// +X
    Right,
    /// +Y
    Forward,
    /// -Y
    Backward,
}

impl SlideDirection {
    /// All six directions.
    pub const ALL: [Self; 6] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::Forward,
        Self::Backward,
    ];

    /// The translation produced by sliding `value` units in this direction.
    #[must_use]
    pub fn offset(self, value: f64) -> Vector3<f64> {
        match self {
            Self::Up => Vector3::new(0.0, 0.0, value),
            Self::Down => Vector3::new(0.0, 0.0, -value),
            Self::Left => Vector3::new(-value, 0.0, 0.0),
            Self::Right => Vector3::new(value, 0.0, 0.0),
            Self::Forward => Vector3::new(0.0, value, 0.0),
            Self::Backward => Vector3::new(0.0, -value, 0.0),
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

impl fmt::Display for SlideDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlideDirection {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| SceneError::InvalidDirection(s.to_string()))
    }
}

/// Which scene object a matrix read or write applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformTarget {
    /// The patient bone.
    Bone,
    /// The attached prosthesis.
    Prosthesis,
}

impl fmt::Display for TransformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bone => f.write_str("bone"),
            Self::Prosthesis => f.write_str("prosthesis"),
        }
    }
}

impl FromStr for TransformTarget {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bone" => Ok(Self::Bone),
            "prosthesis" => Ok(Self::Prosthesis),
            _ => Err(SceneError::InvalidTarget(s.to_string())),
        }
    }
}

/// What [`TransformStack::attach_prosthesis`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// No prosthesis was attached; a new one starts at identity.
    Attached,
    /// The same prosthesis was already attached; its transform is kept.
    Unchanged,
    /// A different prosthesis was attached; the new one starts at identity.
    Replaced,
}

#[derive(Debug, Clone, PartialEq)]
struct AttachedModel {
    reference: MeshRef,
    transform: AffineTransform,
}

/// Transforms of the bone and the optional prosthesis in one scene.
///
/// Edits only ever apply to the prosthesis; the bone transform changes
/// through [`set_matrix`](Self::set_matrix) or [`restore`](Self::restore).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStack {
    bone_ref: MeshRef,
    bone: AffineTransform,
    prosthesis: Option<AttachedModel>,
}

impl TransformStack {
    /// Starts a scene for `bone_ref` with an identity bone transform and no
    /// prosthesis.
    #[must_use]
    pub fn load(bone_ref: MeshRef) -> Self {
        debug!(bone = %bone_ref, "Loading scene");
        Self {
            bone_ref,
            bone: AffineTransform::identity(),
            prosthesis: None,
        }
    }

    /// Reference of the loaded bone mesh.
    #[must_use]
    pub const fn bone_ref(&self) -> &MeshRef {
        &self.bone_ref
    }

    /// Reference of the attached prosthesis, if any.
    #[must_use]
    pub fn prosthesis_ref(&self) -> Option<&MeshRef> {
        self.prosthesis.as_ref().map(|p| &p.reference)
    }

    /// Whether a prosthesis is attached.
    #[must_use]
    pub const fn has_prosthesis(&self) -> bool {
        self.prosthesis.is_some()
    }

    /// The bone transform.
    #[must_use]
    pub const fn bone(&self) -> &AffineTransform {
        &self.bone
    }

    /// The prosthesis transform, if one is attached.
    #[must_use]
    pub fn prosthesis(&self) -> Option<&AffineTransform> {
        self.prosthesis.as_ref().map(|p| &p.transform)
    }

    /// Attaches a prosthesis. Re-attaching the same reference keeps its
    /// current transform.
    pub fn attach_prosthesis(&mut self, reference: MeshRef) -> AttachOutcome {
        let outcome = match &self.prosthesis {
            Some(current) if current.reference == reference => return AttachOutcome::Unchanged,
            Some(_) => AttachOutcome::Replaced,
            None => AttachOutcome::Attached,
        };
        debug!(prosthesis = %reference, ?outcome, "Attaching prosthesis");
        self.prosthesis = Some(AttachedModel {
            reference,
            transform: AffineTransform::identity(),
        });
        outcome
    }

    /// Removes the prosthesis, returning its reference if one was attached.
    pub fn detach_prosthesis(&mut self) -> Option<MeshRef> {
        self.prosthesis.take().map(|p| {
            debug!(prosthesis = %p.reference, "Detaching prosthesis");
            p.reference
        })
    }

    fn prosthesis_mut(&mut self) -> SceneResult<&mut AffineTransform> {
        self.prosthesis
            .as_mut()
            .map(|p| &mut p.transform)
            .ok_or(SceneError::NoProsthesisLoaded)
    }

    /// Slides the prosthesis `value` units along `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoProsthesisLoaded`] if no prosthesis is attached.
    pub fn slide(&mut self, direction: SlideDirection, value: f64) -> SceneResult<()> {
        let transform = self.prosthesis_mut()?;
        let offset = direction.offset(value);
        *transform = transform.compose_translation(offset.x, offset.y, offset.z);
        debug!(%direction, value, "Slid prosthesis");
        Ok(())
    }

    /// Scales the prosthesis along its local axes.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoProsthesisLoaded`] if no prosthesis is attached.
    pub fn scale(&mut self, sx: f64, sy: f64, sz: f64) -> SceneResult<()> {
        let transform = self.prosthesis_mut()?;
        *transform = transform.compose_scale(sx, sy, sz);
        debug!(sx, sy, sz, "Scaled prosthesis");
        Ok(())
    }

    /// Rotates the prosthesis about one of its local axes.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NoProsthesisLoaded`] if no prosthesis is attached.
    pub fn rotate(&mut self, axis: Axis, angle_degrees: f64) -> SceneResult<()> {
        let transform = self.prosthesis_mut()?;
        *transform = transform.compose_rotation(axis, angle_degrees);
        debug!(%axis, angle_degrees, "Rotated prosthesis");
        Ok(())
    }

    /// Row-major coefficients of the target transform; `None` for the
    /// prosthesis when none is attached.
    #[must_use]
    pub fn matrix(&self, target: TransformTarget) -> Option<[f64; 16]> {
        match target {
            TransformTarget::Bone => Some(self.bone.to_row_major()),
            TransformTarget::Prosthesis => self.prosthesis().map(AffineTransform::to_row_major),
        }
    }

    /// Overwrites the target transform with 16 row-major coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidMatrixLength`] when `coefficients` does not
    /// hold exactly 16 values, or [`SceneError::NoProsthesisLoaded`] when
    /// targeting an absent prosthesis. The stack is unchanged on error.
    pub fn set_matrix(&mut self, target: TransformTarget, coefficients: &[f64]) -> SceneResult<()> {
        let coefficients: &[f64; 16] = coefficients
            .try_into()
            .map_err(|_| SceneError::InvalidMatrixLength(coefficients.len()))?;
        let transform = AffineTransform::from_row_major(coefficients);

        match target {
            TransformTarget::Bone => self.bone = transform,
            TransformTarget::Prosthesis => *self.prosthesis_mut()? = transform,
        }
        debug!(%target, "Matrix overwritten");
        Ok(())
    }

    /// Decomposes both transforms for persistence.
    #[must_use]
    pub fn snapshot(&self) -> SceneTransforms {
        SceneTransforms {
            bone: self.bone.decompose(),
            prosthesis: self.prosthesis().map(AffineTransform::decompose),
        }
    }

    /// Recomposes the bone transform and, when both a saved prosthesis
    /// transform and an attached prosthesis exist, the prosthesis transform.
    ///
    /// Returns `true` if a prosthesis transform was applied.
    pub fn restore(&mut self, saved: &SceneTransforms) -> bool {
        self.bone = AffineTransform::compose(&saved.bone);
        match (&saved.prosthesis, self.prosthesis.as_mut()) {
            (Some(components), Some(attached)) => {
                attached.transform = AffineTransform::compose(components);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scene_with_prosthesis() -> TransformStack {
        let mut stack = TransformStack::load(MeshRef::from("femur.stl"));
        stack.attach_prosthesis(MeshRef::from("stem-12.stl"));
        stack
    }

    #[test]
    fn test_load_defaults() {
        let stack = TransformStack::load(MeshRef::from("femur.stl"));
        assert!(stack.bone().is_identity(0.0));
        assert!(!stack.has_prosthesis());
        assert_eq!(stack.matrix(TransformTarget::Prosthesis), None);
        assert!(stack.matrix(TransformTarget::Bone).is_some());
    }

    #[test]
    fn test_slide_without_prosthesis_fails() {
        let mut stack = TransformStack::load(MeshRef::from("femur.stl"));
        let before = stack.clone();

        assert_eq!(
            stack.slide(SlideDirection::Up, 5.0),
            Err(SceneError::NoProsthesisLoaded)
        );
        assert_eq!(stack.scale(2.0, 2.0, 2.0), Err(SceneError::NoProsthesisLoaded));
        assert_eq!(stack.rotate(Axis::Z, 10.0), Err(SceneError::NoProsthesisLoaded));
        assert_eq!(stack, before);
    }

    #[test]
    fn test_slide_up_only_touches_translation() {
        let mut stack = scene_with_prosthesis();
        stack.slide(SlideDirection::Up, 5.0).unwrap();

        let m = stack.matrix(TransformTarget::Prosthesis).unwrap();
        let identity = AffineTransform::identity().to_row_major();
        for (i, (got, id)) in m.iter().zip(identity.iter()).enumerate() {
            if i == 11 {
                assert_relative_eq!(*got, 5.0);
            } else {
                assert_eq!(got, id, "coefficient {i}");
            }
        }
    }

    #[test]
    fn test_direction_offsets() {
        assert_eq!(SlideDirection::Up.offset(2.0), Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(SlideDirection::Down.offset(2.0), Vector3::new(0.0, 0.0, -2.0));
        assert_eq!(SlideDirection::Left.offset(2.0), Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(SlideDirection::Right.offset(2.0), Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(SlideDirection::Forward.offset(2.0), Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(SlideDirection::Backward.offset(2.0), Vector3::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Forward".parse::<SlideDirection>(), Ok(SlideDirection::Forward));
        assert_eq!(
            "sideways".parse::<SlideDirection>(),
            Err(SceneError::InvalidDirection("sideways".to_string()))
        );
        assert_eq!(" bone ".parse::<TransformTarget>(), Ok(TransformTarget::Bone));
        assert_eq!(
            "implant".parse::<TransformTarget>(),
            Err(SceneError::InvalidTarget("implant".to_string()))
        );
    }

    #[test]
    fn test_reattach_same_keeps_transform() {
        let mut stack = scene_with_prosthesis();
        stack.slide(SlideDirection::Right, 3.0).unwrap();
        let moved = *stack.prosthesis().unwrap();

        let outcome = stack.attach_prosthesis(MeshRef::from("stem-12.stl"));

        assert_eq!(outcome, AttachOutcome::Unchanged);
        assert_eq!(stack.prosthesis(), Some(&moved));
    }

    #[test]
    fn test_attach_different_resets_transform() {
        let mut stack = scene_with_prosthesis();
        stack.slide(SlideDirection::Right, 3.0).unwrap();

        let outcome = stack.attach_prosthesis(MeshRef::from("stem-14.stl"));

        assert_eq!(outcome, AttachOutcome::Replaced);
        assert!(stack.prosthesis().unwrap().is_identity(0.0));
        assert_eq!(stack.prosthesis_ref(), Some(&MeshRef::from("stem-14.stl")));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut stack = scene_with_prosthesis();
        assert_eq!(stack.detach_prosthesis(), Some(MeshRef::from("stem-12.stl")));
        assert_eq!(stack.detach_prosthesis(), None);
        assert!(!stack.has_prosthesis());
    }

    #[test]
    fn test_set_matrix_validates_length() {
        let mut stack = scene_with_prosthesis();
        assert_eq!(
            stack.set_matrix(TransformTarget::Bone, &[1.0; 12]),
            Err(SceneError::InvalidMatrixLength(12))
        );
        assert!(stack.bone().is_identity(0.0));
    }

    #[test]
    fn test_set_matrix_prosthesis_requires_attachment() {
        let mut stack = TransformStack::load(MeshRef::from("femur.stl"));
        let coeffs = AffineTransform::identity().to_row_major();
        assert_eq!(
            stack.set_matrix(TransformTarget::Prosthesis, &coeffs),
            Err(SceneError::NoProsthesisLoaded)
        );
    }

    #[test]
    fn test_set_then_get_matrix() {
        let mut stack = scene_with_prosthesis();
        let coeffs = AffineTransform::identity()
            .compose_rotation(Axis::Y, 25.0)
            .compose_translation(4.0, 0.0, -1.0)
            .to_row_major();

        stack.set_matrix(TransformTarget::Prosthesis, &coeffs).unwrap();

        assert_eq!(stack.matrix(TransformTarget::Prosthesis), Some(coeffs));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut stack = scene_with_prosthesis();
        stack.rotate(Axis::X, 30.0).unwrap();
        stack.slide(SlideDirection::Forward, 12.0).unwrap();
        stack.scale(1.1, 1.1, 0.9).unwrap();
        let saved = stack.snapshot();
        let expected = *stack.prosthesis().unwrap();

        let mut fresh = scene_with_prosthesis();
        assert!(fresh.restore(&saved));
        assert_relative_eq!(
            *fresh.prosthesis().unwrap().matrix(),
            *expected.matrix(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_restore_without_prosthesis_skips_it() {
        let saved = scene_with_prosthesis().snapshot();
        let mut bare = TransformStack::load(MeshRef::from("femur.stl"));
        assert!(!bare.restore(&saved));
        assert!(!bare.has_prosthesis());
    }
}

//! Positioning scene for one plan.

use mesh_types::{Axis, MeshRef};
use scene_transform::{
    AttachOutcome, SceneRecord, SlideDirection, TransformStack, TransformTarget,
};
use tracing::{info, warn};

use crate::PlanId;
use crate::error::{PlanError, PlanResult};
use crate::registry::PlanSession;
use crate::source::MeshSource;

/// A plan's [`TransformStack`] behind the registry.
#[derive(Debug, Clone)]
pub struct SceneSession {
    plan: PlanId,
    stack: TransformStack,
    removed: bool,
}

impl SceneSession {
    /// Loads the plan's bone and, if the plan has one assigned, its
    /// prosthesis.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::BoneNotAssigned`] when the plan has no bone.
    pub fn open(plan: PlanId, source: &dyn MeshSource) -> PlanResult<Self> {
        let bone = source
            .bone_mesh(plan)
            .ok_or(PlanError::BoneNotAssigned(plan))?;
        let mut stack = TransformStack::load(bone);
        if let Some(prosthesis) = source.assigned_prosthesis(plan) {
            stack.attach_prosthesis(prosthesis);
        }
        info!(
            plan,
            bone = %stack.bone_ref(),
            prosthesis = stack.has_prosthesis(),
            "Scene opened"
        );
        Ok(Self {
            plan,
            stack,
            removed: false,
        })
    }

    /// Plan the scene belongs to.
    #[must_use]
    pub const fn plan(&self) -> PlanId {
        self.plan
    }

    fn live(&self) -> PlanResult<&TransformStack> {
        if self.removed {
            Err(PlanError::SceneNotFound(self.plan))
        } else {
            Ok(&self.stack)
        }
    }

    fn live_mut(&mut self) -> PlanResult<&mut TransformStack> {
        if self.removed {
            Err(PlanError::SceneNotFound(self.plan))
        } else {
            Ok(&mut self.stack)
        }
    }

    /// The scene's transforms.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] once the scene is closed.
    pub fn stack(&self) -> PlanResult<&TransformStack> {
        self.live()
    }

    /// See [`TransformStack::attach_prosthesis`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] once the scene is closed.
    pub fn attach_prosthesis(&mut self, reference: MeshRef) -> PlanResult<AttachOutcome> {
        Ok(self.live_mut()?.attach_prosthesis(reference))
    }

    /// See [`TransformStack::detach_prosthesis`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] once the scene is closed.
    pub fn detach_prosthesis(&mut self) -> PlanResult<Option<MeshRef>> {
        Ok(self.live_mut()?.detach_prosthesis())
    }

    /// See [`TransformStack::slide`].
    ///
    /// # Errors
    ///
    /// Returns the stack's error, or [`PlanError::SceneNotFound`] once closed.
    pub fn slide(&mut self, direction: SlideDirection, value: f64) -> PlanResult<()> {
        Ok(self.live_mut()?.slide(direction, value)?)
    }

    /// See [`TransformStack::scale`].
    ///
    /// # Errors
    ///
    /// Returns the stack's error, or [`PlanError::SceneNotFound`] once closed.
    pub fn scale(&mut self, sx: f64, sy: f64, sz: f64) -> PlanResult<()> {
        Ok(self.live_mut()?.scale(sx, sy, sz)?)
    }

    /// See [`TransformStack::rotate`].
    ///
    /// # Errors
    ///
    /// Returns the stack's error, or [`PlanError::SceneNotFound`] once closed.
    pub fn rotate(&mut self, axis: Axis, angle_degrees: f64) -> PlanResult<()> {
        Ok(self.live_mut()?.rotate(axis, angle_degrees)?)
    }

    /// See [`TransformStack::matrix`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] once the scene is closed.
    pub fn matrix(&self, target: TransformTarget) -> PlanResult<Option<[f64; 16]>> {
        Ok(self.live()?.matrix(target))
    }

    /// See [`TransformStack::set_matrix`].
    ///
    /// # Errors
    ///
    /// Returns the stack's error, or [`PlanError::SceneNotFound`] once closed.
    pub fn set_matrix(&mut self, target: TransformTarget, coefficients: &[f64]) -> PlanResult<()> {
        Ok(self.live_mut()?.set_matrix(target, coefficients)?)
    }

    /// The scene's transforms as a persistable record.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] once the scene is closed.
    pub fn record(&self) -> PlanResult<SceneRecord> {
        Ok(SceneRecord::from(&self.live()?.snapshot()))
    }

    /// Applies a saved record.
    ///
    /// The bone transform is always restored. The prosthesis is attached and
    /// restored when the record holds prosthesis values and the plan has a
    /// prosthesis assigned; otherwise it is detached. Returns whether a
    /// prosthesis transform was restored.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Scene`] for a record with a partially stored
    /// prosthesis; the scene is unchanged in that case.
    pub fn restore(&mut self, record: &SceneRecord, assigned: Option<MeshRef>) -> PlanResult<bool> {
        let plan = self.plan;
        let saved = record.transforms()?;
        let stack = self.live_mut()?;

        let restored = match (saved.prosthesis.is_some(), assigned) {
            (true, Some(prosthesis)) => {
                stack.attach_prosthesis(prosthesis);
                stack.restore(&saved)
            }
            (has_saved, _) => {
                if has_saved {
                    warn!(plan, "Saved prosthesis transform but no prosthesis assigned");
                }
                stack.detach_prosthesis();
                stack.restore(&saved)
            }
        };
        info!(plan, prosthesis = restored, "Scene restored");
        Ok(restored)
    }
}

impl PlanSession for SceneSession {
    fn plan(&self) -> PlanId {
        self.plan
    }

    fn mark_removed(&mut self) {
        self.removed = true;
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}

//! Request-level facade over the scene and registration sessions.

use std::sync::Arc;

use mesh_types::{Axis, MeshRef};
use nalgebra::Point3;
use scene_transform::{AttachOutcome, SceneError, SceneRecord, SlideDirection, TransformTarget};
use tracing::{debug, info};

use crate::PlanId;
use crate::config::{SessionConfig, ViewDirection};
use crate::error::{PlanError, PlanResult};
use crate::registry::SessionRegistry;
use crate::scene::SceneSession;
use crate::session::{PointStatus, PredictionReport, RegistrationProgress, RegistrationSession};
use crate::source::MeshSource;
use crate::store::{InMemoryStore, RegistrationStore, SceneStore};

/// Planning operations keyed by plan id.
///
/// Owns one registry of scenes and one of registration sessions. String
/// arguments (directions, axes, targets, views) are parsed here, so invalid
/// names fail before any session is touched.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mesh_types::MeshRef;
/// use plan_session::{ErrorKind, InMemoryMeshSource, PlanningService, SessionConfig};
///
/// let meshes = Arc::new(InMemoryMeshSource::new());
/// meshes.assign_bone(1, MeshRef::from("femur"));
///
/// let service = PlanningService::in_memory(meshes.clone(), SessionConfig::default());
///
/// let err = service.slide(1, "up", 5.0).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
///
/// service.assign_prosthesis(1, MeshRef::from("stem"))?;
/// service.slide(1, "up", 5.0)?;
/// let m = service.matrix(1, "prosthesis")?.unwrap();
/// assert!((m[11] - 5.0).abs() < 1e-12);
/// # Ok::<(), plan_session::PlanError>(())
/// ```
pub struct PlanningService {
    meshes: Arc<dyn MeshSource>,
    registration_store: Arc<dyn RegistrationStore>,
    scene_store: Arc<dyn SceneStore>,
    config: SessionConfig,
    scenes: SessionRegistry<SceneSession>,
    registrations: SessionRegistry<RegistrationSession>,
}

impl std::fmt::Debug for PlanningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningService")
            .field("config", &self.config)
            .field("scenes", &self.scenes.plan_ids())
            .field("registrations", &self.registrations.plan_ids())
            .finish_non_exhaustive()
    }
}

impl PlanningService {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub fn new(
        meshes: Arc<dyn MeshSource>,
        registration_store: Arc<dyn RegistrationStore>,
        scene_store: Arc<dyn SceneStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            meshes,
            registration_store,
            scene_store,
            config,
            scenes: SessionRegistry::new(),
            registrations: SessionRegistry::new(),
        }
    }

    /// Creates a service whose stores live in memory.
    #[must_use]
    pub fn in_memory(meshes: Arc<dyn MeshSource>, config: SessionConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(meshes, store.clone(), store, config)
    }

    /// Configuration applied to new registration sessions.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Live scene sessions.
    #[must_use]
    pub const fn scenes(&self) -> &SessionRegistry<SceneSession> {
        &self.scenes
    }

    /// Live registration sessions.
    #[must_use]
    pub const fn registrations(&self) -> &SessionRegistry<RegistrationSession> {
        &self.registrations
    }

    // =========================================================================
    // Scene
    // =========================================================================

    /// Opens the plan's scene if it is not open. Returns whether it was
    /// opened by this call.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::BoneNotAssigned`] when the plan has no bone.
    pub fn open_scene(&self, plan: PlanId) -> PlanResult<bool> {
        let (_, created) = self
            .scenes
            .get_or_try_insert_with(plan, || SceneSession::open(plan, self.meshes.as_ref()))?;
        Ok(created)
    }

    /// Closes the plan's scene. Returns whether one was open.
    pub fn close_scene(&self, plan: PlanId) -> bool {
        self.scenes.remove(plan).is_some()
    }

    fn with_scene<T>(
        &self,
        plan: PlanId,
        open: bool,
        f: impl FnOnce(&mut SceneSession) -> PlanResult<T>,
    ) -> PlanResult<T> {
        let handle = if open {
            self.scenes
                .get_or_try_insert_with(plan, || SceneSession::open(plan, self.meshes.as_ref()))?
                .0
        } else {
            self.scenes.get(plan).ok_or(PlanError::SceneNotFound(plan))?
        };
        let mut scene = handle.lock();
        f(&mut scene)
    }

    /// Attaches a prosthesis, opening the scene if needed.
    ///
    /// # Errors
    ///
    /// Returns the error of opening the scene.
    pub fn assign_prosthesis(&self, plan: PlanId, prosthesis: MeshRef) -> PlanResult<AttachOutcome> {
        self.with_scene(plan, true, |scene| scene.attach_prosthesis(prosthesis))
    }

    /// Detaches the prosthesis of an open scene.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] when no scene is open.
    pub fn remove_prosthesis(&self, plan: PlanId) -> PlanResult<Option<MeshRef>> {
        self.with_scene(plan, false, SceneSession::detach_prosthesis)
    }

    /// Slides the prosthesis, opening the scene if needed.
    ///
    /// # Errors
    ///
    /// Fails with an invalid direction, without a prosthesis, or when the
    /// scene cannot be opened.
    pub fn slide(&self, plan: PlanId, direction: &str, value: f64) -> PlanResult<()> {
        let direction: SlideDirection = direction.parse()?;
        self.with_scene(plan, true, |scene| scene.slide(direction, value))
    }

    /// Scales the prosthesis, opening the scene if needed.
    ///
    /// # Errors
    ///
    /// Fails without a prosthesis or when the scene cannot be opened.
    pub fn scale(&self, plan: PlanId, sx: f64, sy: f64, sz: f64) -> PlanResult<()> {
        self.with_scene(plan, true, |scene| scene.scale(sx, sy, sz))
    }

    /// Rotates the prosthesis, opening the scene if needed.
    ///
    /// # Errors
    ///
    /// Fails with an invalid axis, without a prosthesis, or when the scene
    /// cannot be opened.
    pub fn rotate(&self, plan: PlanId, axis: &str, angle_degrees: f64) -> PlanResult<()> {
        let axis: Axis = axis.parse().map_err(SceneError::from)?;
        self.with_scene(plan, true, |scene| scene.rotate(axis, angle_degrees))
    }

    /// Row-major matrix of the bone or prosthesis, opening the scene if
    /// needed. `None` for an absent prosthesis.
    ///
    /// # Errors
    ///
    /// Fails with an invalid target or when the scene cannot be opened.
    pub fn matrix(&self, plan: PlanId, target: &str) -> PlanResult<Option<[f64; 16]>> {
        let target: TransformTarget = target.parse()?;
        self.with_scene(plan, true, |scene| scene.matrix(target))
    }

    /// Overwrites the bone or prosthesis matrix, opening the scene if needed.
    ///
    /// # Errors
    ///
    /// Fails with an invalid target, a coefficient count other than 16, a
    /// missing prosthesis, or when the scene cannot be opened.
    pub fn set_matrix(&self, plan: PlanId, target: &str, coefficients: &[f64]) -> PlanResult<()> {
        let target: TransformTarget = target.parse()?;
        self.with_scene(plan, true, |scene| scene.set_matrix(target, coefficients))
    }

    /// Stores the decomposed transforms of an open scene.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SceneNotFound`] when no scene is open, or the
    /// store's error.
    pub fn save_scene(&self, plan: PlanId) -> PlanResult<SceneRecord> {
        let record = self.with_scene(plan, false, |scene| scene.record())?;
        self.scene_store.save(plan, &record)?;
        info!(plan, prosthesis = record.has_prosthesis(), "Scene saved");
        Ok(record)
    }

    /// Restores the saved transforms, opening the scene if needed. Returns
    /// whether a prosthesis transform was restored.
    ///
    /// Without a saved record the prosthesis is detached and the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SavedSceneNotFound`] without a saved record, a
    /// scene error for an invalid record, or the error of opening the scene.
    pub fn restore_scene(&self, plan: PlanId) -> PlanResult<bool> {
        let record = self.scene_store.load(plan)?;
        let assigned = self.meshes.assigned_prosthesis(plan);

        self.with_scene(plan, true, |scene| match record {
            Some(record) => scene.restore(&record, assigned),
            None => {
                scene.detach_prosthesis()?;
                Err(PlanError::SavedSceneNotFound(plan))
            }
        })
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Creates the plan's registration session for a view. An existing
    /// session is left untouched. Returns whether a session was created.
    ///
    /// # Errors
    ///
    /// Fails with an invalid view, when the plan has no bone, when the mesh
    /// cannot be extracted, or when it has too few candidate points.
    pub fn create_registration(&self, plan: PlanId, view: &str) -> PlanResult<bool> {
        if self.registrations.contains(plan) {
            debug!(plan, "Registration session already exists");
            return Ok(false);
        }
        let view: ViewDirection = view.parse()?;

        let (_, created) = self.registrations.get_or_try_insert_with(plan, || {
            let bone = self
                .meshes
                .bone_mesh(plan)
                .ok_or(PlanError::BoneNotAssigned(plan))?;
            let mesh = self.meshes.extract_surface_mesh(&bone)?.recentered();
            RegistrationSession::new(plan, Arc::new(mesh), view, self.config.clone())
        })?;
        Ok(created)
    }

    fn with_registration<T>(
        &self,
        plan: PlanId,
        f: impl FnOnce(&mut RegistrationSession) -> PlanResult<T>,
    ) -> PlanResult<T> {
        let handle = self
            .registrations
            .get(plan)
            .ok_or(PlanError::RegistrationNotFound(plan))?;
        let mut session = handle.lock();
        f(&mut session)
    }

    /// Registers the world position of a main or prediction slot.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] without a session, or the
    /// error of [`RegistrationSession::register_point`].
    pub fn register_point(
        &self,
        plan: PlanId,
        index: usize,
        world: Point3<f64>,
    ) -> PlanResult<RegistrationProgress> {
        self.with_registration(plan, |session| session.register_point(index, world))
    }

    /// Errors of caller-supplied points against the predictions.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] without a session, or the
    /// error of [`RegistrationSession::evaluate_ad_hoc`].
    pub fn evaluate_predictions(
        &self,
        plan: PlanId,
        actual: &[Point3<f64>],
    ) -> PlanResult<PredictionReport> {
        self.with_registration(plan, |session| session.evaluate_ad_hoc(actual))
    }

    /// Status of every point slot.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] without a session.
    pub fn points_status(&self, plan: PlanId) -> PlanResult<Vec<PointStatus>> {
        self.with_registration(plan, |session| session.status())
    }

    /// Stores the main correspondences, at most once per plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] without a session, or the
    /// error of [`RegistrationSession::persist_main_points`].
    pub fn save_registered_points(&self, plan: PlanId) -> PlanResult<usize> {
        let store = self.registration_store.as_ref();
        self.with_registration(plan, |session| session.persist_main_points(store))
    }

    /// Deletes the plan's stored correspondences. Returns how many were
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub fn remove_registered_points(&self, plan: PlanId) -> PlanResult<usize> {
        let deleted = self.registration_store.delete_points(plan)?;
        info!(plan, deleted, "Registration points deleted");
        Ok(deleted)
    }

    /// Removes the plan's registration session.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] without a session.
    pub fn remove_registration(&self, plan: PlanId) -> PlanResult<()> {
        self.registrations
            .remove(plan)
            .map(|_| ())
            .ok_or(PlanError::RegistrationNotFound(plan))
    }
}

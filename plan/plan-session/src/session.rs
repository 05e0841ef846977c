//! Point registration between a bone model and tracked world space.
//!
//! A session samples main points on the bone surface when it is created. The
//! clinician digitizes each of them; once every main point has a world
//! position the session fits a rigid transform, samples a few held-out
//! prediction points and predicts where they should be digitized. Digitizing
//! the prediction points then measures how well the fit holds.
//!
//! ```text
//! Created -> RegisteringMain -> MainComplete -> Validating -> Validated
//! ```
//!
//! Any state can move to `Removed`, after which every operation fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use mesh_registration::{
    Correspondence, ErrorSummary, RigidTransform, SamplingParams, SurfacePoint,
    align_correspondences, sample_surface_points,
};
use mesh_types::SurfaceMesh;
use nalgebra::Point3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::PlanId;
use crate::config::{SessionConfig, ViewDirection};
use crate::error::{NotReady, PlanError, PlanResult};
use crate::registry::PlanSession;
use crate::store::{RegistrationStore, StoredRegistrationPoint};

/// Lifecycle state of a [`RegistrationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Main points sampled, none registered.
    Created,
    /// Some but not all main points registered.
    RegisteringMain,
    /// Fit computed and predictions generated, no prediction registered.
    MainComplete,
    /// Some but not all prediction points registered.
    Validating,
    /// Every prediction point registered and its error computed.
    Validated,
    /// Removed from the registry.
    Removed,
}

/// Whether a point slot is a main or a prediction point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Used to compute the fit.
    Main,
    /// Held out to validate the fit.
    Prediction,
}

/// Inspection view of one point slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStatus {
    /// Slot index; prediction slots follow the main slots.
    pub index: usize,
    /// Slot kind.
    pub kind: PointKind,
    /// Index of the point in the bone mesh.
    pub mesh_index: usize,
    /// Model-space position.
    pub model: Point3<f64>,
    /// Digitized world position, if registered.
    pub world: Option<Point3<f64>>,
    /// World position predicted by the fit (prediction slots only).
    pub predicted: Option<Point3<f64>>,
}

/// Outcome of registering one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationProgress {
    /// Main and prediction points registered so far.
    pub total_registered: usize,
    /// State after the registration.
    pub state: SessionState,
    /// Slot indices of the prediction points, once generated.
    pub prediction_indices: Option<Vec<usize>>,
    /// Error of each prediction point, once all are registered.
    pub prediction_errors: Option<Vec<f64>>,
    /// Mean of `prediction_errors`.
    pub mean_error: Option<f64>,
}

/// Errors of supplied points against the predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Error of each point, in prediction order.
    pub errors: Vec<f64>,
    /// Mean of `errors`.
    pub mean_error: f64,
}

impl From<ErrorSummary> for PredictionReport {
    fn from(summary: ErrorSummary) -> Self {
        Self {
            errors: summary.errors,
            mean_error: summary.mean,
        }
    }
}

/// Fit and prediction data, present once every main point is registered.
#[derive(Debug, Clone)]
struct Validation {
    fit: RigidTransform,
    points: Vec<SurfacePoint>,
    predicted: Vec<Point3<f64>>,
    registered: BTreeMap<usize, Point3<f64>>,
    errors: Option<ErrorSummary>,
}

/// Registration workflow for one plan.
#[derive(Debug)]
pub struct RegistrationSession {
    plan: PlanId,
    view: ViewDirection,
    mesh: Arc<SurfaceMesh>,
    config: SessionConfig,
    sampling: SamplingParams,
    rng: StdRng,
    main_points: Vec<SurfacePoint>,
    main_registered: BTreeMap<usize, Point3<f64>>,
    validation: Option<Validation>,
    removed: bool,
}

impl RegistrationSession {
    /// Creates a session and samples its main points.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidConfig`] for an out-of-range
    /// configuration, and [`PlanError::Registration`] with
    /// `InsufficientCandidates` when the mesh surface seen from `view` has
    /// too few candidate points.
    pub fn new(
        plan: PlanId,
        mesh: Arc<SurfaceMesh>,
        view: ViewDirection,
        config: SessionConfig,
    ) -> PlanResult<Self> {
        config.validate()?;
        let sampling = config.sampling_for(view);
        let mut rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let main_points = sample_surface_points(
            &mesh,
            &sampling,
            config.main_point_count,
            &[],
            &mut rng,
        )?;

        info!(
            plan,
            %view,
            mesh_points = mesh.len(),
            main_points = main_points.len(),
            "Registration session created"
        );

        Ok(Self {
            plan,
            view,
            mesh,
            config,
            sampling,
            rng,
            main_points,
            main_registered: BTreeMap::new(),
            validation: None,
            removed: false,
        })
    }

    /// Plan the session belongs to.
    #[must_use]
    pub const fn plan(&self) -> PlanId {
        self.plan
    }

    /// View the points were sampled for.
    #[must_use]
    pub const fn view(&self) -> ViewDirection {
        self.view
    }

    /// The bone surface.
    #[must_use]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.removed {
            return SessionState::Removed;
        }
        match &self.validation {
            None if self.main_registered.is_empty() => SessionState::Created,
            None => SessionState::RegisteringMain,
            Some(v) if v.errors.is_some() => SessionState::Validated,
            Some(v) if v.registered.is_empty() => SessionState::MainComplete,
            Some(_) => SessionState::Validating,
        }
    }

    /// The sampled main points, in slot order.
    #[must_use]
    pub fn main_points(&self) -> &[SurfacePoint] {
        &self.main_points
    }

    /// The sampled prediction points, once generated.
    #[must_use]
    pub fn prediction_points(&self) -> Option<&[SurfacePoint]> {
        self.validation.as_ref().map(|v| v.points.as_slice())
    }

    /// Slot indices of the prediction points, once generated.
    #[must_use]
    pub fn prediction_indices(&self) -> Option<Vec<usize>> {
        self.validation.as_ref().map(|v| {
            (0..v.points.len())
                .map(|i| self.config.main_point_count + i)
                .collect()
        })
    }

    /// Model-to-world fit, once computed.
    #[must_use]
    pub fn fit(&self) -> Option<&RigidTransform> {
        self.validation.as_ref().map(|v| &v.fit)
    }

    /// Predicted world positions of the prediction points.
    #[must_use]
    pub fn predicted_world_points(&self) -> Option<&[Point3<f64>]> {
        self.validation.as_ref().map(|v| v.predicted.as_slice())
    }

    /// Error of each prediction point, once all are registered.
    #[must_use]
    pub fn prediction_errors(&self) -> Option<&[f64]> {
        self.validation
            .as_ref()
            .and_then(|v| v.errors.as_ref())
            .map(|e| e.errors.as_slice())
    }

    /// Number of registered main and prediction points.
    #[must_use]
    pub fn total_registered(&self) -> usize {
        self.main_registered.len() + self.validation.as_ref().map_or(0, |v| v.registered.len())
    }

    fn ensure_live(&self) -> PlanResult<()> {
        if self.removed {
            Err(PlanError::RegistrationNotFound(self.plan))
        } else {
            Ok(())
        }
    }

    fn ensure_predictions(&self) -> PlanResult<&Validation> {
        self.validation
            .as_ref()
            .ok_or(PlanError::HandlerNotReady(NotReady::PredictionsNotGenerated))
    }

    /// Stores or overwrites the world position of a main point.
    ///
    /// Registering the last missing main point fits the transform and
    /// generates the predictions. This happens once; later re-registrations
    /// only update the stored world position.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::IndexOutOfRange`] for an index outside the main
    /// slots, or the sampling/fitting error that prevented the transition,
    /// in which case the registration is undone.
    pub fn register_main(&mut self, index: usize, world: Point3<f64>) -> PlanResult<()> {
        self.ensure_live()?;
        let limit = self.config.main_point_count;
        if index >= limit {
            return Err(PlanError::IndexOutOfRange { index, limit });
        }

        let previous = self.main_registered.insert(index, world);
        debug!(plan = self.plan, index, replaced = previous.is_some(), "Main point registered");

        if self.validation.is_none() && self.main_registered.len() == limit {
            if let Err(err) = self.generate_predictions() {
                match previous {
                    Some(p) => self.main_registered.insert(index, p),
                    None => self.main_registered.remove(&index),
                };
                return Err(err);
            }
        }
        Ok(())
    }

    fn generate_predictions(&mut self) -> PlanResult<()> {
        let exclude: Vec<usize> = if self.config.exclude_main_from_predictions {
            self.main_points.iter().map(|p| p.mesh_index).collect()
        } else {
            Vec::new()
        };
        let points = sample_surface_points(
            &self.mesh,
            &self.sampling,
            self.config.prediction_point_count,
            &exclude,
            &mut self.rng,
        )?;

        let correspondences: Vec<Correspondence> = self
            .main_registered
            .iter()
            .map(|(&i, world)| Correspondence::new(self.main_points[i].position, *world))
            .collect();
        let fit = align_correspondences(&correspondences)?;
        let predicted = points.iter().map(|p| fit.apply(&p.position)).collect();

        let residuals = ErrorSummary::of_fit(&fit, &correspondences);
        info!(
            plan = self.plan,
            rms = residuals.rms,
            max = residuals.max,
            predictions = points.len(),
            "Main registration complete"
        );

        self.validation = Some(Validation {
            fit,
            points,
            predicted,
            registered: BTreeMap::new(),
            errors: None,
        });
        Ok(())
    }

    /// Stores or overwrites the world position of a prediction point;
    /// `slot` counts from 0 within the prediction points.
    ///
    /// Errors are (re)computed whenever every prediction point has a world
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::HandlerNotReady`] before predictions exist and
    /// [`PlanError::IndexOutOfRange`] for a slot outside the predictions.
    pub fn register_prediction(&mut self, slot: usize, world: Point3<f64>) -> PlanResult<()> {
        self.ensure_live()?;
        let plan = self.plan;
        let validation = self
            .validation
            .as_mut()
            .ok_or(PlanError::HandlerNotReady(NotReady::PredictionsNotGenerated))?;

        let limit = validation.points.len();
        if slot >= limit {
            return Err(PlanError::IndexOutOfRange { index: slot, limit });
        }

        validation.registered.insert(slot, world);
        debug!(plan, slot, "Prediction point registered");

        if validation.registered.len() == limit {
            let actual: Vec<Point3<f64>> = validation.registered.values().copied().collect();
            let summary = ErrorSummary::between(&validation.predicted, &actual)?;
            info!(plan, mean_error = summary.mean, max_error = summary.max, "Validation complete");
            validation.errors = Some(summary);
        }
        Ok(())
    }

    /// Registers a point by slot index: main slots first, then prediction
    /// slots.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::IndexOutOfRange`] beyond the last slot, and the
    /// errors of [`register_main`](Self::register_main) and
    /// [`register_prediction`](Self::register_prediction).
    pub fn register_point(
        &mut self,
        index: usize,
        world: Point3<f64>,
    ) -> PlanResult<RegistrationProgress> {
        self.ensure_live()?;
        let main = self.config.main_point_count;
        let limit = self.config.slot_count();

        if index < main {
            self.register_main(index, world)?;
        } else if index < limit {
            self.register_prediction(index - main, world)?;
        } else {
            return Err(PlanError::IndexOutOfRange { index, limit });
        }
        Ok(self.progress())
    }

    /// Summary of the registration so far.
    #[must_use]
    pub fn progress(&self) -> RegistrationProgress {
        let errors = self.validation.as_ref().and_then(|v| v.errors.as_ref());
        RegistrationProgress {
            total_registered: self.total_registered(),
            state: self.state(),
            prediction_indices: self.prediction_indices(),
            prediction_errors: errors.map(|e| e.errors.clone()),
            mean_error: errors.map(|e| e.mean),
        }
    }

    /// Errors of caller-supplied points, matched by position to the
    /// prediction points. Does not change the session.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::HandlerNotReady`] before predictions exist and
    /// [`PlanError::PointCountMismatch`] when the number of points differs
    /// from the number of predictions.
    pub fn evaluate_ad_hoc(&self, actual: &[Point3<f64>]) -> PlanResult<PredictionReport> {
        self.ensure_live()?;
        let validation = self.ensure_predictions()?;
        if actual.len() != validation.predicted.len() {
            return Err(PlanError::PointCountMismatch {
                expected: validation.predicted.len(),
                provided: actual.len(),
            });
        }
        Ok(ErrorSummary::between(&validation.predicted, actual)?.into())
    }

    /// Every main and prediction slot with its model, world and predicted
    /// positions.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::RegistrationNotFound`] once the session is removed.
    pub fn status(&self) -> PlanResult<Vec<PointStatus>> {
        self.ensure_live()?;
        let main = self.main_points.iter().enumerate().map(|(i, p)| PointStatus {
            index: i,
            kind: PointKind::Main,
            mesh_index: p.mesh_index,
            model: p.position,
            world: self.main_registered.get(&i).copied(),
            predicted: None,
        });

        let predictions = self.validation.iter().flat_map(|v| {
            v.points.iter().enumerate().map(move |(i, p)| PointStatus {
                index: self.config.main_point_count + i,
                kind: PointKind::Prediction,
                mesh_index: p.mesh_index,
                model: p.position,
                world: v.registered.get(&i).copied(),
                predicted: v.predicted.get(i).copied(),
            })
        });

        Ok(main.chain(predictions).collect())
    }

    /// Registered main points as `(index, model, world)` rows, in index order.
    #[must_use]
    pub fn registered_main_points(&self) -> Vec<StoredRegistrationPoint> {
        self.main_registered
            .iter()
            .map(|(&point_index, world)| StoredRegistrationPoint {
                point_index,
                model: self.main_points[point_index].position,
                world: *world,
            })
            .collect()
    }

    /// Stores the main correspondences. At most once per plan: the check is
    /// made against the store, not the session.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::HandlerNotReady`] unless every main point is
    /// registered, [`PlanError::AlreadyPersisted`] when the store already
    /// holds points for the plan, or the store's error.
    pub fn persist_main_points(&self, store: &dyn RegistrationStore) -> PlanResult<usize> {
        self.ensure_live()?;
        let required = self.config.main_point_count;
        let registered = self.main_registered.len();
        if registered < required {
            return Err(PlanError::HandlerNotReady(NotReady::MainPointsIncomplete {
                registered,
                required,
            }));
        }
        if store.has_points(self.plan)? {
            return Err(PlanError::AlreadyPersisted(self.plan));
        }

        let rows = self.registered_main_points();
        store.insert_points(self.plan, &rows)?;
        info!(plan = self.plan, rows = rows.len(), "Registration points stored");
        Ok(rows.len())
    }
}

impl PlanSession for RegistrationSession {
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

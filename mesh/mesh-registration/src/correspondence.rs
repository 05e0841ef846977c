//! Model/world point correspondences and alignment error metrics.
//!
//! A correspondence pairs a point on the model surface with the position the
//! same anatomical point was digitized at in tracked world space.

use crate::kabsch::compute_rigid_transform;
use crate::{RegistrationError, RegistrationResult, RigidTransform};
use nalgebra::Point3;

/// Minimum number of correspondences for a unique rigid fit.
pub const MIN_CORRESPONDENCES: usize = 3;

/// A model-space point paired with its digitized world-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Position on the model surface.
    pub model: Point3<f64>,
    /// Digitized position in world space.
    pub world: Point3<f64>,
}

impl Correspondence {
    /// Creates a correspondence.
    #[must_use]
    pub const fn new(model: Point3<f64>, world: Point3<f64>) -> Self {
        Self { model, world }
    }

    /// Distance between the transformed model point and its world point.
    #[must_use]
    pub fn residual(&self, transform: &RigidTransform) -> f64 {
        point_error(&transform.apply(&self.model), &self.world)
    }
}

/// Fits the rigid transform mapping each correspondence's model point onto
/// its world point.
///
/// # Errors
///
/// Returns [`RegistrationError::InsufficientPoints`] for fewer than
/// [`MIN_CORRESPONDENCES`] pairs, or any error of
/// [`compute_rigid_transform`].
///
/// # Example
///
/// ```
/// use mesh_registration::{align_correspondences, Correspondence};
/// use nalgebra::Point3;
///
/// let pairs = [
///     Correspondence::new(Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 5.0, 0.0)),
///     Correspondence::new(Point3::new(1.0, 0.0, 0.0), Point3::new(6.0, 5.0, 0.0)),
///     Correspondence::new(Point3::new(0.0, 1.0, 0.0), Point3::new(5.0, 6.0, 0.0)),
/// ];
///
/// let transform = align_correspondences(&pairs).unwrap();
/// assert!((transform.translation.x - 5.0).abs() < 1e-9);
/// ```
pub fn align_correspondences(
    correspondences: &[Correspondence],
) -> RegistrationResult<RigidTransform> {
    if correspondences.len() < MIN_CORRESPONDENCES {
        return Err(RegistrationError::InsufficientPoints {
            required: MIN_CORRESPONDENCES,
            provided: correspondences.len(),
        });
    }

    let (model, world): (Vec<_>, Vec<_>) = correspondences
        .iter()
        .map(|c| (c.model, c.world))
        .unzip();

    compute_rigid_transform(&model, &world)
}

/// Euclidean distance between a predicted and an actual position.
#[must_use]
pub fn point_error(predicted: &Point3<f64>, actual: &Point3<f64>) -> f64 {
    (predicted - actual).norm()
}

/// Per-point errors together with their aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSummary {
    /// Error of each pair, in input order.
    pub errors: Vec<f64>,
    /// Arithmetic mean of `errors`.
    pub mean: f64,
    /// Root mean square of `errors`.
    pub rms: f64,
    /// Largest entry of `errors`.
    pub max: f64,
}

impl ErrorSummary {
    /// Summarizes a list of errors. All aggregates are 0 for an empty list.
    #[must_use]
    pub fn from_errors(errors: Vec<f64>) -> Self {
        if errors.is_empty() {
            return Self {
                errors,
                mean: 0.0,
                rms: 0.0,
                max: 0.0,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let n = errors.len() as f64;
        let mean = errors.iter().sum::<f64>() / n;
        let rms = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
        let max = errors.iter().copied().fold(0.0, f64::max);

        Self {
            errors,
            mean,
            rms,
            max,
        }
    }

    /// Compares predictions with actual positions pairwise.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::MismatchedLengths`] when the slices
    /// differ in length.
    pub fn between(predicted: &[Point3<f64>], actual: &[Point3<f64>]) -> RegistrationResult<Self> {
        if predicted.len() != actual.len() {
            return Err(RegistrationError::MismatchedLengths {
                model: predicted.len(),
                world: actual.len(),
            });
        }
        let errors = predicted
            .iter()
            .zip(actual)
            .map(|(p, a)| point_error(p, a))
            .collect();
        Ok(Self::from_errors(errors))
    }

    /// Residuals of `transform` over a set of correspondences.
    #[must_use]
    pub fn of_fit(transform: &RigidTransform, correspondences: &[Correspondence]) -> Self {
        Self::from_errors(
            correspondences
                .iter()
                .map(|c| c.residual(transform))
                .collect(),
        )
    }
}

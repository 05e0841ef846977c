//! Session configuration and view presets.

use std::fmt;
use std::str::FromStr;

use mesh_registration::SamplingParams;
use mesh_types::Axis;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// Configuration shared by every registration session of a service.
///
/// # Example
///
/// ```
/// use plan_session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_seed(42)
///     .with_prediction_exclusion(true);
///
/// assert_eq!(config.main_point_count, 10);
/// assert_eq!(config.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of main points digitized to compute the fit. Default: 10.
    pub main_point_count: usize,

    /// Number of held-out prediction points. Default: 3.
    pub prediction_point_count: usize,

    /// Leading fraction of the deduplicated surface used as the candidate
    /// pool. Default: 0.25
    pub pool_fraction: f64,

    /// Exclude the main points from the prediction draw. Default: false.
    pub exclude_main_from_predictions: bool,

    /// Seed for the session's random draws; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            main_point_count: 10,
            prediction_point_count: 3,
            pool_fraction: 0.25,
            exclude_main_from_predictions: false,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible configuration for tests and replays.
    #[must_use]
    pub fn deterministic(seed: u64) -> Self {
        Self::default().with_seed(seed)
    }

    /// Set the number of main points (at least 3).
    #[must_use]
    pub fn with_main_point_count(mut self, count: usize) -> Self {
        self.main_point_count = count.max(mesh_registration::MIN_CORRESPONDENCES);
        self
    }

    /// Checks the ranges the builders enforce, for configurations that were
    /// deserialized or built by hand.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidConfig`] when there are fewer main points
    /// than a rigid fit needs, no prediction points, or a pool fraction
    /// outside `(0, 1]`.
    pub fn validate(&self) -> PlanResult<()> {
        let min = mesh_registration::MIN_CORRESPONDENCES;
        if self.main_point_count < min {
            return Err(PlanError::InvalidConfig(format!(
                "main_point_count must be at least {min}, got {}",
                self.main_point_count
            )));
        }
        if self.prediction_point_count == 0 {
            return Err(PlanError::InvalidConfig(
                "prediction_point_count must be at least 1".to_string(),
            ));
        }
        if !(self.pool_fraction > 0.0 && self.pool_fraction <= 1.0) {
            return Err(PlanError::InvalidConfig(format!(
                "pool_fraction must be in (0, 1], got {}",
                self.pool_fraction
            )));
        }
        Ok(())
    }

    /// Set the number of prediction points.
    #[must_use]
    pub const fn with_prediction_point_count(mut self, count: usize) -> Self {
        self.prediction_point_count = count;
        self
    }

    /// Set the pool fraction, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_pool_fraction(mut self, fraction: f64) -> Self {
        self.pool_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Whether prediction points may coincide with main points.
    #[must_use]
    pub const fn with_prediction_exclusion(mut self, exclude: bool) -> Self {
        self.exclude_main_from_predictions = exclude;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Total number of point slots (main followed by prediction).
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        self.main_point_count + self.prediction_point_count
    }

    /// Sampling parameters for a view under this configuration.
    #[must_use]
    pub fn sampling_for(&self, view: ViewDirection) -> SamplingParams {
        let (axis, descending) = view.sort_order();
        SamplingParams::new(axis, descending).with_pool_fraction(self.pool_fraction)
    }
}

/// The side of the bone the clinician digitizes points from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewDirection {
    /// Highest Z first.
    #[default]
    #[serde(rename = "top")]
    Top,
    /// Lowest Z first.
    #[serde(rename = "bottom")]
    Bottom,
    /// Highest Y first.
    #[serde(rename = "front")]
    Front,
    /// Lowest Y first.
    #[serde(rename = "back")]
    Back,
    /// Highest X first.
    #[serde(rename = "other side")]
    OtherSide,
    /// Lowest X first.
    #[serde(rename = "side")]
    Side,
}

impl ViewDirection {
    /// All views.
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::Front,
        Self::Back,
        Self::OtherSide,
        Self::Side,
    ];

    /// Sort axis and direction of the candidate pool for this view.
    #[must_use]
    pub const fn sort_order(self) -> (Axis, bool) {
        match self {
            Self::Top => (Axis::Z, true),
            Self::Bottom => (Axis::Z, false),
            Self::Front => (Axis::Y, true),
            Self::Back => (Axis::Y, false),
            Self::OtherSide => (Axis::X, true),
            Self::Side => (Axis::X, false),
        }
    }

    /// View name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Front => "front",
            Self::Back => "back",
            Self::OtherSide => "other side",
            Self::Side => "side",
        }
    }
}

impl fmt::Display for ViewDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewDirection {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PlanError::InvalidView(s.to_string()))
    }
}

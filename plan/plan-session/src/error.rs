//! Error types for planning sessions.

use mesh_registration::RegistrationError;
use scene_transform::SceneError;
use thiserror::Error;

use crate::PlanId;
use crate::source::MeshSourceError;
use crate::store::StoreError;

/// Coarse classification of a [`PlanError`], for the layer that turns
/// failures into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A session, mesh or record does not exist.
    NotFound,
    /// A write collides with existing data.
    Conflict,
    /// An argument is malformed or out of range.
    InvalidArgument,
    /// The operation needs a state the session has not reached yet.
    PreconditionFailed,
    /// The operation may only happen once and already did.
    AlreadyDone,
    /// A collaborator failed in a way the caller cannot fix.
    Internal,
}

/// Reason a registration session cannot serve a request yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    /// Fewer than the required main points are registered.
    MainPointsIncomplete {
        /// Main points registered so far.
        registered: usize,
        /// Main points required.
        required: usize,
    },
    /// The fit and prediction points have not been generated.
    PredictionsNotGenerated,
}

impl std::fmt::Display for NotReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainPointsIncomplete {
                registered,
                required,
            } => write!(f, "{registered} of {required} main points registered"),
            Self::PredictionsNotGenerated => f.write_str("predictions have not been generated"),
        }
    }
}

/// Errors returned by planning sessions and the planning service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Sampling or fitting failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A scene edit failed.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The mesh source could not provide a mesh.
    #[error(transparent)]
    MeshSource(#[from] MeshSourceError),

    /// A store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No registration session exists for the plan.
    #[error("no registration session for plan {0}")]
    RegistrationNotFound(PlanId),

    /// No scene is open for the plan.
    #[error("no scene is open for plan {0}")]
    SceneNotFound(PlanId),

    /// The plan has no bone model assigned.
    #[error("plan {0} has no bone model assigned")]
    BoneNotAssigned(PlanId),

    /// No transforms were saved for the plan.
    #[error("no saved scene for plan {0}")]
    SavedSceneNotFound(PlanId),

    /// A session configuration value is outside its valid range.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    /// View name was not recognized.
    #[error("invalid view '{0}', expected top, bottom, front, back, side or other side")]
    InvalidView(String),

    /// Point index outside the session's slots.
    #[error("point index {index} out of range, expected 0..{limit}")]
    IndexOutOfRange {
        /// Index supplied.
        index: usize,
        /// Number of slots.
        limit: usize,
    },

    /// Wrong number of points supplied.
    #[error("expected {expected} points, got {provided}")]
    PointCountMismatch {
        /// Points required.
        expected: usize,
        /// Points supplied.
        provided: usize,
    },

    /// The session has not reached the state the operation needs.
    #[error("registration session not ready: {0}")]
    HandlerNotReady(NotReady),

    /// Main points were already stored for the plan.
    #[error("registration points already stored for plan {0}")]
    AlreadyPersisted(PlanId),
}

impl PlanError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Registration(err) => match err {
                RegistrationError::InsufficientCandidates { .. }
                | RegistrationError::InsufficientPoints { .. } => ErrorKind::PreconditionFailed,
                RegistrationError::SvdFailed => ErrorKind::Internal,
                RegistrationError::EmptyModelPoints
                | RegistrationError::EmptyWorldPoints
                | RegistrationError::MismatchedLengths { .. } => ErrorKind::InvalidArgument,
            },
            Self::Scene(err) => match err {
                SceneError::NoProsthesisLoaded => ErrorKind::PreconditionFailed,
                SceneError::InvalidAxis(_)
                | SceneError::InvalidDirection(_)
                | SceneError::InvalidTarget(_)
                | SceneError::InvalidMatrixLength(_)
                | SceneError::PartialProsthesisRecord { .. } => ErrorKind::InvalidArgument,
            },
            Self::MeshSource(err) => match err {
                MeshSourceError::NotFound(_) => ErrorKind::NotFound,
                MeshSourceError::Extraction { .. } => ErrorKind::Internal,
            },
            Self::Store(err) => match err {
                StoreError::DuplicatePoint { .. } => ErrorKind::Conflict,
                StoreError::Backend(_) => ErrorKind::Internal,
            },
            Self::RegistrationNotFound(_)
            | Self::SceneNotFound(_)
            | Self::BoneNotAssigned(_)
            | Self::SavedSceneNotFound(_) => ErrorKind::NotFound,
            Self::InvalidConfig(_)
            | Self::InvalidView(_)
            | Self::IndexOutOfRange { .. }
            | Self::PointCountMismatch { .. } => ErrorKind::InvalidArgument,
            Self::HandlerNotReady(_) => ErrorKind::PreconditionFailed,
            Self::AlreadyPersisted(_) => ErrorKind::AlreadyDone,
        }
    }
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

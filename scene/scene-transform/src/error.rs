//! Error types for scene transform operations.

use mesh_types::ParseAxisError;
use thiserror::Error;

/// Errors that can occur while editing or restoring scene transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// An edit targeted the prosthesis but none is attached.
    #[error("no prosthesis is loaded in the scene")]
    NoProsthesisLoaded,

    /// Axis name was not one of x, y, z.
    #[error("invalid axis '{0}', expected one of x, y, z")]
    InvalidAxis(String),

    /// Slide direction name was not recognized.
    #[error("invalid direction '{0}', expected up, down, left, right, forward or backward")]
    InvalidDirection(String),

    /// Transform target name was not recognized.
    #[error("invalid target '{0}', expected bone or prosthesis")]
    InvalidTarget(String),

    /// A flat matrix did not have 16 coefficients.
    #[error("matrix must have 16 coefficients, got {0}")]
    InvalidMatrixLength(usize),

    /// A saved record has some but not all prosthesis fields set.
    #[error("prosthesis transform is partially stored: {present} of 9 fields present")]
    PartialProsthesisRecord {
        /// Number of non-null prosthesis fields.
        present: usize,
    },
}

impl From<ParseAxisError> for SceneError {
    fn from(err: ParseAxisError) -> Self {
        Self::InvalidAxis(err.0)
    }
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

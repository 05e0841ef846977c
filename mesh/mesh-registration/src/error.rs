//! Error types for point registration and sampling.

use thiserror::Error;

/// Errors that can occur during point sampling and rigid registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// Model point set is empty.
    #[error("model point set is empty")]
    EmptyModelPoints,

    /// World point set is empty.
    #[error("world point set is empty")]
    EmptyWorldPoints,

    /// Not enough correspondences provided for a rigid fit.
    #[error("at least {required} correspondences required, got {provided}")]
    InsufficientPoints {
        /// Number of correspondences required.
        required: usize,
        /// Number of correspondences provided.
        provided: usize,
    },

    /// Point sets to be paired have different lengths.
    #[error("point sets must have equal length: {model} vs {world}")]
    MismatchedLengths {
        /// Number of model points.
        model: usize,
        /// Number of world points.
        world: usize,
    },

    /// SVD computation failed during transform estimation.
    #[error("SVD computation failed during transform estimation")]
    SvdFailed,

    /// The candidate pool is smaller than the number of points requested.
    #[error("only {available} candidate points available, cannot select {requested}")]
    InsufficientCandidates {
        /// Size of the candidate pool after exclusions.
        available: usize,
        /// Number of points requested.
        requested: usize,
    },
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

//! Per-plan scene positioning and point registration sessions.
//!
//! This crate ties the geometry crates to surgical plans:
//! - **Scenes** - Bone and prosthesis transforms of a plan, saved and
//!   restored through a [`SceneStore`]
//! - **Registration sessions** - Sample, digitize, fit, predict and validate
//!   the model-to-world mapping of a plan's bone
//! - **Registries** - Plan-keyed maps of live sessions with a lock per session
//! - **[`PlanningService`]** - One method per planning request
//!
//! Meshes and durable storage are injected through the [`MeshSource`],
//! [`RegistrationStore`] and [`SceneStore`] traits; in-memory versions are
//! provided for tests and embedding.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use mesh_types::{MeshRef, SurfaceMesh};
//! use plan_session::{InMemoryMeshSource, PlanningService, SessionConfig, SessionState};
//!
//! let coords: Vec<f64> = (0..900_u32)
//!     .flat_map(|k| [f64::from(k % 30), f64::from(k / 30), f64::from(k % 17)])
//!     .collect();
//! let meshes = Arc::new(InMemoryMeshSource::new());
//! meshes.insert_mesh(MeshRef::from("femur"), SurfaceMesh::from_coords(&coords));
//! meshes.assign_bone(1, MeshRef::from("femur"));
//!
//! let service = PlanningService::in_memory(meshes, SessionConfig::deterministic(1));
//! service.create_registration(1, "top")?;
//!
//! // Digitize every main point (here: world space equals model space).
//! let status = service.points_status(1)?;
//! let mut progress = None;
//! for point in &status {
//!     progress = Some(service.register_point(1, point.index, point.model)?);
//! }
//!
//! let progress = progress.unwrap();
//! assert_eq!(progress.state, SessionState::MainComplete);
//! assert_eq!(progress.prediction_indices, Some(vec![10, 11, 12]));
//! # Ok::<(), plan_session::PlanError>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod error;
mod registry;
mod scene;
mod service;
mod session;
mod source;
mod store;

/// Identifier of a surgical plan.
pub type PlanId = u64;

pub use config::{SessionConfig, ViewDirection};
pub use error::{ErrorKind, NotReady, PlanError, PlanResult};
pub use registry::{PlanSession, SessionHandle, SessionRegistry};
pub use scene::SceneSession;
pub use service::PlanningService;
pub use session::{
    PointKind, PointStatus, PredictionReport, RegistrationProgress, RegistrationSession,
    SessionState,
};
pub use source::{InMemoryMeshSource, MeshSource, MeshSourceError};
pub use store::{
    InMemoryStore, RegistrationStore, SceneStore, StoreError, StoredRegistrationPoint,
};

//! Homogeneous transforms for the objects of a planning scene.
//!
//! A scene holds a patient bone and, optionally, a prosthesis. Each has a 4x4
//! affine transform. The prosthesis is positioned through incremental
//! slide/scale/rotate edits applied in its own local frame; both transforms
//! can be read and overwritten as 16 row-major coefficients and persisted as
//! translation, Euler rotation and scale triples.
//!
//! # Example
//!
//! ```
//! use mesh_types::{Axis, MeshRef};
//! use scene_transform::{SlideDirection, TransformStack, TransformTarget};
//!
//! let mut scene = TransformStack::load(MeshRef::from("plan-7/femur.stl"));
//! scene.attach_prosthesis(MeshRef::from("catalog/stem-12.stl"));
//!
//! scene.rotate(Axis::Z, 15.0)?;
//! scene.slide(SlideDirection::Up, 4.0)?;
//!
//! let saved = scene.snapshot();
//! assert!(saved.prosthesis.is_some());
//! assert!(scene.matrix(TransformTarget::Prosthesis).is_some());
//! # Ok::<(), scene_transform::SceneError>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod affine;
mod error;
mod record;
mod stack;

pub use affine::{AffineTransform, DEGENERATE_SCALE, TransformComponents};
pub use error::{SceneError, SceneResult};
pub use record::{SceneRecord, SceneTransforms};
pub use stack::{AttachOutcome, SlideDirection, TransformStack, TransformTarget};

//! Point-based rigid registration between model space and tracked world space.
//!
//! This crate provides the algorithmic core of landmark calibration:
//! - **Surface sampling** - Picks reachable candidate points on a bone surface
//! - **Kabsch algorithm** - Optimal rigid transform from paired points
//! - **Correspondences** - Model/world pairs and prediction error metrics
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with no I/O and no shared state. Session handling
//! and persistence live in `plan-session`.
//!
//! # Quick Start
//!
//! ## Sampling candidate points
//!
//! ```
//! use mesh_registration::{sample_surface_points, SamplingParams};
//! use mesh_types::{Axis, SurfaceMesh};
//! use rand::SeedableRng;
//!
//! let coords: Vec<f64> = (0..200)
//!     .flat_map(|i| [f64::from(i % 10), f64::from(i / 10), f64::from(i % 7)])
//!     .collect();
//! let mesh = SurfaceMesh::from_coords(&coords);
//!
//! let params = SamplingParams::new(Axis::Z, true);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let points = sample_surface_points(&mesh, &params, 3, &[], &mut rng).unwrap();
//! assert_eq!(points.len(), 3);
//! ```
//!
//! ## Fitting model to world
//!
//! ```
//! use mesh_registration::{align_correspondences, Correspondence};
//! use nalgebra::Point3;
//!
//! let pairs = [
//!     Correspondence::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.0)),
//!     Correspondence::new(Point3::new(1.0, 0.0, 0.0), Point3::new(11.0, 10.0, 0.0)),
//!     Correspondence::new(Point3::new(0.0, 1.0, 0.0), Point3::new(10.0, 11.0, 0.0)),
//! ];
//!
//! let fit = align_correspondences(&pairs).unwrap();
//! let predicted = fit.apply(&Point3::new(1.0, 1.0, 0.0));
//! assert!((predicted - Point3::new(11.0, 11.0, 0.0)).norm() < 1e-9);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod correspondence;
mod error;
mod kabsch;
mod sampling;
mod transform;

pub use correspondence::{
    Correspondence, ErrorSummary, MIN_CORRESPONDENCES, align_correspondences, point_error,
};
pub use error::{RegistrationError, RegistrationResult};
pub use kabsch::compute_rigid_transform;
pub use sampling::{SamplingParams, SurfacePoint, candidate_pool, sample_surface_points};
pub use transform::RigidTransform;

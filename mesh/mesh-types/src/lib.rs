//! Core mesh types for surgical plan registration.
//!
//! This crate provides the foundational types shared by the registration and
//! scene crates:
//!
//! - [`SurfaceMesh`] - The vertex set of an extracted surface, addressed by index
//! - [`MeshRef`] - Opaque reference to a mesh held by an external catalog
//! - [`Axis`] - Coordinate axis selector used for sampling and rotations
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! Mesh extraction from volumetric scans is not performed here; meshes are
//! produced by an external collaborator and are read-only to this workspace.
//!
//! # Units
//!
//! This library is **unit-agnostic**. All coordinates are `f64`.
//! Scan-derived meshes are usually in millimeters.
//!
//! # Coordinate System
//!
//! Uses a **right-handed coordinate system**:
//! - X: width (left/right)
//! - Y: depth (front/back)
//! - Z: height (up/down)
//!
//! # Example
//!
//! ```
//! use mesh_types::{Axis, Point3, SurfaceMesh};
//!
//! let mesh = SurfaceMesh::from_points(vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 4.0),
//! ]);
//!
//! let top = mesh
//!     .points
//!     .iter()
//!     .map(|p| Axis::Z.coord(p))
//!     .fold(f64::NEG_INFINITY, f64::max);
//! assert!((top - 4.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod axis;
mod bounds;
mod mesh;

pub use axis::{Axis, ParseAxisError};
pub use bounds::Aabb;
pub use mesh::{MeshRef, SurfaceMesh};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

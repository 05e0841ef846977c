//! Surface point meshes and mesh references.

use std::fmt;

use crate::Aabb;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The vertex set of an extracted bone or prosthesis surface.
///
/// Only vertex positions are kept; connectivity is irrelevant for point
/// sampling and registration. Points are addressed by their index into
/// [`points`](Self::points), which stays stable for the lifetime of the mesh.
///
/// # Example
///
/// ```
/// use mesh_types::{Point3, SurfaceMesh};
///
/// let mesh = SurfaceMesh::from_coords(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
/// assert_eq!(mesh.len(), 2);
/// assert_eq!(mesh.point_at(1), Some(Point3::new(1.0, 2.0, 3.0)));
/// assert_eq!(mesh.point_at(2), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceMesh {
    /// Vertex positions in model space.
    pub points: Vec<Point3<f64>>,
}

impl SurfaceMesh {
    /// Create an empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a mesh from vertex positions.
    #[inline]
    #[must_use]
    pub const fn from_points(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Create a mesh from a flat `[x0, y0, z0, x1, ...]` coordinate array.
    ///
    /// A trailing partial triple is ignored.
    #[must_use]
    pub fn from_coords(coords: &[f64]) -> Self {
        let points = coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self { points }
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the mesh has no points.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of the point at `index`, or `None` when out of range.
    #[inline]
    #[must_use]
    pub fn point_at(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).copied()
    }

    /// Bounding box of all points, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.points)
    }

    /// Returns a copy translated so its bounding-box center is the origin.
    ///
    /// Indices are preserved.
    #[must_use]
    pub fn recentered(&self) -> Self {
        let Some(bounds) = self.bounds() else {
            return Self::new();
        };
        let offset = bounds.center().coords;
        Self {
            points: self.points.iter().map(|p| p - offset).collect(),
        }
    }
}

/// Opaque reference to a mesh held by an external catalog.
///
/// Usually the storage path of the model file. Two references are the same
/// model exactly when they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MeshRef(String);

impl MeshRef {
    /// Wrap a catalog key or path.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeshRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MeshRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for MeshRef {
    fn from(key: String) -> Self {
        Self(key)
    }
}

//! Access to the meshes assigned to a plan.

use hashbrown::HashMap;
use mesh_types::{MeshRef, SurfaceMesh};
use parking_lot::RwLock;
use thiserror::Error;

use crate::PlanId;

/// Errors raised by a [`MeshSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshSourceError {
    /// No mesh is stored under the reference.
    #[error("mesh '{0}' not found")]
    NotFound(MeshRef),

    /// The mesh exists but its surface could not be extracted.
    #[error("failed to extract surface from '{reference}': {message}")]
    Extraction {
        /// Mesh that failed.
        reference: MeshRef,
        /// Description of the failure.
        message: String,
    },
}

/// Plan-to-mesh assignments and surface extraction.
///
/// Extraction may be slow (isosurface contouring of a scan); callers invoke
/// it without holding any session lock.
pub trait MeshSource: Send + Sync {
    /// Bone mesh assigned to the plan.
    fn bone_mesh(&self, plan: PlanId) -> Option<MeshRef>;

    /// Prosthesis assigned to the plan, if any.
    fn assigned_prosthesis(&self, plan: PlanId) -> Option<MeshRef>;

    /// Extracts the surface points of a mesh.
    ///
    /// # Errors
    ///
    /// Returns [`MeshSourceError`] when the mesh is unknown or extraction fails.
    fn extract_surface_mesh(&self, reference: &MeshRef) -> Result<SurfaceMesh, MeshSourceError>;
}

#[derive(Debug, Default)]
struct Catalog {
    meshes: HashMap<MeshRef, SurfaceMesh>,
    bones: HashMap<PlanId, MeshRef>,
    prostheses: HashMap<PlanId, MeshRef>,
}

/// [`MeshSource`] backed by in-memory maps.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshRef, SurfaceMesh};
/// use plan_session::{InMemoryMeshSource, MeshSource};
///
/// let source = InMemoryMeshSource::new();
/// source.insert_mesh(MeshRef::from("femur"), SurfaceMesh::from_coords(&[0.0, 0.0, 1.0]));
/// source.assign_bone(7, MeshRef::from("femur"));
///
/// assert_eq!(source.bone_mesh(7), Some(MeshRef::from("femur")));
/// assert_eq!(source.extract_surface_mesh(&MeshRef::from("femur")).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMeshSource {
    catalog: RwLock<Catalog>,
}

impl InMemoryMeshSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a mesh under `reference`, replacing any previous one.
    pub fn insert_mesh(&self, reference: MeshRef, mesh: SurfaceMesh) {
        self.catalog.write().meshes.insert(reference, mesh);
    }

    /// Assigns a bone mesh to a plan.
    pub fn assign_bone(&self, plan: PlanId, reference: MeshRef) {
        self.catalog.write().bones.insert(plan, reference);
    }

    /// Assigns a prosthesis to a plan.
    pub fn assign_prosthesis(&self, plan: PlanId, reference: MeshRef) {
        self.catalog.write().prostheses.insert(plan, reference);
    }

    /// Removes a plan's prosthesis assignment.
    pub fn unassign_prosthesis(&self, plan: PlanId) -> Option<MeshRef> {
        self.catalog.write().prostheses.remove(&plan)
    }
}

impl MeshSource for InMemoryMeshSource {
    fn bone_mesh(&self, plan: PlanId) -> Option<MeshRef> {
        self.catalog.read().bones.get(&plan).cloned()
    }

    fn assigned_prosthesis(&self, plan: PlanId) -> Option<MeshRef> {
        self.catalog.read().prostheses.get(&plan).cloned()
    }

    fn extract_surface_mesh(&self, reference: &MeshRef) -> Result<SurfaceMesh, MeshSourceError> {
        self.catalog
            .read()
            .meshes
            .get(reference)
            .cloned()
            .ok_or_else(|| MeshSourceError::NotFound(reference.clone()))
    }
}

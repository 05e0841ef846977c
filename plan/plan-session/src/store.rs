//! Durable storage of registration points and scene transforms.

use hashbrown::HashMap;
use nalgebra::Point3;
use parking_lot::RwLock;
use scene_transform::SceneRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PlanId;

/// Errors raised by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A row with the same `(plan, point_index)` already exists.
    #[error("registration point {point_index} already stored for plan {plan}")]
    DuplicatePoint {
        /// Plan of the row.
        plan: PlanId,
        /// Index of the row.
        point_index: usize,
    },

    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// One persisted model/world correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredRegistrationPoint {
    /// Main point index, `0..main_point_count`.
    pub point_index: usize,
    /// Model-space position.
    pub model: Point3<f64>,
    /// Digitized world-space position.
    pub world: Point3<f64>,
}

/// Storage of persisted main registration points, unique on
/// `(plan, point_index)`.
pub trait RegistrationStore: Send + Sync {
    /// Whether any points are stored for the plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot be queried.
    fn has_points(&self, plan: PlanId) -> Result<bool, StoreError>;

    /// Inserts all rows or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicatePoint`] if any `(plan, point_index)`
    /// already exists or repeats within `rows`.
    fn insert_points(
        &self,
        plan: PlanId,
        rows: &[StoredRegistrationPoint],
    ) -> Result<(), StoreError>;

    /// Stored rows of the plan, ordered by index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot be queried.
    fn points(&self, plan: PlanId) -> Result<Vec<StoredRegistrationPoint>, StoreError>;

    /// Deletes the plan's rows, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot be written.
    fn delete_points(&self, plan: PlanId) -> Result<usize, StoreError>;
}

/// Storage of one [`SceneRecord`] per plan.
pub trait SceneStore: Send + Sync {
    /// The plan's saved record, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot be queried.
    fn load(&self, plan: PlanId) -> Result<Option<SceneRecord>, StoreError>;

    /// Inserts or replaces the plan's record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the backend cannot be written.
    fn save(&self, plan: PlanId, record: &SceneRecord) -> Result<(), StoreError>;
}

/// Both stores in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    points: RwLock<HashMap<PlanId, Vec<StoredRegistrationPoint>>>,
    scenes: RwLock<HashMap<PlanId, SceneRecord>>,
}

impl InMemoryStore {
    /// Creates empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistrationStore for InMemoryStore {
    fn has_points(&self, plan: PlanId) -> Result<bool, StoreError> {
        Ok(self.points.read().get(&plan).is_some_and(|rows| !rows.is_empty()))
    }

    fn insert_points(
        &self,
        plan: PlanId,
        rows: &[StoredRegistrationPoint],
    ) -> Result<(), StoreError> {
        let mut points = self.points.write();
        let existing = points.entry(plan).or_default();

        let mut merged = existing.clone();
        for row in rows {
            if merged.iter().any(|r| r.point_index == row.point_index) {
                return Err(StoreError::DuplicatePoint {
                    plan,
                    point_index: row.point_index,
                });
            }
            merged.push(*row);
        }
        merged.sort_by_key(|r| r.point_index);
        *existing = merged;
        Ok(())
    }

    fn points(&self, plan: PlanId) -> Result<Vec<StoredRegistrationPoint>, StoreError> {
        Ok(self.points.read().get(&plan).cloned().unwrap_or_default())
    }

    fn delete_points(&self, plan: PlanId) -> Result<usize, StoreError> {
        Ok(self.points.write().remove(&plan).map_or(0, |rows| rows.len()))
    }
}

impl SceneStore for InMemoryStore {
    fn load(&self, plan: PlanId) -> Result<Option<SceneRecord>, StoreError> {
        Ok(self.scenes.read().get(&plan).copied())
    }

    fn save(&self, plan: PlanId, record: &SceneRecord) -> Result<(), StoreError> {
        self.scenes.write().insert(plan, *record);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(point_index: usize) -> StoredRegistrationPoint {
        #[allow(clippy::cast_precision_loss)]
        let v = point_index as f64;
        StoredRegistrationPoint {
            point_index,
            model: Point3::new(v, 0.0, 0.0),
            world: Point3::new(v, 1.0, 0.0),
        }
    }

    #[test]
    fn test_insert_and_read_sorted() {
        let store = InMemoryStore::new();
        assert!(!store.has_points(1).unwrap());

        store.insert_points(1, &[row(2), row(0), row(1)]).unwrap();

        assert!(store.has_points(1).unwrap());
        let indices: Vec<usize> = store.points(1).unwrap().iter().map(|r| r.point_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(!store.has_points(2).unwrap());
    }

    #[test]
    fn test_duplicate_insert_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store.insert_points(1, &[row(0), row(1)]).unwrap();

        let result = store.insert_points(1, &[row(5), row(1)]);

        assert_eq!(
            result,
            Err(StoreError::DuplicatePoint {
                plan: 1,
                point_index: 1
            })
        );
        assert_eq!(store.points(1).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_counts_rows() {
        let store = InMemoryStore::new();
        store.insert_points(4, &[row(0), row(1), row(2)]).unwrap();

        assert_eq!(store.delete_points(4).unwrap(), 3);
        assert_eq!(store.delete_points(4).unwrap(), 0);
        assert!(!store.has_points(4).unwrap());
    }

    #[test]
    fn test_scene_save_replaces() {
        let store = InMemoryStore::new();
        assert_eq!(store.load(9).unwrap(), None);

        let mut record = SceneRecord::default();
        store.save(9, &record).unwrap();
        record.bone[0] = 12.5;
        store.save(9, &record).unwrap();

        assert_eq!(store.load(9).unwrap(), Some(record));
    }
}

//! Candidate surface point selection.
//!
//! Registration points are drawn from the most extreme part of the surface
//! along one axis (for example the top of a bone when viewed from above),
//! so that the clinician can reach and digitize them.
//!
//! Selection has a deterministic part and a random part:
//!
//! 1. Sort all points by the chosen axis coordinate.
//! 2. Keep only the first point of every integer grid cell on the two
//!    remaining axes (the most extreme point of that column).
//! 3. Keep the leading fraction (default 25%) of that sequence as the
//!    candidate pool.
//! 4. Draw the requested number of points uniformly without replacement.
//!
//! Steps 1-3 are exposed on their own as [`candidate_pool`].

use crate::{RegistrationError, RegistrationResult};
use hashbrown::HashSet;
use mesh_types::{Axis, SurfaceMesh};
use nalgebra::Point3;
use rand::Rng;
use tracing::debug;

/// Parameters controlling the candidate pool.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Axis the surface is sorted along. Default: Z.
    pub axis: Axis,

    /// Sort from largest to smallest coordinate. Default: true.
    pub descending: bool,

    /// Leading fraction of the deduplicated sequence kept as the pool,
    /// in `[0, 1]`. Default: 0.25
    pub pool_fraction: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            descending: true,
            pool_fraction: 0.25,
        }
    }
}

impl SamplingParams {
    /// Creates params for the given axis and direction with the default pool fraction.
    #[must_use]
    pub fn new(axis: Axis, descending: bool) -> Self {
        Self {
            axis,
            descending,
            ..Default::default()
        }
    }

    /// Set the sort axis.
    #[must_use]
    pub const fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Set the sort direction.
    #[must_use]
    pub const fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Set the pool fraction, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_pool_fraction(mut self, fraction: f64) -> Self {
        self.pool_fraction = fraction.clamp(0.0, 1.0);
        self
    }
}

/// A candidate point together with its index in the source mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Index of the point in the mesh vertex array.
    pub mesh_index: usize,
    /// Model-space position.
    pub position: Point3<f64>,
}

/// Grid cell of a point projected onto the two axes other than `axis`.
///
/// Half-way coordinates round to the even neighbour, so 0.5 and 2.5 fall in
/// cells 0 and 2 while 1.4 and 3.0 fall in cells 1 and 3.
#[allow(clippy::cast_possible_truncation)]
fn cell_key(point: &Point3<f64>, axis: Axis) -> (i64, i64) {
    let [a, b] = axis.others();
    (
        a.coord(point).round_ties_even() as i64,
        b.coord(point).round_ties_even() as i64,
    )
}

/// Computes the deterministic candidate pool (steps 1-3).
///
/// The sort is stable, so points with equal coordinates keep mesh order and
/// repeated calls with the same inputs return the same pool.
///
/// # Example
///
/// ```
/// use mesh_registration::{candidate_pool, SamplingParams};
/// use mesh_types::SurfaceMesh;
///
/// // Four columns, each with a high and a low point.
/// let mesh = SurfaceMesh::from_coords(&[
///     0.0, 0.0, 1.0,  0.0, 0.0, 9.0,
///     5.0, 0.0, 2.0,  5.0, 0.0, 8.0,
///     0.0, 5.0, 3.0,  0.0, 5.0, 7.0,
///     5.0, 5.0, 4.0,  5.0, 5.0, 6.0,
/// ]);
///
/// let pool = candidate_pool(&mesh, &SamplingParams::default());
/// // 4 unique cells, 25% of them kept: the highest point overall.
/// assert_eq!(pool.len(), 1);
/// assert_eq!(pool[0].mesh_index, 1);
/// ```
#[must_use]
pub fn candidate_pool(mesh: &SurfaceMesh, params: &SamplingParams) -> Vec<SurfacePoint> {
    let axis = params.axis;

    let mut order: Vec<usize> = (0..mesh.len()).collect();
    order.sort_by(|&a, &b| {
        let ca = axis.coord(&mesh.points[a]);
        let cb = axis.coord(&mesh.points[b]);
        if params.descending {
            cb.total_cmp(&ca)
        } else {
            ca.total_cmp(&cb)
        }
    });

    let mut seen = HashSet::with_capacity(order.len());
    let deduped: Vec<SurfacePoint> = order
        .into_iter()
        .filter_map(|mesh_index| {
            let position = mesh.points[mesh_index];
            seen.insert(cell_key(&position, axis))
                .then_some(SurfacePoint {
                    mesh_index,
                    position,
                })
        })
        .collect();

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let cutoff = ((deduped.len() as f64) * params.pool_fraction).floor() as usize;

    let mut pool = deduped;
    pool.truncate(cutoff);
    pool
}

/// Draws `count` distinct candidate points at random.
///
/// Points whose mesh index appears in `exclude` are removed from the pool
/// before drawing. Each call is an independent draw; pass a seeded `rng` for
/// reproducible results.
///
/// # Errors
///
/// Returns [`RegistrationError::InsufficientCandidates`] when fewer than
/// `count` candidates remain.
///
/// # Example
///
/// ```
/// use mesh_registration::{sample_surface_points, SamplingParams};
/// use mesh_types::SurfaceMesh;
/// use rand::SeedableRng;
///
/// let coords: Vec<f64> = (0..400)
///     .flat_map(|i| [f64::from(i % 20), f64::from(i / 20), f64::from(i)])
///     .collect();
/// let mesh = SurfaceMesh::from_coords(&coords);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
///
/// let picked = sample_surface_points(&mesh, &SamplingParams::default(), 10, &[], &mut rng).unwrap();
/// assert_eq!(picked.len(), 10);
/// ```
pub fn sample_surface_points<R: Rng + ?Sized>(
    mesh: &SurfaceMesh,
    params: &SamplingParams,
    count: usize,
    exclude: &[usize],
    rng: &mut R,
) -> RegistrationResult<Vec<SurfacePoint>> {
    let mut pool = candidate_pool(mesh, params);
    if !exclude.is_empty() {
        let excluded: HashSet<usize> = exclude.iter().copied().collect();
        pool.retain(|p| !excluded.contains(&p.mesh_index));
    }

    if pool.len() < count {
        return Err(RegistrationError::InsufficientCandidates {
            available: pool.len(),
            requested: count,
        });
    }

    let picked: Vec<SurfacePoint> = rand::seq::index::sample(rng, pool.len(), count)
        .into_iter()
        .map(|i| pool[i])
        .collect();

    debug!(
        axis = %params.axis,
        descending = params.descending,
        pool = pool.len(),
        count,
        indices = ?picked.iter().map(|p| p.mesh_index).collect::<Vec<_>>(),
        "Sampled surface points"
    );

    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 20x20 columns on x/y, each with several heights.
    fn column_mesh(points_per_column: usize) -> SurfaceMesh {
        let mut coords = Vec::new();
        for level in 0..points_per_column {
            for i in 0..400_u32 {
                coords.push(f64::from(i % 20));
                coords.push(f64::from(i / 20));
                #[allow(clippy::cast_precision_loss)]
                coords.push(f64::from(i) + (level * 1000) as f64);
            }
        }
        SurfaceMesh::from_coords(&coords)
    }

    #[test]
    fn test_default_params() {
        let params = SamplingParams::default();
        assert_eq!(params.axis, Axis::Z);
        assert!(params.descending);
        assert!((params.pool_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_fraction_clamped() {
        let params = SamplingParams::default().with_pool_fraction(3.0);
        assert!((params.pool_fraction - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_keeps_most_extreme_point_per_cell() {
        let mesh = column_mesh(3);
        let pool = candidate_pool(&mesh, &SamplingParams::default());

        assert_eq!(pool.len(), 100);
        // Every pooled point comes from the top layer.
        assert!(pool.iter().all(|p| p.position.z >= 2000.0));
        // Sorted descending along z.
        assert!(pool
            .windows(2)
            .all(|w| w[0].position.z >= w[1].position.z));
    }

    #[test]
    fn test_pool_ascending() {
        let mesh = column_mesh(2);
        let params = SamplingParams::new(Axis::Z, false);
        let pool = candidate_pool(&mesh, &params);

        assert_eq!(pool.len(), 100);
        assert!(pool.iter().all(|p| p.position.z < 1000.0));
        assert_eq!(pool[0].mesh_index, 0);
    }

    #[test]
    fn test_pool_dedupes_on_other_axes() {
        // Sorting along x, cells are keyed on (y, z).
        let mesh = SurfaceMesh::from_coords(&[
            1.0, 0.0, 0.0, //
            9.0, 0.2, -0.3, //
            5.0, 3.0, 0.0, //
            7.0, 3.1, 0.1, //
        ]);
        let params = SamplingParams::new(Axis::X, true).with_pool_fraction(1.0);
        let pool = candidate_pool(&mesh, &params);

        let indices: Vec<usize> = pool.iter().map(|p| p.mesh_index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_pool_cells_round_half_to_even() {
        let mesh = SurfaceMesh::from_coords(&[
            0.5, 0.0, 40.0, //
            1.4, 0.0, 30.0, //
            2.5, 0.0, 20.0, //
            3.0, 0.0, 10.0, //
        ]);
        let params = SamplingParams::new(Axis::Z, true).with_pool_fraction(1.0);
        let pool = candidate_pool(&mesh, &params);

        let indices: Vec<usize> = pool.iter().map(|p| p.mesh_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pool_is_deterministic() {
        let mesh = column_mesh(2);
        let params = SamplingParams::default();
        assert_eq!(candidate_pool(&mesh, &params), candidate_pool(&mesh, &params));
    }

    #[test]
    fn test_sample_draws_distinct_points_from_pool() {
        let mesh = column_mesh(2);
        let params = SamplingParams::default();
        let pool = candidate_pool(&mesh, &params);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let picked = sample_surface_points(&mesh, &params, 10, &[], &mut rng).unwrap();

        assert_eq!(picked.len(), 10);
        let unique: HashSet<usize> = picked.iter().map(|p| p.mesh_index).collect();
        assert_eq!(unique.len(), 10);
        assert!(picked.iter().all(|p| pool.contains(p)));
    }

    #[test]
    fn test_sample_same_seed_same_draw() {
        let mesh = column_mesh(2);
        let params = SamplingParams::default();

        let a = sample_surface_points(&mesh, &params, 5, &[], &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        let b = sample_surface_points(&mesh, &params, 5, &[], &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_insufficient_candidates() {
        let mesh = column_mesh(1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = sample_surface_points(&mesh, &SamplingParams::default(), 101, &[], &mut rng);
        assert_eq!(
            result,
            Err(RegistrationError::InsufficientCandidates {
                available: 100,
                requested: 101
            })
        );
    }

    #[test]
    fn test_sample_exclusion_shrinks_pool() {
        let mesh = column_mesh(1);
        let params = SamplingParams::default();
        let pool = candidate_pool(&mesh, &params);
        let excluded: Vec<usize> = pool.iter().take(95).map(|p| p.mesh_index).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let picked = sample_surface_points(&mesh, &params, 5, &excluded, &mut rng).unwrap();
        assert!(picked.iter().all(|p| !excluded.contains(&p.mesh_index)));

        let result = sample_surface_points(&mesh, &params, 6, &excluded, &mut rng);
        assert!(matches!(
            result,
            Err(RegistrationError::InsufficientCandidates { available: 5, .. })
        ));
    }

    #[test]
    fn test_empty_mesh_has_empty_pool() {
        let pool = candidate_pool(&SurfaceMesh::new(), &SamplingParams::default());
        assert!(pool.is_empty());
    }
}

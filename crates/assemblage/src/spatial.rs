//! Spatial index mapping module centroids to module identities.
//!
//! Every collision and obstruction query of the growth engine is scoped through
//! [`SpatialIndex::query_within_radius`], so an iteration touches the local neighbourhood
//! only. [`GridIndex`] hashes points into uniform cubic cells.
use std::collections::HashMap;

use glam::{IVec3, Vec3};

use crate::assembly::ModuleId;

/// Point index keyed by module identity.
pub trait SpatialIndex: Send + Sync {
    fn insert(&mut self, point: Vec3, id: ModuleId);

    /// Removes the entry for `id` stored at `point`. Returns `false` when absent.
    fn remove(&mut self, point: Vec3, id: ModuleId) -> bool;

    /// Identities whose point lies within `radius` of `point`, in ascending order.
    fn query_within_radius(&self, point: Vec3, radius: f32) -> Vec<ModuleId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Uniform hashed grid.
#[derive(Clone, Debug)]
pub struct GridIndex {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<(Vec3, ModuleId)>>,
    len: usize,
}

impl GridIndex {
    /// Creates an index with cubic cells of `cell_size` (clamped to a small positive value).
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn cell_of(&self, p: Vec3) -> IVec3 {
        (p / self.cell_size).floor().as_ivec3()
    }
}

impl Default for GridIndex {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SpatialIndex for GridIndex {
    fn insert(&mut self, point: Vec3, id: ModuleId) {
        let cell = self.cell_of(point);
        self.cells.entry(cell).or_default().push((point, id));
        self.len += 1;
    }

    fn remove(&mut self, point: Vec3, id: ModuleId) -> bool {
        let holds = |bucket: &Vec<(Vec3, ModuleId)>| bucket.iter().any(|(_, e)| *e == id);
        let expected = self.cell_of(point);
        // a point that drifted across a cell boundary is still found by its id
        let cell = if self.cells.get(&expected).is_some_and(holds) {
            Some(expected)
        } else {
            self.cells
                .iter()
                .find_map(|(cell, bucket)| holds(bucket).then_some(*cell))
        };
        let Some(cell) = cell else {
            return false;
        };
        let Some(bucket) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|(_, e)| *e == id) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.cells.remove(&cell);
        }
        self.len -= 1;
        true
    }

    fn query_within_radius(&self, point: Vec3, radius: f32) -> Vec<ModuleId> {
        if radius < 0.0 || !radius.is_finite() {
            return Vec::new();
        }
        let lo = self.cell_of(point - Vec3::splat(radius));
        let hi = self.cell_of(point + Vec3::splat(radius));
        let r2 = radius * radius;

        let mut out = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    if let Some(bucket) = self.cells.get(&IVec3::new(x, y, z)) {
                        out.extend(
                            bucket
                                .iter()
                                .filter(|(p, _)| p.distance_squared(point) <= r2)
                                .map(|(_, id)| *id),
                        );
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_query_filters_by_distance() {
        let mut index = GridIndex::new(1.0);
        index.insert(Vec3::ZERO, 0);
        index.insert(Vec3::new(1.5, 0.0, 0.0), 1);
        index.insert(Vec3::new(0.0, 3.0, 0.0), 2);
        index.insert(Vec3::new(-0.9, -0.9, 0.0), 3);

        assert_eq!(index.query_within_radius(Vec3::ZERO, 2.0), vec![0, 1, 3]);
        assert_eq!(index.query_within_radius(Vec3::new(0.0, 3.0, 0.0), 0.1), vec![2]);
        assert!(index.query_within_radius(Vec3::splat(10.0), 1.0).is_empty());
    }

    #[test]
    fn remove_is_exact_and_idempotent() {
        let mut index = GridIndex::new(0.5);
        index.insert(Vec3::new(0.2, 0.2, 0.2), 7);
        index.insert(Vec3::new(0.2, 0.2, 0.2), 8);
        assert_eq!(index.len(), 2);

        assert!(index.remove(Vec3::new(0.2, 0.2, 0.2), 7));
        assert!(!index.remove(Vec3::new(0.2, 0.2, 0.2), 7));
        assert_eq!(index.len(), 1);
        assert_eq!(index.query_within_radius(Vec3::ZERO, 1.0), vec![8]);
    }

    #[test]
    fn remove_finds_entry_by_id_when_point_drifted() {
        let mut index = GridIndex::new(1.0);
        index.insert(Vec3::new(0.99, 0.0, 0.0), 4);
        assert!(index.remove(Vec3::new(1.01, 0.0, 0.0), 4));
        assert!(index.is_empty());
        assert_eq!(index.cell_count(), 0);
    }

    #[test]
    fn remove_drops_only_the_emptied_cell() {
        let mut index = GridIndex::new(1.0);
        index.insert(Vec3::new(0.5, 0.5, 0.5), 1);
        index.insert(Vec3::new(0.6, 0.5, 0.5), 2);
        index.insert(Vec3::new(3.5, 0.5, 0.5), 3);
        assert_eq!(index.cell_count(), 2);

        assert!(index.remove(Vec3::new(0.5, 0.5, 0.5), 1));
        assert_eq!(index.cell_count(), 2);
        assert!(index.remove(Vec3::new(3.5, 0.5, 0.5), 3));
        assert_eq!(index.cell_count(), 1);
        assert_eq!(index.query_within_radius(Vec3::ZERO, 5.0), vec![2]);
    }

    #[test]
    fn degenerate_cell_size_falls_back() {
        assert_eq!(GridIndex::new(0.0).cell_size(), 1.0);
        assert_eq!(GridIndex::new(f32::NAN).cell_size(), 1.0);
    }
}

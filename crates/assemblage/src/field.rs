//! Spatial fields used to bias receiver and sender selection.
//!
//! The engine consumes fields through [`FieldSampler`]; positions and vectors cross this
//! boundary as [`mint`] types so samplers can be written against any math library.
//! [`PointField`] is a point-cloud implementation with nearest and inverse-distance
//! interpolated sampling over a k-d tree.
use std::fmt;

use glam::{EulerRot, Quat, Vec3};
use kiddo::{KdTree, SquaredEuclidean};
use mint::{Point3, Vector3};

use crate::error::{Error, Result};

/// Oracle exposing nearest and interpolated samples of a scalar/vector/integer field.
pub trait FieldSampler: Send + Sync {
    fn closest_scalar(&self, p: Point3<f32>) -> f32;

    fn interpolated_scalar(&self, p: Point3<f32>) -> f32;

    fn closest_vector(&self, p: Point3<f32>) -> Vector3<f32>;

    fn interpolated_vector(&self, p: Point3<f32>) -> Vector3<f32>;

    /// Integer tags stored at the nearest sample (used to pick heuristic sets).
    fn closest_integer_weights(&self, p: Point3<f32>) -> Vec<i32>;
}

pub const DEFAULT_INTERPOLATION_NEIGHBOURS: usize = 8;

/// Rotation applied to points before they enter the tree.
///
/// Grids sampled on an axis plane would otherwise put more equal values on one split axis
/// than a tree bucket holds. Distances are unchanged by the rotation.
fn index_frame() -> Quat {
    Quat::from_euler(EulerRot::XYZ, 0.61, 0.37, 0.23)
}

fn tree_key(p: Vec3) -> [f32; 3] {
    (index_frame() * p).to_array()
}

/// Field defined by values attached to scattered sample points.
#[derive(Clone)]
pub struct PointField {
    points: Vec<Vec3>,
    tree: KdTree<f32, 3>,
    scalars: Vec<f32>,
    vectors: Vec<Vec3>,
    integer_weights: Vec<Vec<i32>>,
    neighbours: usize,
}

impl fmt::Debug for PointField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointField")
            .field("points", &self.points.len())
            .field("scalars", &self.scalars.len())
            .field("vectors", &self.vectors.len())
            .field("integer_weights", &self.integer_weights.len())
            .field("neighbours", &self.neighbours)
            .finish()
    }
}

impl Default for PointField {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PointField {
    /// Creates a field over `points` with no data attached yet.
    pub fn new(points: Vec<Vec3>) -> Self {
        let mut tree: KdTree<f32, 3> = KdTree::new();
        for (i, p) in points.iter().enumerate() {
            tree.add(&tree_key(*p), i as u64);
        }
        Self {
            points,
            tree,
            scalars: Vec::new(),
            vectors: Vec::new(),
            integer_weights: Vec::new(),
            neighbours: DEFAULT_INTERPOLATION_NEIGHBOURS,
        }
    }

    pub fn with_scalars(mut self, scalars: Vec<f32>) -> Self {
        self.scalars = scalars;
        self
    }

    pub fn with_vectors(mut self, vectors: Vec<Vec3>) -> Self {
        self.vectors = vectors;
        self
    }

    pub fn with_integer_weights(mut self, weights: Vec<Vec<i32>>) -> Self {
        self.integer_weights = weights;
        self
    }

    /// Number of nearest samples blended by the interpolated queries.
    pub fn with_interpolation_neighbours(mut self, k: usize) -> Self {
        self.neighbours = k.max(1);
        self
    }

    /// Checks that every attached data channel has one entry per point.
    pub fn validate(&self) -> Result<()> {
        let n = self.points.len();
        let check = |name: &str, len: usize| {
            if len != 0 && len != n {
                Err(Error::InvalidConfig(format!(
                    "field has {n} points but {len} {name}"
                )))
            } else {
                Ok(())
            }
        };
        check("scalars", self.scalars.len())?;
        check("vectors", self.vectors.len())?;
        check("integer weight entries", self.integer_weights.len())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn nearest(&self, p: Vec3) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let found = self.tree.nearest_one::<SquaredEuclidean>(&tree_key(p));
        Some(found.item as usize)
    }

    /// Indices and inverse-square-distance weights of the k nearest samples.
    fn blend_weights(&self, p: Vec3) -> Vec<(usize, f32)> {
        if self.points.is_empty() {
            return Vec::new();
        }
        let by_distance: Vec<(usize, f32)> = self
            .tree
            .nearest_n::<SquaredEuclidean>(&tree_key(p), self.neighbours)
            .into_iter()
            .map(|n| (n.item as usize, n.distance))
            .collect();

        if let Some(&(i, d2)) = by_distance.first() {
            if d2 <= f32::EPSILON {
                return vec![(i, 1.0)];
            }
        }
        let total: f32 = by_distance.iter().map(|(_, d2)| 1.0 / d2).sum();
        by_distance
            .into_iter()
            .map(|(i, d2)| (i, (1.0 / d2) / total))
            .collect()
    }
}

impl FieldSampler for PointField {
    fn closest_scalar(&self, p: Point3<f32>) -> f32 {
        self.nearest(p.into())
            .and_then(|i| self.scalars.get(i).copied())
            .unwrap_or(0.0)
    }

    fn interpolated_scalar(&self, p: Point3<f32>) -> f32 {
        if self.scalars.is_empty() {
            return 0.0;
        }
        self.blend_weights(p.into())
            .into_iter()
            .map(|(i, w)| self.scalars.get(i).copied().unwrap_or(0.0) * w)
            .sum()
    }

    fn closest_vector(&self, p: Point3<f32>) -> Vector3<f32> {
        self.nearest(p.into())
            .and_then(|i| self.vectors.get(i).copied())
            .unwrap_or(Vec3::ZERO)
            .into()
    }

    fn interpolated_vector(&self, p: Point3<f32>) -> Vector3<f32> {
        if self.vectors.is_empty() {
            return Vec3::ZERO.into();
        }
        let v: Vec3 = self
            .blend_weights(p.into())
            .into_iter()
            .map(|(i, w)| self.vectors.get(i).copied().unwrap_or(Vec3::ZERO) * w)
            .sum();
        v.into()
    }

    fn closest_integer_weights(&self, p: Point3<f32>) -> Vec<i32> {
        self.nearest(p.into())
            .and_then(|i| self.integer_weights.get(i).cloned())
            .unwrap_or_default()
    }
}

//! Triangulated collision surfaces.
use glam::{Affine3A, Vec3};

use crate::geometry::Aabb;

/// Closed triangle surface used for collision, containment and probe tests.
///
/// Bounding box and centroid are cached and kept in sync by [`CollisionMesh::transformed`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    aabb: Aabb,
    centroid: Vec3,
}

impl CollisionMesh {
    /// Creates a mesh, dropping triangles that reference missing vertices.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let n = vertices.len() as u32;
        let triangles: Vec<[u32; 3]> = triangles
            .into_iter()
            .filter(|t| t.iter().all(|&i| i < n))
            .collect();
        let aabb = Aabb::from_points(&vertices);
        let centroid = mean(&vertices);
        Self {
            vertices,
            triangles,
            aabb,
            centroid,
        }
    }

    /// Axis-aligned box with outward-facing triangles.
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        let corners = [
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let vertices = corners.iter().map(|c| *c + center).collect();
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self::new(vertices, triangles)
    }

    pub fn from_aabb(bb: &Aabb) -> Self {
        Self::cuboid(bb.center(), bb.size() * 0.5)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    pub fn triangle_iter(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangles.len()).map(move |i| self.triangle(i))
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Vertex mean.
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn transformed(&self, xf: &Affine3A) -> Self {
        let vertices: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|v| xf.transform_point3(*v))
            .collect();
        Self {
            aabb: Aabb::from_points(&vertices),
            centroid: xf.transform_point3(self.centroid),
            triangles: self.triangles.clone(),
            vertices,
        }
    }

    /// Shrinks the surface towards its centroid so its thinnest half extent loses `distance`.
    ///
    /// For convex modules the result lies strictly inside the original, which keeps
    /// face-to-face contact between neighbours from reading as a collision.
    pub fn offset_inward(&self, distance: f32) -> Self {
        let half = self.aabb.size() * 0.5;
        let thinnest = half.min_element();
        if thinnest <= 0.0 || distance <= 0.0 {
            return self.clone();
        }
        let scale = ((thinnest - distance) / thinnest).max(0.0);
        let c = self.centroid;
        let vertices: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|v| c + (*v - c) * scale)
            .collect();
        Self {
            aabb: Aabb::from_points(&vertices),
            centroid: c,
            triangles: self.triangles.clone(),
            vertices,
        }
    }
}

fn mean(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

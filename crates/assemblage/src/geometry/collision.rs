//! Collision predicates over [`CollisionMesh`] surfaces.
//!
//! The engine treats these as an oracle: it never inspects triangles itself. Implement
//! [`CollisionOracle`] to route the predicates to another geometry kernel.
use glam::Vec3;

use crate::geometry::{CollisionMesh, Ray};

/// Geometry predicates the growth engine depends on.
pub trait CollisionOracle: Send + Sync {
    /// Whether the two surfaces cross each other.
    fn intersects(&self, a: &CollisionMesh, b: &CollisionMesh) -> bool;

    /// Whether `point` lies strictly inside the closed surface. Points closer than
    /// `tolerance` to the surface count as outside.
    fn point_inside(&self, mesh: &CollisionMesh, point: Vec3, tolerance: f32) -> bool;

    /// Whether the finite ray hits the surface.
    fn ray_intersects(&self, ray: &Ray, mesh: &CollisionMesh) -> bool;
}

/// Brute-force triangle predicates with bounding-box rejection.
#[derive(Clone, Copy, Debug)]
pub struct MeshCollider {
    pub epsilon: f32,
}

impl Default for MeshCollider {
    fn default() -> Self {
        Self { epsilon: 1e-6 }
    }
}

impl MeshCollider {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }

    /// True if any triangle edge of `a` passes through a triangle of `b`.
    fn edges_cross(&self, a: &CollisionMesh, b: &CollisionMesh) -> bool {
        let b_box = b.aabb().grown(self.epsilon);
        for tri in a.triangle_iter() {
            for (p, q) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let d = q - p;
                let len = d.length();
                if len <= self.epsilon {
                    continue;
                }
                let dir = d / len;
                if !b_box.intersects_segment(p, dir, len) {
                    continue;
                }
                let hit = b.triangle_iter().any(|[v0, v1, v2]| {
                    ray_triangle_intersect(p, dir, v0, v1, v2, self.epsilon)
                        .is_some_and(|t| t <= len)
                });
                if hit {
                    return true;
                }
            }
        }
        false
    }
}

impl CollisionOracle for MeshCollider {
    fn intersects(&self, a: &CollisionMesh, b: &CollisionMesh) -> bool {
        if a.is_empty() || b.is_empty() || !a.aabb().intersects(b.aabb()) {
            return false;
        }
        self.edges_cross(a, b) || self.edges_cross(b, a)
    }

    fn point_inside(&self, mesh: &CollisionMesh, point: Vec3, tolerance: f32) -> bool {
        if mesh.is_empty() || !mesh.aabb().contains_point(point) {
            return false;
        }
        let tolerance = tolerance.max(self.epsilon);
        if mesh
            .triangle_iter()
            .any(|[a, b, c]| closest_point_on_triangle(point, a, b, c).distance(point) <= tolerance)
        {
            return false;
        }
        // skewed direction keeps the parity count away from shared edges
        let dir = Vec3::new(0.577_215_7, 0.611_803_4, 0.541_196_1).normalize();
        let crossings = mesh
            .triangle_iter()
            .filter(|[a, b, c]| ray_triangle_intersect(point, dir, *a, *b, *c, self.epsilon).is_some())
            .count();
        crossings % 2 == 1
    }

    fn ray_intersects(&self, ray: &Ray, mesh: &CollisionMesh) -> bool {
        if mesh.is_empty()
            || !mesh
                .aabb()
                .grown(self.epsilon)
                .intersects_segment(ray.origin, ray.direction, ray.length)
        {
            return false;
        }
        mesh.triangle_iter().any(|[a, b, c]| {
            ray_triangle_intersect(ray.origin, ray.direction, a, b, c, self.epsilon)
                .is_some_and(|t| t <= ray.length)
        })
    }
}

/// Möller–Trumbore ray/triangle intersection. Returns the distance along `dir` for hits in
/// front of the origin.
pub fn ray_triangle_intersect(
    origin: Vec3,
    dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    epsilon: f32,
) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = dir.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < epsilon {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > epsilon).then_some(t)
}

/// Closest point on triangle `abc` to `p` (Voronoi region walk).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

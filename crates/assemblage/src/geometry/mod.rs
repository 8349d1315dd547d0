//! Geometry boundary consumed by the growth engine.
//!
//! The engine only needs oriented frames, rigid transforms, bounding boxes and a handful of
//! collision predicates. The predicates live behind [`collision::CollisionOracle`] so a host
//! can plug in its own mesh kernel; [`collision::MeshCollider`] is the bundled implementation
//! working on [`mesh::CollisionMesh`] triangle soups.
use std::f32::consts::PI;

use glam::{Affine3A, Mat3, Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod collision;
pub mod mesh;

pub use collision::{CollisionOracle, MeshCollider};
pub use mesh::CollisionMesh;

/// An oriented frame: origin plus an orthonormal basis stored as a unit quaternion.
///
/// The local Z axis is the frame normal. Port frames point their normal outwards from the
/// module they belong to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub rotation: Quat,
}

impl Default for Frame {
    fn default() -> Self {
        Self::WORLD
    }
}

impl Frame {
    /// The world frame at the origin.
    pub const WORLD: Frame = Frame {
        origin: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(origin: Vec3, rotation: Quat) -> Self {
        Self {
            origin,
            rotation: rotation.normalize(),
        }
    }

    /// Builds a frame from an origin and two in-plane axes.
    ///
    /// `y_axis` is orthogonalised against `x_axis`. Returns `None` for degenerate input.
    pub fn from_axes(origin: Vec3, x_axis: Vec3, y_axis: Vec3) -> Option<Self> {
        let x = x_axis.try_normalize()?;
        let y = (y_axis - x * y_axis.dot(x)).try_normalize()?;
        let z = x.cross(y);
        let rotation = Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize();
        let frame = Self { origin, rotation };
        frame.is_finite().then_some(frame)
    }

    /// Builds a frame whose normal (local Z) points along `normal`.
    pub fn from_normal(origin: Vec3, normal: Vec3) -> Option<Self> {
        let z = normal.try_normalize()?;
        let rotation = Quat::from_rotation_arc(Vec3::Z, z);
        Some(Self { origin, rotation })
    }

    #[inline]
    pub fn x_axis(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    #[inline]
    pub fn y_axis(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// The frame normal.
    #[inline]
    pub fn z_axis(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.rotation.is_finite()
    }

    /// The rigid transform taking world coordinates local to this frame into world space.
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.origin)
    }

    /// Applies a rigid transform to the frame.
    pub fn transformed(&self, xf: &Affine3A) -> Self {
        let (_, rotation, _) = xf.to_scale_rotation_translation();
        Self {
            origin: xf.transform_point3(self.origin),
            rotation: (rotation * self.rotation).normalize(),
        }
    }

    /// Rotates the frame about its own normal by `degrees`.
    pub fn rotated_about_normal(&self, degrees: f32) -> Self {
        Self {
            origin: self.origin,
            rotation: (self.rotation * Quat::from_rotation_z(degrees.to_radians())).normalize(),
        }
    }

    /// Swaps the X and Y axes, which reverses the normal.
    pub fn flipped(&self) -> Self {
        let half_turn = Quat::from_axis_angle((Vec3::X + Vec3::Y).normalize(), PI);
        Self {
            origin: self.origin,
            rotation: (self.rotation * half_turn).normalize(),
        }
    }

    /// Transform mapping this frame onto `target` (orientation and origin).
    ///
    /// Returns `None` when the resulting transform is not finite.
    pub fn map_onto(&self, target: &Frame) -> Option<Affine3A> {
        let xf = target.to_affine() * self.to_affine().inverse();
        xf.is_finite().then_some(xf)
    }
}

/// Axis-aligned bounding box.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// An inverted box that contains nothing and absorbs the first point it is expanded by.
    pub const fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_point(*p);
        }
        bb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn grown(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Slab test for a segment starting at `origin` running `length` along unit `direction`.
    pub fn intersects_segment(&self, origin: Vec3, direction: Vec3, length: f32) -> bool {
        let mut t_min = 0.0f32;
        let mut t_max = length;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// A finite ray (segment) used for port obstruction probes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    pub length: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            length,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn end(&self) -> Vec3 {
        self.point_at(self.length)
    }
}

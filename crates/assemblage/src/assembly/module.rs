//! Modules: catalog prototypes and placed instances.
use glam::{Affine3A, Vec3};

use crate::assembly::port::Port;
use crate::assembly::{ModuleId, ModuleTypeId};
use crate::geometry::{CollisionMesh, Frame};

/// Inward offset applied to the collision mesh to build the collision-test variant.
pub const DEFAULT_OFFSET_DISTANCE: f32 = 0.01;

/// Structural support segment carried along with the module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Support {
    pub start: Vec3,
    pub end: Vec3,
}

impl Support {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// A geometric unit with typed ports.
///
/// Catalog prototypes have `id == None`; the engine assigns an identity on placement and
/// never reuses it.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub id: Option<ModuleId>,
    pub type_id: ModuleTypeId,
    pub name: String,
    pub reference_frame: Frame,
    /// Orientation used when aligning with vector fields.
    pub direction: Vec3,
    pub ports: Vec<Port>,
    pub collision_mesh: CollisionMesh,
    /// Slightly shrunk copy of `collision_mesh` for clash tests against neighbours.
    pub offset_mesh: CollisionMesh,
    pub weight: f32,
    pub integer_weight: i32,
    pub world_z_lock: bool,
    /// `(module, port)` pairs on other modules that this module occludes.
    pub occluded_neighbours: Vec<(ModuleId, usize)>,
    pub supports: Vec<Support>,
    pub receiver_value: f32,
    pub sender_value: f32,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        collision_mesh: CollisionMesh,
        reference_frame: Frame,
        ports: Vec<Port>,
    ) -> Self {
        let offset_mesh = collision_mesh.offset_inward(DEFAULT_OFFSET_DISTANCE);
        Self {
            id: None,
            type_id: 0,
            name: name.into(),
            direction: reference_frame.x_axis(),
            reference_frame,
            ports,
            collision_mesh,
            offset_mesh,
            weight: 1.0,
            integer_weight: 0,
            world_z_lock: false,
            occluded_neighbours: Vec::new(),
            supports: Vec::new(),
            receiver_value: 0.0,
            sender_value: 0.0,
        }
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction.normalize_or_zero();
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_world_z_lock(mut self, lock: bool) -> Self {
        self.world_z_lock = lock;
        self
    }

    pub fn with_supports(mut self, supports: Vec<Support>) -> Self {
        self.supports = supports;
        self
    }

    /// Rebuilds the collision-test mesh with a custom inward offset.
    pub fn with_offset_distance(mut self, distance: f32) -> Self {
        self.offset_mesh = self.collision_mesh.offset_inward(distance);
        self
    }

    /// Replaces the collision-test mesh with one supplied by an external geometry kernel.
    pub fn with_offset_mesh(mut self, mesh: CollisionMesh) -> Self {
        self.offset_mesh = mesh;
        self
    }

    pub fn centroid(&self) -> Vec3 {
        self.collision_mesh.centroid()
    }

    pub fn transform(&mut self, xf: &Affine3A) {
        self.reference_frame = self.reference_frame.transformed(xf);
        self.direction = xf.transform_vector3(self.direction).normalize_or_zero();
        for port in &mut self.ports {
            port.transform(xf);
        }
        self.collision_mesh = self.collision_mesh.transformed(xf);
        self.offset_mesh = self.offset_mesh.transformed(xf);
        for s in &mut self.supports {
            s.start = xf.transform_point3(s.start);
            s.end = xf.transform_point3(s.end);
        }
    }

    /// Clone with the rigid transform applied; identity and bookkeeping are reset.
    pub fn transformed(&self, xf: &Affine3A) -> Self {
        let mut m = self.clone();
        m.id = None;
        m.occluded_neighbours.clear();
        m.transform(xf);
        m
    }

    pub fn has_free_port(&self) -> bool {
        self.ports.iter().any(Port::is_free)
    }

    pub fn free_ports(&self) -> impl Iterator<Item = usize> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_free())
            .map(|(i, _)| i)
    }
}

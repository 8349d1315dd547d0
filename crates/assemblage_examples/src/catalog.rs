//! Module types shared by the demos.
use assemblage::prelude::*;
use glam::Vec3;

pub const BLOCK: &str = "Block";
pub const BEAM: &str = "Beam";

const QUARTER_TURNS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

fn face_port(origin: Vec3, normal: Vec3, weight: f32) -> Option<Port> {
    Frame::from_normal(origin, normal).map(|f| Port::new(f, "1", &QUARTER_TURNS, weight))
}

/// Unit cube with a port on each horizontal face.
pub fn block() -> Module {
    let ports = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y]
        .into_iter()
        .filter_map(|n| face_port(n * 0.5, n, 1.0))
        .collect();
    Module::new(
        BLOCK,
        CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
        Frame::WORLD,
        ports,
    )
    .with_world_z_lock(true)
}

/// 3x1x1 bar with end ports and one side port in the middle of each long face.
pub fn beam() -> Module {
    let ports = [
        (Vec3::new(1.5, 0.0, 0.0), Vec3::X),
        (Vec3::new(-1.5, 0.0, 0.0), -Vec3::X),
        (Vec3::new(0.0, 0.5, 0.0), Vec3::Y),
        (Vec3::new(0.0, -0.5, 0.0), -Vec3::Y),
    ]
    .into_iter()
    .filter_map(|(o, n)| face_port(o, n, 2.0))
    .collect();
    Module::new(
        BEAM,
        CollisionMesh::cuboid(Vec3::ZERO, Vec3::new(1.5, 0.5, 0.5)),
        Frame::WORLD,
        ports,
    )
    .with_weight(3.0)
    .with_world_z_lock(true)
}

/// Catalog holding [`block`] and [`beam`].
pub fn demo_catalog() -> Result<Catalog> {
    Catalog::new(vec![block(), beam()])
}

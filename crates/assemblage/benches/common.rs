use std::time::Duration;

use assemblage::prelude::*;
use criterion::{Criterion, Throughput};
use glam::Vec3;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Unit cube with a port on each of its four horizontal faces.
pub fn cross_block() -> Module {
    let faces = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y];
    let ports = faces
        .iter()
        .filter_map(|&n| Frame::from_normal(n * 0.5, n))
        .map(|f| Port::new(f, "1", &[0.0, 90.0, 180.0, 270.0], 1.0))
        .collect();
    Module::new(
        "X",
        CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
        Frame::WORLD,
        ports,
    )
    .with_world_z_lock(true)
}

pub fn grid_engine(receiver: ReceiverSelection, seed: u64) -> Assemblage {
    let catalog = Catalog::new(vec![cross_block()]).expect("catalog");
    let grammar = rules_to_grammar(&generate_rules(&catalog, 1));
    let start = catalog.instantiate("X", &Frame::WORLD).expect("start");
    Assemblage::new(
        catalog,
        HeuristicsSettings::new(grammar).with_receiver_selection(receiver),
        ExogenousSettings::new().with_world_z_lock(true),
        EngineConfig::default().with_seed(seed),
        vec![start],
    )
    .expect("engine")
}

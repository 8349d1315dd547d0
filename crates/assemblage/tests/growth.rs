use std::sync::Arc;

use assemblage::prelude::*;
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn port(origin: Vec3, normal: Vec3, kind: &str, rotations: &[f32]) -> Port {
    Port::new(
        Frame::from_normal(origin, normal).unwrap(),
        kind,
        rotations,
        1.0,
    )
}

fn unit_cube(name: &str, ports: Vec<Port>) -> Module {
    Module::new(
        name,
        CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
        Frame::WORLD,
        ports,
    )
}

/// Cube with ports on +X, -X and an unused +Y port.
fn block() -> Module {
    unit_cube(
        "A",
        vec![
            port(Vec3::new(0.5, 0.0, 0.0), Vec3::X, "1", &[0.0, 90.0]),
            port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0, 90.0]),
            port(Vec3::new(0.0, 0.5, 0.0), Vec3::Y, "2", &[0.0]),
        ],
    )
}

/// A slab attached through a -X port whose body hangs above the receiver.
fn overhang() -> Module {
    Module::new(
        "T",
        CollisionMesh::cuboid(Vec3::new(-0.7, 0.775, 0.0), Vec3::new(0.7, 0.225, 0.5)),
        Frame::WORLD,
        vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0, 90.0])],
    )
}

fn engine(catalog: Catalog, grammar: &str, start: &str) -> Assemblage {
    let origin = catalog.instantiate(start, &Frame::WORLD).unwrap();
    Assemblage::new(
        catalog,
        HeuristicsSettings::new(grammar),
        ExogenousSettings::new(),
        EngineConfig::default().with_seed(11),
        vec![origin],
    )
    .unwrap()
}

#[test]
fn ports_stay_mirrored_during_growth() {
    let catalog = Catalog::new(vec![block()]).unwrap();
    let mut e = engine(catalog, "A|0=90<A|1\nA|1=90<A|0", "A");
    for _ in 0..12 {
        e.update();
        assert_eq!(e.check_invariants(), Vec::<String>::new());
    }
    for (id, m) in e.modules() {
        for (p, port) in m.ports.iter().enumerate() {
            if port.occupancy != Occupancy::Connected {
                continue;
            }
            let other = e.module(port.neighbour_object.unwrap()).unwrap();
            let back = &other.ports[port.neighbour_port.unwrap()];
            assert_eq!(back.occupancy, Occupancy::Connected);
            assert_eq!(back.neighbour_object, Some(*id));
            assert_eq!(back.neighbour_port, Some(p));
        }
    }
}

#[test]
fn identities_increase_and_are_never_reused() {
    let catalog = Catalog::new(vec![block()]).unwrap();
    let mut e = engine(catalog, "A|0=90<A|1\nA|1=90<A|0", "A");
    let mut seen = Vec::new();
    for round in 0..4 {
        for p in e.grow(3) {
            seen.push(p.id);
        }
        if round % 2 == 0 {
            let last = *seen.last().unwrap();
            assert!(e.remove(last).is_some());
        }
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(e.next_id(), seen.last().unwrap() + 1);
}

#[test]
fn rescan_partitions_modules() {
    let catalog = Catalog::new(vec![block()]).unwrap();
    let mut e = engine(catalog, "A|0=90<A|1\nA|1=90<A|0", "A");
    e.grow(6);
    let walls = ExogenousSettings::new()
        .with_environment(EnvironmentGeometry::new(
            CollisionMesh::cuboid(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(0.7)),
            EnvironmentKind::Solid,
        ))
        .with_mode(EnvironmentMode::Collision);
    e.set_exogenous(walls);

    for id in e.available() {
        assert!(!e.unreachable().contains(id));
    }
    for (id, m) in e.modules() {
        let count = e.available().contains(id) as usize + e.unreachable().contains(id) as usize;
        assert_eq!(count, m.has_free_port() as usize, "module {id}");
    }
    assert!(e.check_invariants().is_empty());
}

#[test]
fn rules_round_trip_through_text() {
    let catalog = Catalog::new(vec![block(), overhang()]).unwrap();
    for rule in generate_rules(&catalog, 3) {
        let text = rule.to_string();
        assert_eq!(Rule::parse(&text, &catalog).unwrap(), rule, "{text}");
    }
    let parsed = parse_rules("A|0=90<T|0%2\n# comment\nT|0=0<A|1", &catalog).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parse_rules(&rules_to_grammar(&parsed), &catalog).unwrap(), parsed);
}

#[test]
fn single_attach() {
    let a = unit_cube("A", vec![port(Vec3::new(0.5, 0.0, 0.0), Vec3::X, "1", &[0.0])]);
    let b = unit_cube("B", vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0])]);
    let catalog = Catalog::new(vec![a, b]).unwrap();
    let mut e = engine(catalog, "A|0=0<B|0%1", "A");

    let placed = e.update().unwrap();
    assert_eq!(placed.name, "B");
    assert_eq!(e.len(), 2);
    let a = e.module(0).unwrap();
    let b = e.module(placed.id).unwrap();
    assert_eq!(a.ports[0].occupancy, Occupancy::Connected);
    assert_eq!(b.ports[0].occupancy, Occupancy::Connected);
    assert_eq!(a.ports[0].neighbour_object, Some(placed.id));
    assert_eq!(b.ports[0].neighbour_object, Some(0));
    assert_eq!(e.available(), &[placed.id]);
    assert!(b.centroid().abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-4));
}

#[test]
fn exhausted_receiver_becomes_unreachable() {
    let a = unit_cube("A", vec![port(Vec3::new(0.5, 0.0, 0.0), Vec3::X, "1", &[0.0])]);
    let b = unit_cube("B", vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0])]);
    let catalog = Catalog::new(vec![a, b]).unwrap();
    let mut start = catalog.instantiate("A", &Frame::WORLD).unwrap();
    start.ports[0].occupancy = Occupancy::Connected;
    let mut e = Assemblage::new(
        catalog,
        HeuristicsSettings::new("A|0=0<B|0%1"),
        ExogenousSettings::new(),
        EngineConfig::default(),
        vec![start],
    )
    .unwrap();

    let mut sink = VecSink::new();
    assert!(e.update_with_events(&mut sink).is_none());
    assert_eq!(e.len(), 1);
    assert!(e.available().is_empty());
    assert_eq!(e.unreachable(), &[0]);
    assert_eq!(sink.count(GrowthEventKind::ReceiverUnreachable), 1);
    assert_eq!(sink.count(GrowthEventKind::Exhausted), 1);
}

#[test]
fn placement_occludes_an_unrelated_free_port() {
    let catalog = Catalog::new(vec![block(), overhang()]).unwrap();
    let mut e = engine(catalog, "A|0=90<A|1", "A");
    assert_eq!(e.update().unwrap().id, 1);

    e.set_heuristics(HeuristicsSettings::new("A|0=90<T|0")).unwrap();
    let placed = e.update().unwrap();
    assert_eq!(placed.receiver, 1);
    assert!(placed.obstructed);

    let covered = &e.module(1).unwrap().ports[2];
    assert_eq!(covered.occupancy, Occupancy::Occluded);
    assert_eq!(covered.occupancy.code(), -1);
    assert_eq!(covered.neighbour_object, Some(placed.id));
    assert!(e
        .module(placed.id)
        .unwrap()
        .occluded_neighbours
        .contains(&(1, 2)));
    // the +Y port of the start module is out of reach
    assert!(e.module(0).unwrap().ports[2].is_free());
    assert!(e.rule_log().values().all(|r| !r.contains("|2")));
    assert!(e.check_invariants().is_empty());
}

#[test]
fn removal_repairs_connections_and_occlusions() {
    let catalog = Catalog::new(vec![block(), overhang()]).unwrap();
    let mut e = engine(catalog, "A|0=90<A|1", "A");
    e.update().unwrap();
    e.set_heuristics(HeuristicsSettings::new("A|0=90<T|0")).unwrap();
    let slab = e.update().unwrap().id;

    e.remove(slab).unwrap();
    let receiver = e.module(1).unwrap();
    assert!(receiver.ports[0].is_free());
    assert_eq!(receiver.ports[0].neighbour_object, None);
    assert!(receiver.ports[2].is_free());
    assert_eq!(receiver.ports[2].neighbour_object, None);
    assert!(e.available().contains(&1));
    assert!(e.check_invariants().is_empty());

    e.remove(1).unwrap();
    let start = e.module(0).unwrap();
    assert!(start.ports[0].is_free());
    assert!(e.available().contains(&0));
    assert_eq!(e.len(), 1);
    assert!(e.check_invariants().is_empty());
}

#[test]
fn coincident_free_ports_make_contact() {
    // B only docks from the left and has no rules of its own
    let stop = unit_cube("B", vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0])]);
    let catalog = Catalog::new(vec![block(), stop]).unwrap();
    let start = vec![
        catalog.instantiate("A", &Frame::WORLD).unwrap(),
        catalog
            .instantiate("B", &Frame::new(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY))
            .unwrap(),
    ];
    let mut e = Assemblage::new(
        catalog,
        HeuristicsSettings::new("A|0=90<A|1"),
        ExogenousSettings::new(),
        EngineConfig::default().with_seed(11),
        start,
    )
    .unwrap();

    let mut sink = VecSink::new();
    let placed = e.update_with_events(&mut sink).unwrap();
    assert_eq!(placed.receiver, 0);
    assert!(placed.obstructed);
    assert_eq!(sink.count(GrowthEventKind::PortsObstructed), 1);

    let new = &e.module(placed.id).unwrap().ports[0];
    assert_eq!(new.occupancy, Occupancy::Contact);
    assert_eq!(new.neighbour_object, Some(1));
    assert_eq!(new.neighbour_port, Some(0));
    let stop = &e.module(1).unwrap().ports[0];
    assert_eq!(stop.occupancy, Occupancy::Contact);
    assert_eq!(stop.neighbour_object, Some(placed.id));
    assert_eq!(stop.neighbour_port, Some(0));
    assert!(!e.available().contains(&1));
    assert!(!e.unreachable().contains(&1));
    assert!(e.check_invariants().is_empty());

    e.remove(placed.id).unwrap();
    let stop = &e.module(1).unwrap().ports[0];
    assert_eq!(stop.occupancy, Occupancy::Available);
    assert_eq!(stop.neighbour_object, None);
    assert!(e.unreachable().contains(&1));
    assert!(e.check_invariants().is_empty());
}

#[test]
fn field_picks_the_rule_set() {
    let a = unit_cube("A", vec![port(Vec3::new(0.5, 0.0, 0.0), Vec3::X, "1", &[0.0])]);
    let b = unit_cube("B", vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0])]);
    let c = unit_cube("C", vec![port(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X, "1", &[0.0])]);
    let catalog = Catalog::new(vec![a, b, c]).unwrap();
    let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
    let field = PointField::new(vec![Vec3::ZERO]).with_integer_weights(vec![vec![1]]);
    let heuristics = HeuristicsSettings::new("A|0=0<B|0")
        .with_rule_set("A|0=0<C|0")
        .with_mode(HeuristicsMode::Field);
    let mut e = Assemblage::new(
        catalog,
        heuristics,
        ExogenousSettings::new().with_field(Arc::new(field)),
        EngineConfig::default().with_seed(11),
        vec![start],
    )
    .unwrap();

    assert_eq!(e.module(0).unwrap().integer_weight, 1);
    let placed = e.update().unwrap();
    assert_eq!(placed.name, "C");
    assert_eq!(placed.rule, "A|0=0<C|0%1");
    assert_eq!(e.module(placed.id).unwrap().integer_weight, 1);
}

#[test]
fn weighted_random_choice_follows_weights() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let draws = 50_000;
    let hits = (0..draws)
        .filter(|_| select_wrc_index(&[1.0, 3.0], &mut rng) == Some(1))
        .count();
    let ratio = hits as f64 / draws as f64;
    assert!((ratio - 0.75).abs() < 0.015, "ratio {ratio}");
}

use assemblage::prelude::*;
use assemblage_examples::{demo_catalog, init_tracing, render_assemblage_to_png, RenderConfig, BLOCK};
use glam::{Vec2, Vec3};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let catalog = demo_catalog()?;
    let grammar = rules_to_grammar(&generate_rules(&catalog, 1));
    let start = catalog.instantiate(BLOCK, &Frame::WORLD)?;

    // Two solid pillars and a sandbox keeping growth inside a 30x30 square.
    let pillar = |x: f32, y: f32| {
        EnvironmentGeometry::new(
            CollisionMesh::cuboid(Vec3::new(x, y, 0.0), Vec3::new(3.0, 3.0, 2.0)),
            EnvironmentKind::Solid,
        )
    };
    let exogenous = ExogenousSettings::new()
        .with_environment(pillar(6.0, 0.0))
        .with_environment(pillar(-4.0, 8.0))
        .with_mode(EnvironmentMode::Collision)
        .with_sandbox(Aabb::new(Vec3::new(-15.0, -15.0, -1.0), Vec3::new(15.0, 15.0, 1.0)))
        .with_world_z_lock(true);

    let mut engine = Assemblage::new(
        catalog,
        HeuristicsSettings::new(grammar),
        exogenous,
        EngineConfig::default().with_seed(99),
        vec![start],
    )?;

    let mut sink = VecSink::new();
    engine.grow_with_events(400, &mut sink);
    println!(
        "{} placed, {} receivers retired, {} inside the sandbox",
        sink.count(GrowthEventKind::ModulePlaced),
        sink.count(GrowthEventKind::ReceiverUnreachable),
        engine.sandbox_modules().len()
    );

    // Dropping the obstacles gives the unreachable modules another chance.
    let open = engine.exogenous().clone().with_mode(EnvironmentMode::Ignore);
    engine.set_exogenous(open);
    engine.grow(100);

    let rc = RenderConfig::new((800, 800), Vec2::splat(-16.0), Vec2::splat(16.0));
    render_assemblage_to_png(&engine, &rc, "growth-environment-obstacles.png")?;

    Ok(())
}

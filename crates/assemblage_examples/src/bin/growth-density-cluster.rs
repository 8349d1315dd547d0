use assemblage::prelude::*;
use assemblage_examples::{demo_catalog, init_tracing, render_assemblage_to_png, RenderConfig, BLOCK};
use glam::Vec2;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Densest receiver first, smallest combined footprint wins: growth curls into a blob.
    let catalog = demo_catalog()?;
    let grammar = rules_to_grammar(&generate_rules(&catalog, 1));
    let start = catalog.instantiate(BLOCK, &Frame::WORLD)?;
    let heuristics = HeuristicsSettings::new(grammar)
        .with_receiver_selection(ReceiverSelection::Density)
        .with_sender_selection(SenderSelection::MinBoxVolume);

    let mut engine = Assemblage::new(
        catalog,
        heuristics,
        ExogenousSettings::new().with_world_z_lock(true),
        EngineConfig::default().with_collision_radius(3.0).with_seed(7),
        vec![start],
    )?;
    engine.grow(250);

    let rc = RenderConfig::new((800, 800), Vec2::splat(-20.0), Vec2::splat(20.0));
    render_assemblage_to_png(&engine, &rc, "growth-density-cluster.png")?;

    Ok(())
}

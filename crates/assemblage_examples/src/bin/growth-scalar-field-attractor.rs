use std::sync::Arc;

use assemblage::prelude::*;
use assemblage_examples::{demo_catalog, init_tracing, render_assemblage_to_png, RenderConfig, BLOCK};
use glam::{Vec2, Vec3};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Scalar field sampled on a grid: distance to an attractor in the upper right.
    let attractor = Vec3::new(15.0, 12.0, 0.0);
    let mut points = Vec::new();
    for y in -20..=20 {
        for x in -20..=20 {
            points.push(Vec3::new(x as f32, y as f32, 0.0));
        }
    }
    let scalars = points.iter().map(|p| p.distance(attractor)).collect();
    let field = PointField::new(points).with_scalars(scalars);
    field.validate()?;

    let catalog = demo_catalog()?;
    let grammar = rules_to_grammar(&generate_rules(&catalog, 1));
    let start = catalog.instantiate(BLOCK, &Frame::WORLD)?;

    // Receivers closest to the attractor are extended first; senders move towards it.
    let heuristics = HeuristicsSettings::new(grammar)
        .with_receiver_selection(ReceiverSelection::ScalarFieldNearest)
        .with_sender_selection(SenderSelection::ScalarFieldInterpolated);
    let exogenous = ExogenousSettings::new()
        .with_field(Arc::new(field))
        .with_threshold(0.0)
        .with_world_z_lock(true);

    let mut engine = Assemblage::new(
        catalog,
        heuristics,
        exogenous,
        EngineConfig::default().with_seed(3),
        vec![start],
    )?;
    engine.grow(60);

    let rc = RenderConfig::new((800, 800), Vec2::splat(-20.0), Vec2::splat(20.0));
    render_assemblage_to_png(&engine, &rc, "growth-scalar-field-attractor.png")?;

    Ok(())
}

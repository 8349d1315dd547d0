use assemblage::prelude::*;
use assemblage_examples::{
    demo_catalog, init_tracing, render_assemblage_to_png, ModuleStyle, RenderConfig, BEAM, BLOCK,
};
use glam::Vec2;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Every port pairing with every quarter turn; the world-up lock drops tilted variants.
    let catalog = demo_catalog()?;
    let grammar = rules_to_grammar(&generate_rules(&catalog, 1));
    let start = catalog.instantiate(BLOCK, &Frame::WORLD)?;

    let mut engine = Assemblage::new(
        catalog,
        HeuristicsSettings::new(grammar),
        ExogenousSettings::new().with_world_z_lock(true),
        EngineConfig::default().with_seed(42),
        vec![start],
    )?;
    let placed = engine.grow(300);
    println!(
        "placed {} modules, {} available, {} unreachable",
        placed.len(),
        engine.available().len(),
        engine.unreachable().len()
    );

    let mut rc = RenderConfig::new((800, 800), Vec2::splat(-25.0), Vec2::splat(25.0));
    rc.set_module_style(
        BEAM,
        ModuleStyle {
            fill: [210, 170, 90],
            outline: [90, 60, 20],
        },
    );
    render_assemblage_to_png(&engine, &rc, "growth-random-blocks.png")?;

    Ok(())
}

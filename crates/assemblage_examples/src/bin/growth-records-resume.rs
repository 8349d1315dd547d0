use assemblage::prelude::*;
use assemblage_examples::{demo_catalog, init_tracing, render_assemblage_to_png, RenderConfig, BLOCK};
use glam::Vec2;
use tracing::info;

fn settings(catalog: &Catalog) -> HeuristicsSettings {
    HeuristicsSettings::new(rules_to_grammar(&generate_rules(catalog, 1)))
        .with_receiver_selection(ReceiverSelection::Sequential)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let catalog = demo_catalog()?;
    let heuristics = settings(&catalog);
    let start = catalog.instantiate(BLOCK, &Frame::WORLD)?;
    let mut engine = Assemblage::new(
        catalog,
        heuristics,
        ExogenousSettings::new().with_world_z_lock(true),
        EngineConfig::default().with_seed(5),
        vec![start],
    )?;
    engine.grow(40);

    // Prune a few modules, then snapshot.
    for id in [10, 20, 30] {
        engine.remove(id);
    }
    let snapshot = engine.snapshot();

    let catalog = demo_catalog()?;
    let heuristics = settings(&catalog);
    let mut resumed = Assemblage::from_snapshot(
        catalog,
        heuristics,
        ExogenousSettings::new().with_world_z_lock(true),
        EngineConfig::default().with_seed(5),
        &snapshot,
    )?;

    let mut log = FnSink::new(|event: GrowthEvent| {
        if let GrowthEvent::ModulePlaced { placement } = event {
            info!("{} <- {} via {}", placement.receiver, placement.id, placement.rule);
        }
    });
    resumed.grow_with_events(20, &mut log);

    let problems = resumed.check_invariants();
    anyhow::ensure!(problems.is_empty(), "inconsistent engine: {problems:?}");

    let rc = RenderConfig::new((800, 800), Vec2::splat(-30.0), Vec2::splat(30.0));
    render_assemblage_to_png(&resumed, &rc, "growth-records-resume.png")?;

    Ok(())
}

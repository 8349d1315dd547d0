//! Availability rescan after settings changes.
use rayon::prelude::*;
use tracing::info;

use crate::assembly::ModuleId;
use crate::engine::events::{EventSink, GrowthEvent, GrowthEventKind};
use crate::engine::Assemblage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Available,
    Unreachable,
    Saturated,
}

impl Assemblage {
    /// Re-evaluates every available and unreachable module against the current settings.
    ///
    /// Unreachable modules are given another chance with their cached receiver value;
    /// modules that clash with the environment or cannot be extended by any rule end up
    /// unreachable, modules without free ports leave both lists. Safe to call repeatedly.
    pub fn rescan(&mut self) {
        self.rescan_with_events(&mut ())
    }

    pub fn rescan_with_events(&mut self, sink: &mut dyn EventSink) {
        let mut candidates: Vec<ModuleId> = std::mem::take(&mut self.available);
        candidates.append(&mut self.unreachable);
        candidates.sort_unstable();
        candidates.dedup();
        candidates.retain(|id| self.modules.contains_key(id));

        let judge = |id: &ModuleId| -> Verdict {
            let Some(module) = self.modules.get(id) else {
                return Verdict::Saturated;
            };
            if !module.has_free_port() {
                Verdict::Saturated
            } else if self
                .exogenous
                .environment_clash(module, self.collider.as_ref())
                || !self.is_reachable(module)
            {
                Verdict::Unreachable
            } else {
                Verdict::Available
            }
        };
        let verdicts: Vec<Verdict> = if candidates.len() > self.config.rescan_parallel_threshold {
            candidates.par_iter().map(judge).collect()
        } else {
            candidates.iter().map(judge).collect()
        };

        self.available_values.clear();
        for (id, verdict) in candidates.into_iter().zip(verdicts) {
            match verdict {
                Verdict::Available => self.push_available(id),
                Verdict::Unreachable => self.unreachable.push(id),
                Verdict::Saturated => {}
            }
        }

        info!(
            "Rescan finished: {} available, {} unreachable of {} modules.",
            self.available.len(),
            self.unreachable.len(),
            self.modules.len()
        );
        if sink.wants(GrowthEventKind::Rescanned) {
            sink.send(GrowthEvent::Rescanned {
                available: self.available.len(),
                unreachable: self.unreachable.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::assembly::{Catalog, Module, Port};
    use crate::engine::EngineConfig;
    use crate::geometry::{CollisionMesh, Frame};
    use crate::settings::{
        EnvironmentGeometry, EnvironmentKind, EnvironmentMode, ExogenousSettings,
        HeuristicsSettings,
    };

    fn bar() -> Module {
        let ports = vec![
            Port::new(
                Frame::from_normal(Vec3::new(0.5, 0.0, 0.0), Vec3::X).unwrap(),
                "1",
                &[90.0],
                1.0,
            ),
            Port::new(
                Frame::from_normal(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X).unwrap(),
                "1",
                &[90.0],
                1.0,
            ),
        ];
        Module::new(
            "A",
            CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
            Frame::WORLD,
            ports,
        )
    }

    fn engine(grammar: &str) -> Assemblage {
        let catalog = Catalog::new(vec![bar()]).unwrap();
        let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
        Assemblage::new(
            catalog,
            HeuristicsSettings::new(grammar),
            ExogenousSettings::new(),
            EngineConfig::default(),
            vec![start],
        )
        .unwrap()
    }

    #[test]
    fn rescan_keeps_a_strict_partition() {
        let mut e = engine("A|0=90<A|1\nA|1=90<A|0");
        e.grow(5);
        e.rescan();
        e.rescan();
        assert!(e.check_invariants().is_empty());
        for (id, m) in e.modules() {
            let listed = e.available().contains(id) as u8 + e.unreachable().contains(id) as u8;
            if m.has_free_port() {
                assert_eq!(listed, 1, "module {id}");
            } else {
                assert_eq!(listed, 0, "module {id}");
            }
        }
    }

    #[test]
    fn environment_change_moves_modules_to_unreachable_and_back() {
        let mut e = engine("A|0=90<A|1");
        e.update().unwrap();
        let solid = ExogenousSettings::new()
            .with_environment(EnvironmentGeometry::new(
                CollisionMesh::cuboid(Vec3::new(2.5, 0.0, 0.0), Vec3::splat(0.8)),
                EnvironmentKind::Solid,
            ))
            .with_mode(EnvironmentMode::Collision);
        e.set_exogenous(solid);
        assert!(e.available().is_empty());
        assert_eq!(e.unreachable(), &[0, 1]);

        // module 0 keeps a free port but its only rule needs the connected one
        e.set_exogenous(ExogenousSettings::new());
        assert_eq!(e.available(), &[1]);
        assert_eq!(e.unreachable(), &[0]);
    }

    #[test]
    fn heuristics_change_is_validated_first() {
        let mut e = engine("A|0=90<A|1");
        let bad = HeuristicsSettings::new("A|0=90<Q|1");
        assert!(e.set_heuristics(bad).is_err());
        assert_eq!(e.heuristics().rule_sets[0], "A|0=90<A|1");
    }
}

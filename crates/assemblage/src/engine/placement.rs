//! The growth iteration: receiver selection, winner selection and placement.
use rayon::prelude::*;
use tracing::{debug, info};

use crate::assembly::{Module, ModuleId, Rule};
use crate::engine::candidates::CandidateSet;
use crate::engine::events::{EventSink, GrowthEvent, GrowthEventKind};
use crate::engine::selection::select_index;
use crate::engine::{values, Assemblage, Placement};
use crate::settings::{HeuristicsMode, ReceiverSelection};

impl Assemblage {
    /// Runs one growth iteration, reporting progress to `sink`.
    ///
    /// Receivers without a surviving candidate are moved to unreachable and another one is
    /// selected, until a placement succeeds or no receiver is left.
    pub fn update_with_events(&mut self, sink: &mut dyn EventSink) -> Option<Placement> {
        loop {
            let Some(slot) = self.select_receiver() else {
                debug!(
                    "No available receivers left ({} unreachable).",
                    self.unreachable.len()
                );
                if sink.wants(GrowthEventKind::Exhausted) {
                    sink.send(GrowthEvent::Exhausted {
                        unreachable: self.unreachable.len(),
                    });
                }
                return None;
            };
            let receiver = self.available[slot];
            let candidates = self.retrieve_candidates(receiver);
            if candidates.is_empty() {
                self.available.remove(slot);
                self.available_values.remove(slot);
                self.unreachable.push(receiver);
                debug!("Receiver {} has no viable candidates; marked unreachable.", receiver);
                if sink.wants(GrowthEventKind::ReceiverUnreachable) {
                    sink.send(GrowthEvent::ReceiverUnreachable { receiver });
                }
                continue;
            }
            if sink.wants(GrowthEventKind::ReceiverSelected) {
                sink.send(GrowthEvent::ReceiverSelected {
                    receiver,
                    candidates: candidates.len(),
                });
            }

            let (winner, sender_value) = self.select_sender(receiver, &candidates)?;
            let (mut module, rule, neighbours) = candidates.take(winner)?;
            module.sender_value = sender_value;
            let mut placement = self.place(receiver, module, &rule, &neighbours)?;

            let report = self.resolve_obstructions(placement.id, &neighbours);
            placement.obstructed = report.changed();
            if report.changed() {
                self.drop_saturated(&neighbours);
            }
            if report.changed() && sink.wants(GrowthEventKind::PortsObstructed) {
                sink.send(GrowthEvent::PortsObstructed {
                    module: placement.id,
                    occluded: report.occluded,
                    contacts: report.contacts,
                });
            }
            if sink.wants(GrowthEventKind::ModulePlaced) {
                sink.send(GrowthEvent::ModulePlaced {
                    placement: placement.clone(),
                });
            }
            return Some(placement);
        }
    }

    /// Takes neighbours whose last free port was closed by contact or occlusion out of both
    /// lists. The new module itself always stays available.
    fn drop_saturated(&mut self, neighbours: &[ModuleId]) {
        for &id in neighbours {
            if self.modules.get(&id).is_some_and(|m| !m.has_free_port()) {
                self.remove_available(id);
                self.unreachable.retain(|u| *u != id);
            }
        }
    }

    fn select_receiver(&mut self) -> Option<usize> {
        let rule = self.heuristics.receiver_selection.selection();
        select_index(rule, &self.available_values, &mut self.rng)
    }

    /// Index of the winning candidate and the value it was chosen by.
    fn select_sender(
        &mut self,
        receiver: ModuleId,
        candidates: &CandidateSet,
    ) -> Option<(usize, f32)> {
        let strategy = self.heuristics.sender_selection;
        let receiver = self.modules.get(&receiver)?;
        let exogenous = &self.exogenous;
        let value = |(m, r): (&Module, &Rule)| values::sender_value(strategy, m, receiver, r, exogenous);
        let sender_values: Vec<f32> = if candidates.len() > self.config.sender_parallel_threshold {
            candidates
                .modules
                .par_iter()
                .zip(candidates.rules.par_iter())
                .map(value)
                .collect()
        } else {
            candidates
                .modules
                .iter()
                .zip(candidates.rules.iter())
                .map(value)
                .collect()
        };
        let winner = select_index(strategy.selection(), &sender_values, &mut self.rng)?;
        Some((winner, sender_values[winner]))
    }

    /// Connects `module` to `receiver` through `rule` and registers it.
    fn place(
        &mut self,
        receiver_id: ModuleId,
        mut module: Module,
        rule: &Rule,
        neighbours: &[ModuleId],
    ) -> Option<Placement> {
        let id = self.next_id;
        debug_assert!(
            !self.modules.contains_key(&id),
            "identity {id} assigned twice"
        );
        self.next_id += 1;
        module.id = Some(id);

        let receiver = self.modules.get_mut(&receiver_id)?;
        let receiver_port = receiver.ports.get_mut(rule.receiver_port)?;
        let sender_port = module.ports.get_mut(rule.sender_port)?;
        let weight = (receiver_port.weight + sender_port.weight) * 0.5;
        receiver_port.connect(id, rule.sender_port, weight);
        sender_port.connect(receiver_id, rule.receiver_port, weight);
        let receiver_saturated = !receiver.has_free_port();

        let rule_text = rule.to_string();
        self.rule_log.insert(id, rule_text.clone());
        self.receiver_log.insert(id, receiver_id);

        let strategy = self.heuristics.receiver_selection;
        if strategy == ReceiverSelection::Density {
            let mut density = 0.0;
            for n in neighbours {
                if let Some(w) = self.modules.get(n).map(|m| m.weight) {
                    density += w;
                    self.bump_receiver_value(*n, module.weight);
                }
            }
            module.receiver_value = density;
        } else {
            module.receiver_value = values::receiver_value(strategy, &module, &self.exogenous);
        }
        if self.heuristics.mode == HeuristicsMode::Field {
            if let Some(field) = self.exogenous.field() {
                module.integer_weight = values::field_rule_set(field, module.centroid());
            }
        }

        self.index.insert(module.centroid(), id);
        self.available.push(id);
        self.available_values.push(module.receiver_value);
        if receiver_saturated {
            self.remove_available(receiver_id);
        }

        let placement = Placement {
            id,
            name: module.name.clone(),
            receiver: receiver_id,
            receiver_port: rule.receiver_port,
            sender_port: rule.sender_port,
            rule: rule_text,
            obstructed: false,
        };
        info!(
            "Placed module {} ('{}') on receiver {} via '{}'.",
            id, placement.name, receiver_id, placement.rule
        );
        self.modules.insert(id, module);
        Some(placement)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;
    use crate::assembly::{Catalog, Occupancy, Port};
    use crate::engine::{EngineConfig, VecSink};
    use crate::geometry::{CollisionMesh, Frame};
    use crate::settings::{ExogenousSettings, HeuristicsSettings, SenderSelection};

    fn bar(name: &str) -> Module {
        let ports = vec![
            Port::new(
                Frame::from_normal(Vec3::new(0.5, 0.0, 0.0), Vec3::X).unwrap(),
                "1",
                &[90.0],
                2.0,
            ),
            Port::new(
                Frame::from_normal(Vec3::new(-0.5, 0.0, 0.0), -Vec3::X).unwrap(),
                "1",
                &[90.0],
                1.0,
            ),
        ];
        Module::new(
            name,
            CollisionMesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)),
            Frame::WORLD,
            ports,
        )
    }

    fn engine(heuristics: HeuristicsSettings) -> Assemblage {
        let catalog = Catalog::new(vec![bar("A")]).unwrap();
        let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
        Assemblage::new(
            catalog,
            heuristics,
            ExogenousSettings::new(),
            EngineConfig::default().with_seed(7),
            vec![start],
        )
        .unwrap()
    }

    #[test]
    fn placement_connects_both_ports_with_mean_weight() {
        let mut e = engine(HeuristicsSettings::new("A|0=90<A|1"));
        let p = e.update().unwrap();
        assert_eq!(p.id, 1);
        assert_eq!(p.receiver, 0);
        let a = e.module(0).unwrap();
        let b = e.module(1).unwrap();
        assert_eq!(a.ports[0].occupancy, Occupancy::Connected);
        assert_eq!(a.ports[0].neighbour_object, Some(1));
        assert_eq!(a.ports[0].neighbour_port, Some(1));
        assert_eq!(b.ports[1].neighbour_object, Some(0));
        assert_eq!(a.ports[0].weight, 1.5);
        assert_eq!(b.ports[1].weight, 1.5);
        assert_eq!(e.rule_log()[&1], "A|0=90<A|1%1");
        assert_eq!(e.receiver_log()[&1], 0);
        assert!(e.check_invariants().is_empty());
    }

    #[test]
    fn sequential_growth_extends_the_newest_module() {
        let heuristics = HeuristicsSettings::new("A|0=90<A|1")
            .with_receiver_selection(ReceiverSelection::Sequential);
        let mut e = engine(heuristics);
        let placements = e.grow(4);
        assert_eq!(placements.len(), 4);
        for (i, p) in placements.iter().enumerate() {
            assert_eq!(p.receiver, i as ModuleId);
        }
        assert!(e
            .module(4)
            .unwrap()
            .centroid()
            .abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-3));
    }

    #[test]
    fn density_accumulates_on_neighbours() {
        let heuristics = HeuristicsSettings::new("A|0=90<A|1")
            .with_receiver_selection(ReceiverSelection::Density)
            .with_sender_selection(SenderSelection::MinBoxVolume);
        let mut e = engine(heuristics);
        e.update().unwrap();
        assert_eq!(e.module(0).unwrap().receiver_value, 1.0);
        assert_eq!(e.module(1).unwrap().receiver_value, 1.0);

        let incremental: Vec<f32> = e.modules().values().map(|m| m.receiver_value).collect();
        e.recompute_values();
        let full: Vec<f32> = e.modules().values().map(|m| m.receiver_value).collect();
        assert_eq!(incremental, full);
    }

    #[test]
    fn winner_keeps_its_sender_value() {
        let long = Module::new(
            "L",
            CollisionMesh::cuboid(Vec3::ZERO, Vec3::new(1.0, 0.5, 0.5)),
            Frame::WORLD,
            vec![Port::new(
                Frame::from_normal(Vec3::new(-1.0, 0.0, 0.0), -Vec3::X).unwrap(),
                "1",
                &[90.0],
                1.0,
            )],
        );
        let catalog = Catalog::new(vec![bar("A"), long]).unwrap();
        let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
        let heuristics = HeuristicsSettings::new("A|0=90<L|0\nA|0=90<A|1")
            .with_sender_selection(SenderSelection::MinBoxVolume);
        let mut e = Assemblage::new(
            catalog,
            heuristics,
            ExogenousSettings::new(),
            EngineConfig::default().with_seed(7),
            vec![start],
        )
        .unwrap();

        let p = e.update().unwrap();
        assert_eq!(p.name, "A");
        // the pair of unit cubes spans 2x1x1; the long box would span 3x1x1
        assert_relative_eq!(e.module(p.id).unwrap().sender_value, 2.0, epsilon = 1e-4);
        let record = &e.snapshot().modules[p.id as usize];
        assert_relative_eq!(record.sender_value, 2.0, epsilon = 1e-4);
        assert_eq!(e.module(0).unwrap().sender_value, 0.0);
    }

    #[test]
    fn events_report_each_step() {
        let mut e = engine(HeuristicsSettings::new("A|0=90<A|1"));
        let mut sink = VecSink::new();
        e.update_with_events(&mut sink).unwrap();
        assert_eq!(sink.count(GrowthEventKind::ReceiverSelected), 1);
        assert_eq!(sink.count(GrowthEventKind::ModulePlaced), 1);
    }
}

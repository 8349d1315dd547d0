//! Module removal and neighbour repair.
use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::assembly::{Module, ModuleId, Occupancy};
use crate::engine::events::{EventSink, GrowthEvent, GrowthEventKind};
use crate::engine::Assemblage;
use crate::settings::ReceiverSelection;

impl Assemblage {
    /// Removes a placed module, repairing every link that points at it.
    ///
    /// Returns the removed module, or `None` when `id` is not placed.
    pub fn remove(&mut self, id: ModuleId) -> Option<Module> {
        self.remove_with_events(id, &mut ())
    }

    pub fn remove_with_events(
        &mut self,
        id: ModuleId,
        sink: &mut dyn EventSink,
    ) -> Option<Module> {
        let mut module = self.modules.remove(&id)?;
        let mut touched = BTreeSet::new();
        let mut released = 0;

        for (p, port) in module.ports.iter().enumerate() {
            match port.occupancy {
                Occupancy::Connected | Occupancy::Contact => {
                    let (Some(nid), Some(q)) = (port.neighbour_object, port.neighbour_port) else {
                        continue;
                    };
                    let Some(other) = self.modules.get_mut(&nid).and_then(|n| n.ports.get_mut(q))
                    else {
                        continue;
                    };
                    if other.neighbour_object == Some(id) && other.neighbour_port == Some(p) {
                        other.release();
                        released += 1;
                        touched.insert(nid);
                    }
                }
                Occupancy::Occluded => {
                    if let Some(occluder) = port.neighbour_object.and_then(|o| self.modules.get_mut(&o)) {
                        occluder
                            .occluded_neighbours
                            .retain(|&(m, q)| !(m == id && q == p));
                    }
                }
                Occupancy::Available => {}
            }
        }

        for (nid, q) in module.occluded_neighbours.drain(..) {
            let Some(port) = self.modules.get_mut(&nid).and_then(|n| n.ports.get_mut(q)) else {
                continue;
            };
            if port.occupancy == Occupancy::Occluded && port.neighbour_object == Some(id) {
                port.release();
                released += 1;
                touched.insert(nid);
            }
        }

        self.remove_available(id);
        self.unreachable.retain(|u| *u != id);
        let centroid = module.centroid();
        self.index.remove(centroid, id);
        self.rule_log.remove(&id);
        self.receiver_log.remove(&id);

        if self.heuristics.receiver_selection == ReceiverSelection::Density {
            for n in self
                .index
                .query_within_radius(centroid, self.config.collision_radius)
            {
                self.bump_receiver_value(n, -module.weight);
            }
        }

        for nid in touched {
            self.revive(nid);
        }

        debug_assert!(
            self.dangling_links(id).is_empty(),
            "removed module {id} is still referenced: {:?}",
            self.dangling_links(id)
        );
        info!("Removed module {} ('{}'); {} port(s) released.", id, module.name, released);
        if sink.wants(GrowthEventKind::ModuleRemoved) {
            sink.send(GrowthEvent::ModuleRemoved {
                id,
                released_ports: released,
            });
        }
        module.id = None;
        Some(module)
    }

    /// Re-evaluates a module whose ports were freed: it joins the available list when one of
    /// its free ports can be extended, and the unreachable list otherwise.
    fn revive(&mut self, id: ModuleId) {
        let Some(module) = self.modules.get(&id) else {
            return;
        };
        if !module.has_free_port() || self.available_slot(id).is_some() {
            return;
        }
        let reachable = self.is_reachable(module);
        let was_unreachable = self.unreachable.contains(&id);
        if reachable {
            self.unreachable.retain(|u| *u != id);
            self.push_available(id);
            debug!("Module {} is reachable again.", id);
        } else if !was_unreachable {
            self.unreachable.push(id);
        }
    }

    /// Links on placed modules that still point at `id`.
    fn dangling_links(&self, id: ModuleId) -> Vec<(ModuleId, usize)> {
        let mut links = Vec::new();
        for (&mid, module) in &self.modules {
            for (p, port) in module.ports.iter().enumerate() {
                if port.neighbour_object == Some(id) {
                    links.push((mid, p));
                }
            }
            for (k, &(n, _)) in module.occluded_neighbours.iter().enumerate() {
                if n == id {
                    links.push((mid, k));
                }
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::assembly::{Catalog, Port};
    use crate::engine::{EngineConfig, VecSink};
    use crate::geometry::{CollisionMesh, Frame};
    use crate::settings::{ExogenousSettings, HeuristicsSettings};

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

    fn engine() -> Assemblage {
        let catalog = Catalog::new(vec![bar()]).unwrap();
        let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
        Assemblage::new(
            catalog,
            HeuristicsSettings::new("A|0=90<A|1"),
            ExogenousSettings::new(),
            EngineConfig::default(),
            vec![start],
        )
        .unwrap()
    }

    #[test]
    fn removal_frees_the_mirrored_port() {
        let mut e = engine();
        let p = e.update().unwrap();
        let removed = e.remove(p.id).unwrap();
        assert_eq!(removed.name, "A");
        let a = e.module(0).unwrap();
        assert!(a.ports[0].is_free());
        assert_eq!(a.ports[0].neighbour_object, None);
        assert!(e.available().contains(&0));
        assert!(!e.available().contains(&p.id));
        assert!(e.rule_log().is_empty());
        assert!(e.check_invariants().is_empty());
    }

    #[test]
    fn removal_is_idempotent() {
        let mut e = engine();
        let p = e.update().unwrap();
        let mut sink = VecSink::new();
        assert!(e.remove_with_events(p.id, &mut sink).is_some());
        assert!(e.remove_with_events(p.id, &mut sink).is_none());
        assert_eq!(sink.count(GrowthEventKind::ModuleRemoved), 1);
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn saturated_neighbour_rejoins_available() {
        let mut e = engine();
        e.grow(2);
        // module 1 is saturated and dropped from available
        assert!(!e.available().contains(&1));
        e.remove(2);
        assert!(e.available().contains(&1));
        assert!(e.check_invariants().is_empty());
    }
}

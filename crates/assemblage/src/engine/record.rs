//! Persisted module records for resuming growth.
//!
//! A record stores what cannot be recomputed from the catalog: identity, placement frame,
//! port occupancy and links, occlusion bookkeeping, cached values and list membership.
//! Geometry is rebuilt from the catalog prototype on load. An [`AssemblageSnapshot`] adds
//! the identity counter so identities of removed modules stay retired after a resume.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly::{Catalog, ModuleId, Occupancy};
use crate::engine::{Assemblage, EngineConfig};
use crate::error::{Error, Result};
use crate::geometry::Frame;
use crate::settings::{ExogenousSettings, HeuristicsSettings};

/// List membership of a placed module.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleStatus {
    Available,
    Unreachable,
    /// In neither list.
    Saturated,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PortRecord {
    pub occupancy: Occupancy,
    pub neighbour_object: Option<ModuleId>,
    pub neighbour_port: Option<usize>,
    pub weight: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// Catalog name of the module type.
    pub name: String,
    pub reference_frame: Frame,
    pub ports: Vec<PortRecord>,
    pub occluded_neighbours: Vec<(ModuleId, usize)>,
    pub weight: f32,
    pub integer_weight: i32,
    pub receiver_value: f32,
    pub sender_value: f32,
    /// Rule text that placed the module; `None` for start modules.
    pub rule: Option<String>,
    /// Module this one was attached to. Kept as history, so it may name a removed module.
    pub receiver: Option<ModuleId>,
    pub status: ModuleStatus,
}

/// Everything needed to resume growth: the placed modules and the identity counter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblageSnapshot {
    /// Identity the next placement receives.
    pub next_id: ModuleId,
    pub modules: Vec<ModuleRecord>,
}

impl Assemblage {
    /// Snapshot of every placed module, in identity order.
    pub fn records(&self) -> Vec<ModuleRecord> {
        self.modules
            .iter()
            .map(|(&id, m)| ModuleRecord {
                id,
                name: m.name.clone(),
                reference_frame: m.reference_frame,
                ports: m
                    .ports
                    .iter()
                    .map(|p| PortRecord {
                        occupancy: p.occupancy,
                        neighbour_object: p.neighbour_object,
                        neighbour_port: p.neighbour_port,
                        weight: p.weight,
                    })
                    .collect(),
                occluded_neighbours: m.occluded_neighbours.clone(),
                weight: m.weight,
                integer_weight: m.integer_weight,
                receiver_value: m.receiver_value,
                sender_value: m.sender_value,
                rule: self.rule_log.get(&id).cloned(),
                receiver: self.receiver_log.get(&id).copied(),
                status: if self.unreachable.contains(&id) {
                    ModuleStatus::Unreachable
                } else if self.available.contains(&id) {
                    ModuleStatus::Available
                } else {
                    ModuleStatus::Saturated
                },
            })
            .collect()
    }

    pub fn snapshot(&self) -> AssemblageSnapshot {
        AssemblageSnapshot {
            next_id: self.next_id,
            modules: self.records(),
        }
    }

    /// Rebuilds an engine from a snapshot produced by [`Assemblage::snapshot`].
    ///
    /// Modules are re-instantiated from `catalog` by name and restored verbatim; nothing is
    /// re-evaluated. Fails with [`Error::InvalidRecord`] on unknown names, duplicate
    /// identities, port count mismatches, port or occlusion links to identities that are not
    /// in the snapshot, or a `next_id` that is not above every stored identity.
    pub fn from_snapshot(
        catalog: Catalog,
        heuristics: HeuristicsSettings,
        exogenous: ExogenousSettings,
        config: EngineConfig,
        snapshot: &AssemblageSnapshot,
    ) -> Result<Self> {
        let records = &snapshot.modules;
        let mut engine = Self::empty(catalog, heuristics, exogenous, config)?;

        for record in records {
            if engine.modules.contains_key(&record.id) {
                return Err(Error::InvalidRecord(format!(
                    "identity {} appears twice",
                    record.id
                )));
            }
            let mut module = engine
                .catalog
                .instantiate(&record.name, &record.reference_frame)
                .map_err(|e| Error::InvalidRecord(format!("module {}: {e}", record.id)))?;
            if module.ports.len() != record.ports.len() {
                return Err(Error::InvalidRecord(format!(
                    "module {} has {} ports, type '{}' has {}",
                    record.id,
                    record.ports.len(),
                    record.name,
                    module.ports.len()
                )));
            }
            for (port, saved) in module.ports.iter_mut().zip(&record.ports) {
                port.occupancy = saved.occupancy;
                port.neighbour_object = saved.neighbour_object;
                port.neighbour_port = saved.neighbour_port;
                port.weight = saved.weight;
            }
            module.id = Some(record.id);
            module.reference_frame = record.reference_frame;
            module.occluded_neighbours = record.occluded_neighbours.clone();
            module.weight = record.weight;
            module.integer_weight = record.integer_weight;
            module.receiver_value = record.receiver_value;
            module.sender_value = record.sender_value;

            engine.index.insert(module.centroid(), record.id);
            engine.modules.insert(record.id, module);
            if let Some(rule) = &record.rule {
                engine.rule_log.insert(record.id, rule.clone());
            }
            if let Some(receiver) = record.receiver {
                engine.receiver_log.insert(record.id, receiver);
            }
            match record.status {
                ModuleStatus::Available => engine.push_available(record.id),
                ModuleStatus::Unreachable => engine.unreachable.push(record.id),
                ModuleStatus::Saturated => {}
            }
        }

        for record in records {
            let linked = record
                .ports
                .iter()
                .filter_map(|p| p.neighbour_object)
                .chain(record.occluded_neighbours.iter().map(|(n, _)| *n));
            for other in linked {
                if !engine.modules.contains_key(&other) {
                    return Err(Error::InvalidRecord(format!(
                        "module {} links to missing module {other}",
                        record.id
                    )));
                }
            }
        }

        if let Some(&max) = engine.modules.keys().next_back() {
            if snapshot.next_id <= max {
                return Err(Error::InvalidRecord(format!(
                    "next identity {} is not above stored identity {max}",
                    snapshot.next_id
                )));
            }
        }
        engine.next_id = snapshot.next_id;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::assembly::{Module, Port};
    use crate::geometry::CollisionMesh;

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

    fn settings() -> (Catalog, HeuristicsSettings) {
        (
            Catalog::new(vec![bar()]).unwrap(),
            HeuristicsSettings::new("A|0=90<A|1"),
        )
    }

    fn resume(snapshot: &AssemblageSnapshot) -> Result<Assemblage> {
        let (catalog, heuristics) = settings();
        Assemblage::from_snapshot(
            catalog,
            heuristics,
            ExogenousSettings::new(),
            EngineConfig::default(),
            snapshot,
        )
    }

    fn grown() -> Assemblage {
        let (catalog, heuristics) = settings();
        let start = catalog.instantiate("A", &Frame::WORLD).unwrap();
        let mut e = Assemblage::new(
            catalog,
            heuristics,
            ExogenousSettings::new(),
            EngineConfig::default(),
            vec![start],
        )
        .unwrap();
        e.grow(3);
        e
    }

    #[test]
    fn records_resume_growth() {
        let original = grown();
        let snapshot = original.snapshot();
        let mut resumed = resume(&snapshot).unwrap();

        assert_eq!(resumed.snapshot(), snapshot);
        assert_eq!(resumed.next_id(), original.next_id());
        assert_eq!(resumed.rule_log(), original.rule_log());
        assert!(resumed.check_invariants().is_empty());
        for (id, m) in original.modules() {
            assert!(resumed
                .module(*id)
                .unwrap()
                .centroid()
                .abs_diff_eq(m.centroid(), 1e-4));
        }

        let p = resumed.update().unwrap();
        assert_eq!(p.id, original.next_id());
    }

    #[test]
    fn removed_identities_stay_retired_after_resume() {
        let mut original = grown();
        let assigned: Vec<ModuleId> = original.modules().keys().copied().collect();
        assert_eq!(assigned, vec![0, 1, 2, 3]);
        original.remove(3).unwrap();

        let mut resumed = resume(&original.snapshot()).unwrap();
        assert_eq!(resumed.next_id(), 4);
        let p = resumed.update().unwrap();
        assert!(assigned.iter().all(|&id| p.id > id), "identity {} reused", p.id);
    }

    #[test]
    fn resume_after_removing_a_receiver() {
        let mut original = grown();
        original.remove(1).unwrap();
        // module 2 was attached to 1; the log still remembers it
        assert_eq!(original.receiver_log().get(&2), Some(&1));

        let snapshot = original.snapshot();
        let mut resumed = resume(&snapshot).unwrap();
        assert_eq!(resumed.receiver_log(), original.receiver_log());
        assert!(resumed.check_invariants().is_empty());
        assert!(resumed.update().unwrap().id >= 4);
    }

    #[test]
    fn broken_records_are_rejected() {
        let mut snapshot = grown().snapshot();
        snapshot.modules[0].ports.pop();
        assert!(matches!(resume(&snapshot), Err(Error::InvalidRecord(_))));

        let mut snapshot = grown().snapshot();
        snapshot.modules.remove(1);
        assert!(resume(&snapshot).is_err());

        let mut snapshot = grown().snapshot();
        snapshot.next_id = 2;
        assert!(matches!(resume(&snapshot), Err(Error::InvalidRecord(_))));
    }
}

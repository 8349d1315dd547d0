//! The growth engine.
//!
//! [`Assemblage`] owns the placed modules, the spatial index, the rule table and the
//! available/unreachable bookkeeping. Each call to [`Assemblage::update`] performs one
//! attach-or-fail iteration:
//!
//! 1. pick a receiver among the available modules,
//! 2. orient every applicable rule's sender onto the receiver and filter the candidates,
//! 3. pick a winner, connect it and resolve obstructions around it.
//!
//! Receivers without surviving candidates move to the unreachable list until the next
//! settings change triggers a rescan. The engine is single-threaded; per-item value passes
//! and rule filtering fan out to rayon above the thresholds in [`EngineConfig`].
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assembly::{Catalog, Module, ModuleId, Occupancy};
use crate::error::{Error, Result};
use crate::field::FieldSampler;
use crate::geometry::{CollisionOracle, MeshCollider};
use crate::settings::{
    EnvironmentMode, ExogenousSettings, HeuristicsMode, HeuristicsSettings, ReceiverSelection,
    RuleTable,
};
use crate::spatial::{GridIndex, SpatialIndex};

mod candidates;
pub mod config;
pub mod events;
mod obstruction;
mod placement;
pub mod record;
mod removal;
mod rescan;
pub mod selection;
mod values;

pub use config::EngineConfig;
pub use events::{EventSink, FnSink, GrowthEvent, GrowthEventKind, MultiSink, VecSink};
pub use obstruction::ObstructionReport;
pub use record::{AssemblageSnapshot, ModuleRecord, ModuleStatus, PortRecord};

/// Outcome of a successful growth iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Identity assigned to the new module.
    pub id: ModuleId,
    /// Name of the placed module type.
    pub name: String,
    /// Identity of the module it was attached to.
    pub receiver: ModuleId,
    pub receiver_port: usize,
    pub sender_port: usize,
    /// Canonical text of the rule that produced the placement.
    pub rule: String,
    /// Whether the obstruction pass changed any port occupancy.
    pub obstructed: bool,
}

/// A growing assemblage of modules.
pub struct Assemblage {
    pub(crate) config: EngineConfig,
    pub(crate) catalog: Catalog,
    pub(crate) heuristics: HeuristicsSettings,
    pub(crate) exogenous: ExogenousSettings,
    pub(crate) rules: RuleTable,
    pub(crate) modules: BTreeMap<ModuleId, Module>,
    pub(crate) next_id: ModuleId,
    pub(crate) index: Box<dyn SpatialIndex>,
    pub(crate) collider: Arc<dyn CollisionOracle>,
    pub(crate) available: Vec<ModuleId>,
    pub(crate) available_values: Vec<f32>,
    pub(crate) unreachable: Vec<ModuleId>,
    pub(crate) rule_log: BTreeMap<ModuleId, String>,
    pub(crate) receiver_log: BTreeMap<ModuleId, ModuleId>,
    pub(crate) rng: StdRng,
}

impl fmt::Debug for Assemblage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assemblage")
            .field("config", &self.config)
            .field("catalog", &self.catalog.len())
            .field("heuristics", &self.heuristics)
            .field("exogenous", &self.exogenous)
            .field("modules", &self.modules.len())
            .field("next_id", &self.next_id)
            .field("available", &self.available.len())
            .field("unreachable", &self.unreachable.len())
            .finish()
    }
}

impl Assemblage {
    /// Creates an engine seeded with `start` modules.
    ///
    /// Start modules must come from `catalog` (see [`Catalog::instantiate`]). They receive
    /// identities `0..start.len()` and all enter the available list; the first update that
    /// selects one without a viable candidate moves it to unreachable.
    pub fn new(
        catalog: Catalog,
        heuristics: HeuristicsSettings,
        exogenous: ExogenousSettings,
        config: EngineConfig,
        start: Vec<Module>,
    ) -> Result<Self> {
        if start.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one start module is required".into(),
            ));
        }
        let mut engine = Self::empty(catalog, heuristics, exogenous, config)?;
        for mut module in start {
            engine.check_prototype(&module)?;
            let id = engine.next_id;
            engine.next_id += 1;
            module.id = Some(id);
            engine.index.insert(module.centroid(), id);
            engine.available.push(id);
            engine.available_values.push(0.0);
            engine.modules.insert(id, module);
        }
        engine.recompute_values();
        info!(
            "Assemblage initialised with {} start module(s), {} module types and {} heuristic set(s).",
            engine.modules.len(),
            engine.catalog.len(),
            engine.rules.set_count()
        );
        Ok(engine)
    }

    /// Engine with settings and no modules; shared by [`Assemblage::new`] and record loading.
    pub(crate) fn empty(
        catalog: Catalog,
        heuristics: HeuristicsSettings,
        exogenous: ExogenousSettings,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let rules = RuleTable::build(&heuristics, &catalog)?;
        let engine = Self {
            index: Box::new(GridIndex::new(config.collision_radius)),
            collider: Arc::new(MeshCollider::default()),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            catalog,
            heuristics,
            exogenous,
            rules,
            modules: BTreeMap::new(),
            next_id: 0,
            available: Vec::new(),
            available_values: Vec::new(),
            unreachable: Vec::new(),
            rule_log: BTreeMap::new(),
            receiver_log: BTreeMap::new(),
        };
        engine.warn_on_settings(&mut ());
        Ok(engine)
    }

    /// Replaces the collision oracle.
    pub fn with_collider(mut self, collider: Arc<dyn CollisionOracle>) -> Self {
        self.collider = collider;
        self
    }

    /// Replaces the spatial index and re-inserts every placed module.
    pub fn with_spatial_index(mut self, mut index: Box<dyn SpatialIndex>) -> Self {
        index.clear();
        for (id, module) in &self.modules {
            index.insert(module.centroid(), *id);
        }
        self.index = index;
        self
    }

    fn check_prototype(&self, module: &Module) -> Result<()> {
        match self.catalog.get(module.type_id) {
            Some(proto) if proto.name == module.name && proto.ports.len() == module.ports.len() => {
                Ok(())
            }
            _ => Err(Error::InvalidConfig(format!(
                "module '{}' does not match catalog type {}",
                module.name, module.type_id
            ))),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn heuristics(&self) -> &HeuristicsSettings {
        &self.heuristics
    }

    pub fn exogenous(&self) -> &ExogenousSettings {
        &self.exogenous
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Placed modules keyed by identity.
    pub fn modules(&self) -> &BTreeMap<ModuleId, Module> {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Identity the next placement will receive.
    pub fn next_id(&self) -> ModuleId {
        self.next_id
    }

    pub fn available(&self) -> &[ModuleId] {
        &self.available
    }

    /// Cached receiver values, parallel to [`Assemblage::available`].
    pub fn available_values(&self) -> &[f32] {
        &self.available_values
    }

    pub fn unreachable(&self) -> &[ModuleId] {
        &self.unreachable
    }

    /// Canonical rule text used to place each module.
    pub fn rule_log(&self) -> &BTreeMap<ModuleId, String> {
        &self.rule_log
    }

    /// Receiver each module was attached to.
    pub fn receiver_log(&self) -> &BTreeMap<ModuleId, ModuleId> {
        &self.receiver_log
    }

    /// Placed modules whose centroid lies inside the sandbox, if one is set.
    pub fn sandbox_modules(&self) -> Vec<ModuleId> {
        let Some(sandbox) = self.exogenous.sandbox else {
            return Vec::new();
        };
        self.modules
            .iter()
            .filter(|(_, m)| sandbox.contains_point(m.centroid()))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Runs one growth iteration. Returns `None` when no receiver could be extended.
    pub fn update(&mut self) -> Option<Placement> {
        self.update_with_events(&mut ())
    }

    /// Runs up to `iterations` growth iterations, stopping early when growth is exhausted.
    pub fn grow(&mut self, iterations: usize) -> Vec<Placement> {
        self.grow_with_events(iterations, &mut ())
    }

    pub fn grow_with_events(
        &mut self,
        iterations: usize,
        sink: &mut dyn EventSink,
    ) -> Vec<Placement> {
        let mut placements = Vec::new();
        for _ in 0..iterations {
            match self.update_with_events(sink) {
                Some(p) => placements.push(p),
                None => break,
            }
        }
        placements
    }

    /// Replaces the heuristic settings, rebuilding the rule table and rescanning.
    ///
    /// Fails without touching the engine when a grammar does not resolve against the catalog.
    pub fn set_heuristics(&mut self, heuristics: HeuristicsSettings) -> Result<()> {
        self.set_heuristics_with_events(heuristics, &mut ())
    }

    pub fn set_heuristics_with_events(
        &mut self,
        heuristics: HeuristicsSettings,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        self.rules = RuleTable::build(&heuristics, &self.catalog)?;
        self.heuristics = heuristics;
        self.reset_with_events(sink);
        Ok(())
    }

    /// Replaces the exogenous settings and rescans.
    pub fn set_exogenous(&mut self, exogenous: ExogenousSettings) {
        self.set_exogenous_with_events(exogenous, &mut ())
    }

    pub fn set_exogenous_with_events(
        &mut self,
        exogenous: ExogenousSettings,
        sink: &mut dyn EventSink,
    ) {
        self.exogenous = exogenous;
        self.reset_with_events(sink);
    }

    /// Replaces only the driving field and rescans.
    pub fn set_field(&mut self, field: Option<Arc<dyn FieldSampler>>) {
        self.exogenous.field = field;
        self.reset_with_events(&mut ());
    }

    fn reset_with_events(&mut self, sink: &mut dyn EventSink) {
        self.warn_on_settings(sink);
        self.recompute_values();
        self.rescan_with_events(sink);
    }

    fn warn_on_settings(&self, sink: &mut dyn EventSink) {
        let mut warnings = Vec::new();
        if self.exogenous.field.is_none() {
            if self.heuristics.receiver_selection.requires_field() {
                warnings.push((
                    "receiver_selection",
                    "Receiver strategy needs a field but none is set; values default to 0",
                ));
            }
            if self.heuristics.sender_selection.requires_field() {
                warnings.push((
                    "sender_selection",
                    "Sender strategy needs a field but none is set; values default to 0",
                ));
            }
            if self.heuristics.mode == HeuristicsMode::Field {
                warnings.push((
                    "heuristics_mode",
                    "Field-driven heuristics without a field; using the current set",
                ));
            }
        }
        if self.exogenous.mode == EnvironmentMode::Custom && self.exogenous.custom.is_none() {
            warnings.push((
                "environment_mode",
                "Custom environment mode without a custom check; environment is ignored",
            ));
        }
        for (context, message) in warnings {
            warn!("{message}.");
            if sink.wants(GrowthEventKind::Warning) {
                sink.send(GrowthEvent::Warning {
                    context: context.into(),
                    message: message.into(),
                });
            }
        }
    }

    /// Recomputes every cached receiver value and, in field-driven mode, integer weight.
    pub(crate) fn recompute_values(&mut self) {
        let strategy = self.heuristics.receiver_selection;
        let parallel = self.modules.len() > self.config.receiver_parallel_threshold;

        if strategy == ReceiverSelection::Density {
            let radius = self.config.collision_radius;
            let index = self.index.as_ref();
            let sums = if parallel {
                let entries: Vec<(&ModuleId, &Module)> = self.modules.iter().collect();
                entries
                    .par_chunks(64)
                    .map(|chunk| {
                        values::density_contributions(chunk.iter().copied(), index, radius)
                    })
                    .reduce(Default::default, values::merge_density)
            } else {
                values::density_contributions(self.modules.iter(), index, radius)
            };
            for (id, module) in self.modules.iter_mut() {
                module.receiver_value = sums.get(id).copied().unwrap_or(0.0);
            }
        } else {
            let exogenous = &self.exogenous;
            if parallel {
                self.modules.par_iter_mut().for_each(|(_, m)| {
                    m.receiver_value = values::receiver_value(strategy, m, exogenous);
                });
            } else {
                for m in self.modules.values_mut() {
                    m.receiver_value = values::receiver_value(strategy, m, exogenous);
                }
            }
        }

        if self.heuristics.mode == HeuristicsMode::Field {
            if let Some(field) = self.exogenous.field.as_deref() {
                for m in self.modules.values_mut() {
                    m.integer_weight = values::field_rule_set(field, m.centroid());
                }
            }
        }

        for (slot, id) in self.available_values.iter_mut().zip(&self.available) {
            if let Some(m) = self.modules.get(id) {
                *slot = m.receiver_value;
            }
        }
        debug!("Receiver values recomputed for {} modules.", self.modules.len());
    }

    /// Heuristic set used when `module` is a receiver. `None` when the field-driven index is
    /// out of range.
    pub(crate) fn rule_set_for(&self, module: &Module) -> Option<usize> {
        match self.heuristics.mode {
            HeuristicsMode::Manual => Some(self.heuristics.current),
            HeuristicsMode::Field if self.exogenous.field.is_none() => {
                Some(self.heuristics.current)
            }
            HeuristicsMode::Field => usize::try_from(module.integer_weight)
                .ok()
                .filter(|set| *set < self.rules.set_count()),
        }
    }

    pub(crate) fn available_slot(&self, id: ModuleId) -> Option<usize> {
        self.available.iter().position(|a| *a == id)
    }

    pub(crate) fn remove_available(&mut self, id: ModuleId) -> bool {
        match self.available_slot(id) {
            Some(slot) => {
                self.available.remove(slot);
                self.available_values.remove(slot);
                true
            }
            None => false,
        }
    }

    pub(crate) fn push_available(&mut self, id: ModuleId) {
        let value = self.modules.get(&id).map_or(0.0, |m| m.receiver_value);
        self.available.push(id);
        self.available_values.push(value);
    }

    /// Adds `delta` to a module's cached receiver value and its available slot.
    pub(crate) fn bump_receiver_value(&mut self, id: ModuleId, delta: f32) {
        let Some(module) = self.modules.get_mut(&id) else {
            return;
        };
        module.receiver_value += delta;
        let value = module.receiver_value;
        if let Some(slot) = self.available_slot(id) {
            self.available_values[slot] = value;
        }
    }

    /// Describes every broken bookkeeping invariant; empty when the engine is consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (&id, module) in &self.modules {
            if module.id != Some(id) {
                problems.push(format!("module keyed {id} carries identity {:?}", module.id));
            }
            for (p, port) in module.ports.iter().enumerate() {
                match port.occupancy {
                    Occupancy::Available => {
                        if port.neighbour_object.is_some() || port.neighbour_port.is_some() {
                            problems.push(format!("free port {id}:{p} keeps a neighbour link"));
                        }
                    }
                    Occupancy::Connected | Occupancy::Contact => {
                        let mirrored = port
                            .neighbour_object
                            .zip(port.neighbour_port)
                            .and_then(|(n, q)| self.modules.get(&n)?.ports.get(q))
                            .is_some_and(|q| {
                                q.occupancy == port.occupancy
                                    && q.neighbour_object == Some(id)
                                    && q.neighbour_port == Some(p)
                            });
                        if !mirrored {
                            problems.push(format!(
                                "port {id}:{p} ({:?}) is not mirrored by {:?}:{:?}",
                                port.occupancy, port.neighbour_object, port.neighbour_port
                            ));
                        }
                    }
                    Occupancy::Occluded => {
                        let recorded = port
                            .neighbour_object
                            .and_then(|n| self.modules.get(&n))
                            .is_some_and(|n| n.occluded_neighbours.contains(&(id, p)));
                        if !recorded {
                            problems.push(format!(
                                "occluded port {id}:{p} is not recorded by occluder {:?}",
                                port.neighbour_object
                            ));
                        }
                    }
                }
            }
            for &(n, q) in &module.occluded_neighbours {
                let occluded = self
                    .modules
                    .get(&n)
                    .and_then(|m| m.ports.get(q))
                    .is_some_and(|port| {
                        port.occupancy == Occupancy::Occluded && port.neighbour_object == Some(id)
                    });
                if !occluded {
                    problems.push(format!("module {id} lists {n}:{q} as occluded but it is not"));
                }
            }
        }

        if self.available.len() != self.available_values.len() {
            problems.push("available list and cached values differ in length".into());
        }
        for id in self.available.iter().chain(&self.unreachable) {
            if !self.modules.contains_key(id) {
                problems.push(format!("listed identity {id} is not placed"));
            }
        }
        let mut listed: Vec<ModuleId> = self
            .available
            .iter()
            .chain(&self.unreachable)
            .copied()
            .collect();
        listed.sort_unstable();
        if listed.windows(2).any(|w| w[0] == w[1]) {
            problems.push("an identity is listed twice across available and unreachable".into());
        }
        if self.index.len() != self.modules.len() {
            problems.push(format!(
                "spatial index holds {} entries for {} modules",
                self.index.len(),
                self.modules.len()
            ));
        }
        if let Some(&max) = self.modules.keys().next_back() {
            if max >= self.next_id {
                problems.push(format!("identity {max} is not below next_id {}", self.next_id));
            }
        }
        problems
    }
}

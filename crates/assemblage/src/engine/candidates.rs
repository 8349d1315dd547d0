//! Candidate retrieval: orienting rule senders onto a receiver and filtering them.
use std::fmt;

use glam::Vec3;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::assembly::{Module, ModuleId, Rule};
use crate::engine::Assemblage;

/// Surviving candidates for one receiver, with their rules and neighbourhoods in lock-step.
#[derive(Debug, Default)]
pub(crate) struct CandidateSet {
    pub modules: Vec<Module>,
    pub rules: Vec<Rule>,
    pub neighbours: Vec<Vec<ModuleId>>,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Takes candidate `i` out of the set.
    pub fn take(mut self, i: usize) -> Option<(Module, Rule, Vec<ModuleId>)> {
        if i >= self.len() {
            return None;
        }
        Some((
            self.modules.swap_remove(i),
            self.rules.swap_remove(i),
            self.neighbours.swap_remove(i),
        ))
    }
}

/// Why a candidate was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Rejection {
    PortTaken,
    MissingGeometry,
    DegenerateTransform,
    WorldUp,
    OutsideSandbox,
    Environment,
    Collision(ModuleId),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::PortTaken => write!(f, "receiver port is not free"),
            Rejection::MissingGeometry => write!(f, "rule references missing ports or rotations"),
            Rejection::DegenerateTransform => write!(f, "placement transform is not finite"),
            Rejection::WorldUp => write!(f, "world-up lock violated"),
            Rejection::OutsideSandbox => write!(f, "centroid outside the sandbox"),
            Rejection::Environment => write!(f, "environment clash"),
            Rejection::Collision(id) => write!(f, "collides with module {id}"),
        }
    }
}

impl Assemblage {
    /// Orients the sender of `rule` onto `receiver` and runs every placement filter.
    ///
    /// On success returns the candidate and the identities within the collision radius of
    /// its centroid.
    pub(crate) fn try_candidate(
        &self,
        receiver: &Module,
        rule: &Rule,
    ) -> Result<(Module, Vec<ModuleId>), Rejection> {
        let port = receiver
            .ports
            .get(rule.receiver_port)
            .ok_or(Rejection::MissingGeometry)?;
        if !port.is_free() {
            return Err(Rejection::PortTaken);
        }
        let target = port
            .receivers
            .get(rule.receiver_rotation)
            .ok_or(Rejection::MissingGeometry)?;
        let proto = self
            .catalog
            .get(rule.sender_type)
            .ok_or(Rejection::MissingGeometry)?;
        let sender = proto
            .ports
            .get(rule.sender_port)
            .ok_or(Rejection::MissingGeometry)?;
        let xf = sender
            .sender
            .map_onto(target)
            .ok_or(Rejection::DegenerateTransform)?;
        let candidate = proto.transformed(&xf);
        if !candidate.reference_frame.is_finite() {
            return Err(Rejection::DegenerateTransform);
        }
        let neighbours = self.admit(&candidate)?;
        Ok((candidate, neighbours))
    }

    /// Orientation, sandbox, environment and collision filters for an oriented module.
    fn admit(&self, candidate: &Module) -> Result<Vec<ModuleId>, Rejection> {
        if self.exogenous.world_z_lock
            && candidate.world_z_lock
            && candidate.reference_frame.z_axis().dot(Vec3::Z) < 1.0 - self.config.world_up_tolerance
        {
            return Err(Rejection::WorldUp);
        }
        let centroid = candidate.centroid();
        if let Some(sandbox) = &self.exogenous.sandbox {
            if !sandbox.contains_point(centroid) {
                return Err(Rejection::OutsideSandbox);
            }
        }
        if self
            .exogenous
            .environment_clash(candidate, self.collider.as_ref())
        {
            return Err(Rejection::Environment);
        }

        let neighbours = self
            .index
            .query_within_radius(centroid, self.config.collision_radius);
        for id in &neighbours {
            let Some(other) = self.modules.get(id) else {
                continue;
            };
            let clash = self
                .collider
                .intersects(&candidate.offset_mesh, &other.collision_mesh)
                || self
                    .collider
                    .point_inside(&other.collision_mesh, centroid, 0.0)
                || self
                    .collider
                    .point_inside(&candidate.collision_mesh, other.centroid(), 0.0);
            if clash {
                return Err(Rejection::Collision(*id));
            }
        }
        Ok(neighbours)
    }

    /// Every surviving candidate for `receiver_id` under its active heuristic set.
    pub(crate) fn retrieve_candidates(&self, receiver_id: ModuleId) -> CandidateSet {
        let Some(receiver) = self.modules.get(&receiver_id) else {
            return CandidateSet::default();
        };
        let Some(set) = self.rule_set_for(receiver) else {
            warn!(
                "Module {} samples heuristic set {} which does not exist; no rules apply.",
                receiver_id, receiver.integer_weight
            );
            return CandidateSet::default();
        };
        let rules: Vec<&Rule> = self
            .rules
            .rules_for(set, receiver.type_id)
            .iter()
            .filter(|r| {
                receiver
                    .ports
                    .get(r.receiver_port)
                    .is_some_and(|p| p.is_free())
            })
            .collect();
        if rules.is_empty() {
            debug!(
                "Receiver {} ('{}') has no applicable rules in set {}.",
                receiver_id, receiver.name, set
            );
            return CandidateSet::default();
        }

        let attempt = |rule: &&Rule| match self.try_candidate(receiver, rule) {
            Ok(found) => Some(found),
            Err(reason) => {
                debug!("Rule '{}' on receiver {}: {}.", rule, receiver_id, reason);
                None
            }
        };
        let outcomes: Vec<Option<(Module, Vec<ModuleId>)>> =
            if rules.len() > self.config.rescan_parallel_threshold {
                rules.par_iter().map(attempt).collect()
            } else {
                rules.iter().map(attempt).collect()
            };

        let mut set = CandidateSet::default();
        for (rule, outcome) in rules.into_iter().zip(outcomes) {
            if let Some((module, neighbours)) = outcome {
                set.modules.push(module);
                set.rules.push(rule.clone());
                set.neighbours.push(neighbours);
            }
        }
        set
    }

    /// Whether `module` has at least one free port with a rule whose candidate survives.
    pub(crate) fn is_reachable(&self, module: &Module) -> bool {
        let Some(set) = self.rule_set_for(module) else {
            return false;
        };
        self.rules
            .rules_for(set, module.type_id)
            .iter()
            .any(|rule| self.try_candidate(module, rule).is_ok())
    }
}

//! Engine tuning: neighbourhood radius, obstruction probes and parallel thresholds.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for an [`crate::engine::Assemblage`].
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Radius of every neighbourhood query (collision, obstruction, density).
    pub collision_radius: f32,
    /// Distance under which two free ports are considered in contact.
    pub contact_tolerance: f32,
    /// Distance from a port origin, along its normal, where the occlusion probe starts.
    pub probe_offset: f32,
    /// Length of the occlusion probe.
    pub probe_length: f32,
    /// Allowed deviation of `z_axis · Z` from 1 for world-up-locked modules.
    pub world_up_tolerance: f32,
    /// Receiver-value recomputation runs in parallel above this many modules.
    pub receiver_parallel_threshold: usize,
    /// Sender values run in parallel above this many candidates.
    pub sender_parallel_threshold: usize,
    /// Rule filtering during candidate retrieval and rescans runs in parallel above this many items.
    pub rescan_parallel_threshold: usize,
    /// Seed for the engine's random source.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collision_radius: 2.0,
            contact_tolerance: 1e-3,
            probe_offset: 0.01,
            probe_length: 0.25,
            world_up_tolerance: 1e-3,
            receiver_parallel_threshold: 1000,
            sender_parallel_threshold: 100,
            rescan_parallel_threshold: 100,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Creates a default configuration with the given neighbourhood radius.
    pub fn new(collision_radius: f32) -> Self {
        Self {
            collision_radius,
            ..Default::default()
        }
    }

    pub fn with_collision_radius(mut self, collision_radius: f32) -> Self {
        self.collision_radius = collision_radius;
        self
    }

    pub fn with_contact_tolerance(mut self, contact_tolerance: f32) -> Self {
        self.contact_tolerance = contact_tolerance;
        self
    }

    /// Sets where the occlusion probe starts and how far it reaches.
    pub fn with_probe(mut self, offset: f32, length: f32) -> Self {
        self.probe_offset = offset;
        self.probe_length = length;
        self
    }

    pub fn with_world_up_tolerance(mut self, tolerance: f32) -> Self {
        self.world_up_tolerance = tolerance;
        self
    }

    /// Sets the receiver, sender and rescan parallel thresholds.
    pub fn with_parallel_thresholds(mut self, receiver: usize, sender: usize, rescan: usize) -> Self {
        self.receiver_parallel_threshold = receiver;
        self.sender_parallel_threshold = sender;
        self.rescan_parallel_threshold = rescan;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !(self.collision_radius.is_finite() && self.collision_radius > 0.0) {
            return Err(Error::InvalidConfig("collision_radius must be > 0".into()));
        }
        if !(self.contact_tolerance.is_finite() && self.contact_tolerance >= 0.0) {
            return Err(Error::InvalidConfig("contact_tolerance must be >= 0".into()));
        }
        if !(self.probe_offset.is_finite() && self.probe_offset >= 0.0) {
            return Err(Error::InvalidConfig("probe_offset must be >= 0".into()));
        }
        if !(self.probe_length.is_finite() && self.probe_length > 0.0) {
            return Err(Error::InvalidConfig("probe_length must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.world_up_tolerance) {
            return Err(Error::InvalidConfig(
                "world_up_tolerance must be in [0, 2]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_radius_and_probe() {
        assert!(EngineConfig::new(0.0).validate().is_err());
        assert!(EngineConfig::default()
            .with_probe(0.01, 0.0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_world_up_tolerance(-1.0)
            .validate()
            .is_err());
    }
}

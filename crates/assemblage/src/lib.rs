#![forbid(unsafe_code)]
//! assemblage: rule-based growth of discrete assemblages from typed modules.
//!
//! Modules:
//! - assembly: modules, ports, the catalog and the `Type|port=rotation<Type|port%weight` rule grammar
//! - geometry: frames, bounding boxes, collision meshes and the pluggable collision oracle
//! - spatial: radius queries over placed module centroids
//! - field: point-sampled scalar/vector/integer fields driving heuristics
//! - settings: heuristic rule sets, selection strategies and exogenous constraints
//! - engine: the growth loop, obstruction handling, removal, rescans and persisted records
//!
//! For examples and docs, see README and docs.rs.
pub mod assembly;
pub mod engine;
pub mod error;
pub mod field;
pub mod geometry;
pub mod settings;
pub mod spatial;

/// Convenient re-exports for common types. Import with `use assemblage::prelude::*;`.
pub mod prelude {
    pub use crate::assembly::{
        generate_rules, parse_rules, rules_to_grammar, Catalog, Module, ModuleId, ModuleTypeId,
        Occupancy, Port, Rule, RuleText, Support,
    };
    pub use crate::engine::selection::{
        select_index, select_last, select_max, select_min, select_random, select_wrc_index,
    };
    pub use crate::engine::{
        Assemblage, AssemblageSnapshot, EngineConfig, EventSink, FnSink, GrowthEvent,
        GrowthEventKind, ModuleRecord, ModuleStatus, MultiSink, ObstructionReport, Placement,
        PortRecord, VecSink,
    };
    pub use crate::error::{Error, Result};
    pub use crate::field::{FieldSampler, PointField};
    pub use crate::geometry::{Aabb, CollisionMesh, CollisionOracle, Frame, MeshCollider, Ray};
    pub use crate::settings::{
        EnvironmentCheck, EnvironmentGeometry, EnvironmentKind, EnvironmentMode,
        ExogenousSettings, HeuristicsMode, HeuristicsSettings, ReceiverSelection, RuleTable,
        SelectionRule, SenderSelection,
    };
    pub use crate::spatial::{GridIndex, SpatialIndex};
}

//! Data model: modules, their ports, the catalog and production rules.
pub mod catalog;
pub mod module;
pub mod port;
pub mod rule;

pub use catalog::Catalog;
pub use module::{Module, Support, DEFAULT_OFFSET_DISTANCE};
pub use port::{Occupancy, Port};
pub use rule::{generate_rules, parse_rules, rules_to_grammar, Rule, RuleText};

/// Permanent identity of a placed module. Assigned once, never reused.
pub type ModuleId = u32;

/// Index of a prototype in the [`Catalog`].
pub type ModuleTypeId = usize;

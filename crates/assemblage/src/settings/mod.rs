//! Per-iteration configuration read by the growth engine.
//!
//! - [heuristics]: rule grammars, the active heuristic set and strategy selectors.
//! - [exogenous]: environment geometry, the driving field and global constraints.
//! - [strategy]: receiver and sender selection strategies.
pub mod exogenous;
pub mod heuristics;
pub mod strategy;

pub use exogenous::{
    EnvironmentCheck, EnvironmentGeometry, EnvironmentKind, EnvironmentMode, ExogenousSettings,
};
pub use heuristics::{HeuristicsMode, HeuristicsSettings, RuleTable};
pub use strategy::{ReceiverSelection, SelectionRule, SenderSelection};

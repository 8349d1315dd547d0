//! Heuristic settings: rule grammars, the active set and selection strategies.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly::{parse_rules, Catalog, ModuleTypeId, Rule};
use crate::error::{Error, Result};
use crate::settings::strategy::{ReceiverSelection, SenderSelection};

/// Where the active rule set comes from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HeuristicsMode {
    /// Always use [`HeuristicsSettings::current`].
    #[default]
    Manual,
    /// Use the integer sampled from the field at each receiver.
    Field,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeuristicsSettings {
    /// One rule grammar per heuristic set.
    pub rule_sets: Vec<String>,
    pub current: usize,
    pub mode: HeuristicsMode,
    pub receiver_selection: ReceiverSelection,
    pub sender_selection: SenderSelection,
}

impl HeuristicsSettings {
    /// Single-set settings with random selection.
    pub fn new(grammar: impl Into<String>) -> Self {
        Self {
            rule_sets: vec![grammar.into()],
            ..Default::default()
        }
    }

    pub fn with_rule_set(mut self, grammar: impl Into<String>) -> Self {
        self.rule_sets.push(grammar.into());
        self
    }

    pub fn with_current(mut self, current: usize) -> Self {
        self.current = current;
        self
    }

    pub fn with_mode(mut self, mode: HeuristicsMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_receiver_selection(mut self, selection: ReceiverSelection) -> Self {
        self.receiver_selection = selection;
        self
    }

    pub fn with_sender_selection(mut self, selection: SenderSelection) -> Self {
        self.sender_selection = selection;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rule_sets.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one heuristic rule set is required".into(),
            ));
        }
        if self.current >= self.rule_sets.len() {
            return Err(Error::InvalidConfig(format!(
                "active heuristic set {} out of range ({} sets)",
                self.current,
                self.rule_sets.len()
            )));
        }
        Ok(())
    }
}

/// Rules grouped by heuristic set and receiver type.
#[derive(Clone, Debug, Default)]
pub struct RuleTable {
    sets: Vec<Vec<Vec<Rule>>>,
}

impl RuleTable {
    /// Parses every grammar of `settings` against `catalog`.
    pub fn build(settings: &HeuristicsSettings, catalog: &Catalog) -> Result<Self> {
        settings.validate()?;
        let mut sets = Vec::with_capacity(settings.rule_sets.len());
        for grammar in &settings.rule_sets {
            let mut by_type: Vec<Vec<Rule>> = vec![Vec::new(); catalog.len()];
            for rule in parse_rules(grammar, catalog)? {
                by_type[rule.receiver_type].push(rule);
            }
            sets.push(by_type);
        }
        Ok(Self { sets })
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Rules extending `receiver_type` in heuristic set `set`; empty when there are none.
    pub fn rules_for(&self, set: usize, receiver_type: ModuleTypeId) -> &[Rule] {
        self.sets
            .get(set)
            .and_then(|s| s.get(receiver_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rule_count(&self, set: usize) -> usize {
        self.sets
            .get(set)
            .map(|s| s.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

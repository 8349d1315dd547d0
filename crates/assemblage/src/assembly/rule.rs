//! Production rules and their textual grammar.
//!
//! A rule reads `receiverName|receiverPort=rotationDegrees<senderName|senderPort%weight`:
//! the sender module's port is attached onto the receiver module's port using the receiver
//! port's rotation variant. `%weight` may be omitted and defaults to 1.
//!
//! Parsing happens in two steps: [`RuleText`] checks the syntax, [`RuleText::resolve`] binds
//! names, ports and rotations against a [`Catalog`]. Both fail with the offending rule text.
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembly::catalog::Catalog;
use crate::assembly::ModuleTypeId;
use crate::error::{Error, Result};

pub const DEFAULT_RULE_WEIGHT: i32 = 1;

/// Syntactically valid rule, not yet bound to a catalog.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RuleText {
    pub receiver_name: String,
    pub receiver_port: usize,
    pub rotation: f32,
    pub sender_name: String,
    pub sender_port: usize,
    pub weight: i32,
}

impl FromStr for RuleText {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |reason: &str| Error::InvalidRule {
            rule: text.to_string(),
            reason: reason.to_string(),
        };

        let (receiver, sender) = text
            .split_once('<')
            .ok_or_else(|| invalid("missing '<' between receiver and sender"))?;
        let (receiver_name, receiver_rest) = receiver
            .split_once('|')
            .ok_or_else(|| invalid("receiver must read 'name|port=rotation'"))?;
        let (receiver_port, rotation) = receiver_rest
            .split_once('=')
            .ok_or_else(|| invalid("receiver must read 'name|port=rotation'"))?;
        let (sender_part, weight) = match sender.split_once('%') {
            Some((part, weight)) => (part, Some(weight)),
            None => (sender, None),
        };
        let (sender_name, sender_port) = sender_part
            .split_once('|')
            .ok_or_else(|| invalid("sender must read 'name|port'"))?;

        let receiver_name = receiver_name.trim();
        let sender_name = sender_name.trim();
        if receiver_name.is_empty() || sender_name.is_empty() {
            return Err(invalid("module names must not be empty"));
        }

        let receiver_port = receiver_port
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid("receiver port is not a non-negative integer"))?;
        let rotation = rotation
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|r| r.is_finite())
            .ok_or_else(|| invalid("rotation is not a finite number"))?;
        let sender_port = sender_port
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid("sender port is not a non-negative integer"))?;
        let weight = match weight {
            Some(w) => w
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|w| *w >= 0)
                .ok_or_else(|| invalid("weight is not a non-negative integer"))?,
            None => DEFAULT_RULE_WEIGHT,
        };

        Ok(Self {
            receiver_name: receiver_name.to_string(),
            receiver_port,
            rotation,
            sender_name: sender_name.to_string(),
            sender_port,
            weight,
        })
    }
}

impl fmt::Display for RuleText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}={}<{}|{}%{}",
            self.receiver_name,
            self.receiver_port,
            self.rotation,
            self.sender_name,
            self.sender_port,
            self.weight
        )
    }
}

impl RuleText {
    /// Binds the rule to catalog type ids, checking ports and the rotation variant.
    pub fn resolve(&self, catalog: &Catalog) -> Result<Rule> {
        let rule = self.to_string();
        let receiver_type =
            catalog
                .type_of(&self.receiver_name)
                .ok_or_else(|| Error::UnknownModuleType {
                    name: self.receiver_name.clone(),
                    rule: rule.clone(),
                })?;
        let sender_type =
            catalog
                .type_of(&self.sender_name)
                .ok_or_else(|| Error::UnknownModuleType {
                    name: self.sender_name.clone(),
                    rule: rule.clone(),
                })?;

        let receiver_port = catalog
            .get(receiver_type)
            .and_then(|m| m.ports.get(self.receiver_port))
            .ok_or_else(|| Error::PortOutOfRange {
                rule: rule.clone(),
                module: self.receiver_name.clone(),
                port: self.receiver_port,
            })?;
        if catalog
            .get(sender_type)
            .and_then(|m| m.ports.get(self.sender_port))
            .is_none()
        {
            return Err(Error::PortOutOfRange {
                rule,
                module: self.sender_name.clone(),
                port: self.sender_port,
            });
        }

        let receiver_rotation =
            receiver_port
                .rotation_index(self.rotation)
                .ok_or_else(|| Error::UnknownRotation {
                    rule: rule.clone(),
                    rotation: self.rotation,
                })?;

        Ok(Rule {
            receiver_type,
            receiver_port: self.receiver_port,
            receiver_rotation,
            rotation: receiver_port.rotations[receiver_rotation],
            sender_type,
            sender_port: self.sender_port,
            weight: self.weight,
            receiver_name: self.receiver_name.clone(),
            sender_name: self.sender_name.clone(),
        })
    }
}

/// A resolved production: attach `sender_type`'s port `sender_port` onto
/// `receiver_type`'s port `receiver_port`, using rotation variant `receiver_rotation`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub receiver_type: ModuleTypeId,
    pub receiver_port: usize,
    pub receiver_rotation: usize,
    /// Canonical rotation in degrees, as stored on the receiver port.
    pub rotation: f32,
    pub sender_type: ModuleTypeId,
    pub sender_port: usize,
    pub weight: i32,
    pub receiver_name: String,
    pub sender_name: String,
}

impl Rule {
    /// Parses and resolves a single rule.
    pub fn parse(text: &str, catalog: &Catalog) -> Result<Self> {
        text.parse::<RuleText>()?.resolve(catalog)
    }

    pub fn to_text(&self) -> RuleText {
        RuleText {
            receiver_name: self.receiver_name.clone(),
            receiver_port: self.receiver_port,
            rotation: self.rotation,
            sender_name: self.sender_name.clone(),
            sender_port: self.sender_port,
            weight: self.weight,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_text().fmt(f)
    }
}

/// Parses a rule grammar: one rule per line or `;`-separated, `#` or `//` starts a comment line.
pub fn parse_rules(grammar: &str, catalog: &Catalog) -> Result<Vec<Rule>> {
    grammar
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .map(|line| Rule::parse(line, catalog))
        .collect()
}

/// Every rule joining two ports that share a type tag, one per receiver rotation variant.
pub fn generate_rules(catalog: &Catalog, weight: i32) -> Vec<Rule> {
    let mut rules = Vec::new();
    for receiver in catalog.iter() {
        for (rp, receiver_port) in receiver.ports.iter().enumerate() {
            for (rv, rotation) in receiver_port.rotations.iter().enumerate() {
                for sender in catalog.iter() {
                    for (sp, sender_port) in sender.ports.iter().enumerate() {
                        if sender_port.kind != receiver_port.kind {
                            continue;
                        }
                        rules.push(Rule {
                            receiver_type: receiver.type_id,
                            receiver_port: rp,
                            receiver_rotation: rv,
                            rotation: *rotation,
                            sender_type: sender.type_id,
                            sender_port: sp,
                            weight,
                            receiver_name: receiver.name.clone(),
                            sender_name: sender.name.clone(),
                        });
                    }
                }
            }
        }
    }
    rules
}

/// Joins rules back into a grammar string accepted by [`parse_rules`].
pub fn rules_to_grammar(rules: &[Rule]) -> String {
    rules
        .iter()
        .map(Rule::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

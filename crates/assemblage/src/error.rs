//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! malformed rule grammars, catalog problems, invalid engine configuration and
//! persisted records that cannot be resumed. Exhausted growth is not an error and is
//! reported through `Option`/`bool` results instead.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("rule '{rule}' references unknown module type '{name}'")]
    UnknownModuleType { name: String, rule: String },

    #[error("rule '{rule}' uses rotation {rotation} which the receiver port does not allow")]
    UnknownRotation { rule: String, rotation: f32 },

    #[error("rule '{rule}' references port {port} which module '{module}' does not have")]
    PortOutOfRange {
        rule: String,
        module: String,
        port: usize,
    },

    #[error("module catalog is empty")]
    EmptyCatalog,

    #[error("duplicate module name '{name}' in catalog")]
    DuplicateModuleName { name: String },

    #[error("invalid module record: {0}")]
    InvalidRecord(String),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn rule_errors_name_the_offending_rule() {
        let err = Error::UnknownModuleType {
            name: "C".into(),
            rule: "A|0=0<C|0%1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("A|0=0<C|0%1"));
        assert!(msg.contains("'C'"));
    }
}

//! Non-fatal findings and per-file linker failures.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// A join had several equally valid candidates; the first by id was used.
    MappingAmbiguity,
    /// A join fell back to a weaker strategy.
    MappingFallback,
    /// Every relation of some type was removed by the confidence filter.
    NoSurvivingRelations,
    EntityTypeSkew,
    TableSkew,
    /// A relation endpoint does not resolve to any entity (kept).
    DanglingRelation,
    /// A linker ran before the linkers it depends on.
    LinkerOrder,
    /// A gate failed but the caller asked not to fail the run.
    GateFailure,
}

impl WarningCode {
    pub const fn label(self) -> &'static str {
        match self {
            WarningCode::MappingAmbiguity => "mapping_ambiguity",
            WarningCode::MappingFallback => "mapping_fallback",
            WarningCode::NoSurvivingRelations => "no_surviving_relations",
            WarningCode::EntityTypeSkew => "entity_type_skew",
            WarningCode::TableSkew => "table_skew",
            WarningCode::DanglingRelation => "dangling_relation",
            WarningCode::LinkerOrder => "linker_order",
            WarningCode::GateFailure => "gate_failure",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    /// Entity/relation/file the warning is about, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            subject: None,
        }
    }

    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// A file or record a linker could not process. The rest of the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkFailure {
    pub linker: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    pub message: String,
}

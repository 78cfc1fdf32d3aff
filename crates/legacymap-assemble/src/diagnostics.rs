//! Run-scoped diagnostics sink.

use legacymap_ingest::{LinkFailure, LinkerKind, Warning, WarningCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What one linker contributed to the registry (after first-writer-wins dedup).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerCounts {
    pub entities: usize,
    pub relations: usize,
    pub failures: usize,
}

/// Collects warnings, plugin failures and per-linker counts for a single assembly.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    failures: Vec<LinkFailure>,
    linker_counts: BTreeMap<String, LinkerCounts>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(code = %warning.code, subject = ?warning.subject, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.warn(warning);
        }
    }

    pub fn record_failures(&mut self, failures: impl IntoIterator<Item = LinkFailure>) {
        self.failures.extend(failures);
    }

    pub fn record_linker(&mut self, kind: LinkerKind, counts: LinkerCounts) {
        self.linker_counts.insert(kind.label().to_string(), counts);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn failures(&self) -> &[LinkFailure] {
        &self.failures
    }

    pub fn linker_counts(&self) -> &BTreeMap<String, LinkerCounts> {
        &self.linker_counts
    }

    pub fn count(&self, code: WarningCode) -> usize {
        self.warnings.iter().filter(|w| w.code == code).count()
    }

    pub fn failures_by_linker(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.linker.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

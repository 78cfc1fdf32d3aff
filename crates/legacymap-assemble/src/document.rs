//! The published graph document and its re-check.

use crate::{
    compute_stats, enforce_gates, AssemblyConfig, AssemblyError, GraphStats, Trace,
};
use legacymap_ingest::Warning;
use legacymap_model::{ids_digest, Entity, Relation};
use serde::{Deserialize, Serialize};

pub const DOCUMENT_VERSION: &str = "1";

const REQUIRED_SECTIONS: [&str; 4] = ["entities", "relations", "traces", "stats"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_version")]
    pub version: String,
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub traces: Vec<Trace>,
    pub stats: GraphStats,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    #[serde(default)]
    pub digest: String,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// Entity ids, then relation ids, then trace ids, in output order.
pub fn document_digest(entities: &[Entity], relations: &[Relation], traces: &[Trace]) -> String {
    ids_digest(
        entities
            .iter()
            .map(|e| e.id.as_str())
            .chain(relations.iter().map(|r| r.id.as_str()))
            .chain(traces.iter().map(|t| t.id.as_str())),
    )
}

impl GraphDocument {
    pub fn new(
        entities: Vec<Entity>,
        relations: Vec<Relation>,
        traces: Vec<Trace>,
        stats: GraphStats,
        warnings: Vec<Warning>,
    ) -> Self {
        let digest = document_digest(&entities, &relations, &traces);
        Self {
            version: default_version(),
            entities,
            relations,
            traces,
            stats,
            warnings,
            digest,
        }
    }

    pub fn recompute_digest(&self) -> String {
        document_digest(&self.entities, &self.relations, &self.traces)
    }

    pub fn from_json_str(content: &str) -> Result<Self, AssemblyError> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| AssemblyError::structural("document", e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(AssemblyError::structural("document", "expected a JSON object"));
        };
        for section in REQUIRED_SECTIONS {
            match object.get(section) {
                None | Some(serde_json::Value::Null) => {
                    return Err(AssemblyError::structural(section, "missing"));
                }
                Some(_) => {}
            }
        }
        serde_json::from_value(value)
            .map_err(|e| AssemblyError::structural("document", e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn trace(&self, id: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.id == id)
    }

    pub fn traces_for_route<'a>(&'a self, route: &'a str) -> impl Iterator<Item = &'a Trace> + 'a {
        self.traces.iter().filter(move |t| t.route == route)
    }
}

/// Recompute graph statistics from the document itself and re-apply the gates.
///
/// Filter, plugin and linker counters cannot be re-derived from a finished graph,
/// so they are carried over from the stored stats. A non-empty digest must match.
pub fn check_document(
    doc: &GraphDocument,
    config: &AssemblyConfig,
) -> Result<GraphStats, AssemblyError> {
    config.validate()?;

    if !doc.digest.is_empty() {
        let actual = doc.recompute_digest();
        if actual != doc.digest {
            return Err(AssemblyError::structural(
                "digest",
                format!("stored {} does not match recomputed {actual}", doc.digest),
            ));
        }
    }

    let mut stats = compute_stats(&doc.entities, &doc.relations);
    stats.traces_total = doc.traces.len();
    stats.filtered_relations_below_confidence = doc.stats.filtered_relations_below_confidence;
    stats.filtered_relations_by_type = doc.stats.filtered_relations_by_type.clone();
    stats.plugin_failures = doc.stats.plugin_failures;
    stats.plugin_failures_by_linker = doc.stats.plugin_failures_by_linker.clone();
    stats.linker_counts = doc.stats.linker_counts.clone();

    enforce_gates(&stats, &config.gates)?;
    Ok(stats)
}

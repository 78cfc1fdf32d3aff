//! Confidence filter, graph statistics and quality gates.

use crate::{AssemblyError, GateConfig, LinkerCounts, SkewConfig};
use legacymap_ingest::{Warning, WarningCode};
use legacymap_model::{Entity, EntityKind, Relation, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Dangling-relation warnings beyond this are summarized in one line.
pub const MAX_DANGLING_WARNINGS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStats {
    pub routes_total: usize,
    pub routes_with_view: usize,
    pub routes_with_handler: usize,
    pub route_resolution_rate: f64,
    pub jsp_link_coverage: f64,
    pub filtered_relations_below_confidence: usize,
    pub filtered_relations_by_type: BTreeMap<String, usize>,
    pub config_parse_success_pct: f64,
    pub entities_by_type: BTreeMap<String, usize>,
    pub relations_by_type: BTreeMap<String, usize>,
    pub traces_total: usize,
    pub dangling_relations: usize,
    pub plugin_failures: usize,
    pub plugin_failures_by_linker: BTreeMap<String, usize>,
    pub linker_counts: BTreeMap<String, LinkerCounts>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<Relation>,
    pub removed: usize,
    pub removed_by_type: BTreeMap<String, usize>,
}

/// Drop every relation with `confidence < threshold`, preserving order.
pub fn filter_relations(relations: Vec<Relation>, threshold: f64) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    for relation in relations {
        if relation.confidence.value() < threshold {
            outcome.removed += 1;
            *outcome
                .removed_by_type
                .entry(relation.kind.label().to_string())
                .or_insert(0) += 1;
        } else {
            outcome.kept.push(relation);
        }
    }
    tracing::info!(
        kept = outcome.kept.len(),
        removed = outcome.removed,
        threshold,
        "applied confidence filter"
    );
    outcome
}

/// One warning per relation type that had relations before the filter and none after.
pub fn filter_warnings(outcome: &FilterOutcome, threshold: f64) -> Vec<Warning> {
    let surviving: HashSet<&str> = outcome.kept.iter().map(|r| r.kind.label()).collect();
    outcome
        .removed_by_type
        .iter()
        .filter(|(kind, _)| !surviving.contains(kind.as_str()))
        .map(|(kind, removed)| {
            Warning::new(
                WarningCode::NoSurvivingRelations,
                format!("all {removed} `{kind}` relations fell below confidence {threshold}"),
            )
            .about(kind.clone())
        })
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Graph-derived statistics. Filter, trace and plugin fields are left for the caller.
pub fn compute_stats(entities: &[Entity], relations: &[Relation]) -> GraphStats {
    let mut stats = GraphStats::default();

    for entity in entities {
        *stats
            .entities_by_type
            .entry(entity.kind.label().to_string())
            .or_insert(0) += 1;
    }
    for relation in relations {
        *stats
            .relations_by_type
            .entry(relation.kind.label().to_string())
            .or_insert(0) += 1;
    }

    let routes: HashSet<&str> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Route)
        .map(|e| e.id.as_str())
        .collect();
    let jsps: HashSet<&str> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Jsp)
        .map(|e| e.id.as_str())
        .collect();

    let mut with_view = HashSet::new();
    let mut with_handler = HashSet::new();
    let mut linked_jsps = HashSet::new();
    for relation in relations {
        let from = relation.from_id.as_str();
        match relation.kind {
            RelationKind::Renders if routes.contains(from) => {
                with_view.insert(from);
            }
            RelationKind::HandlesRoute if routes.contains(from) => {
                with_handler.insert(from);
            }
            _ => {}
        }
        let links_view =
            relation.kind == RelationKind::Renders
                || RelationKind::VIEW_CHAIN.contains(&relation.kind);
        if links_view && jsps.contains(relation.to_id.as_str()) {
            linked_jsps.insert(relation.to_id.as_str());
        }
    }

    stats.routes_total = routes.len();
    stats.routes_with_view = with_view.len();
    stats.routes_with_handler = with_handler.len();
    stats.route_resolution_rate = ratio(with_handler.len(), routes.len());
    stats.config_parse_success_pct = ratio(with_view.len().max(with_handler.len()), routes.len());
    stats.jsp_link_coverage = ratio(linked_jsps.len(), jsps.len());
    stats.dangling_relations = dangling(entities, relations).count();
    stats
}

fn dangling<'a>(
    entities: &'a [Entity],
    relations: &'a [Relation],
) -> impl Iterator<Item = &'a Relation> + 'a {
    let ids: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    relations.iter().filter(move |r| {
        !ids.contains(r.from_id.as_str()) || !ids.contains(r.to_id.as_str())
    })
}

/// Dangling relations are kept; each is reported, up to `MAX_DANGLING_WARNINGS`.
pub fn dangling_warnings(entities: &[Entity], relations: &[Relation]) -> Vec<Warning> {
    let all: Vec<&Relation> = dangling(entities, relations).collect();
    let mut warnings: Vec<Warning> = all
        .iter()
        .take(MAX_DANGLING_WARNINGS)
        .map(|r| {
            Warning::new(
                WarningCode::DanglingRelation,
                format!("{} endpoint does not resolve to an entity (kept)", r.kind),
            )
            .about(r.id.clone())
        })
        .collect();
    if all.len() > MAX_DANGLING_WARNINGS {
        warnings.push(Warning::new(
            WarningCode::DanglingRelation,
            format!(
                "{} more dangling relations not listed",
                all.len() - MAX_DANGLING_WARNINGS
            ),
        ));
    }
    warnings
}

/// Warn when one entity type, or one table among CRUD targets, dominates.
pub fn skew_warnings(
    entities: &[Entity],
    relations: &[Relation],
    skew: &SkewConfig,
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in entities {
        *by_type.entry(entity.kind.label()).or_insert(0) += 1;
    }
    if let Some((kind, share)) = dominant(&by_type, skew) {
        warnings.push(
            Warning::new(
                WarningCode::EntityTypeSkew,
                format!(
                    "{kind} entities are {:.0}% of the graph (limit {:.0}%)",
                    share * 100.0,
                    skew.max_share * 100.0
                ),
            )
            .about(kind.to_string()),
        );
    }

    let tables: HashSet<&str> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Table)
        .map(|e| e.id.as_str())
        .collect();
    let mut by_table: BTreeMap<&str, usize> = BTreeMap::new();
    for relation in relations.iter().filter(|r| r.kind.is_crud()) {
        if tables.contains(relation.to_id.as_str()) {
            *by_table.entry(relation.to_id.as_str()).or_insert(0) += 1;
        }
    }
    if let Some((table, share)) = dominant(&by_table, skew) {
        warnings.push(
            Warning::new(
                WarningCode::TableSkew,
                format!(
                    "{table} receives {:.0}% of all table access (limit {:.0}%)",
                    share * 100.0,
                    skew.max_share * 100.0
                ),
            )
            .about(table.to_string()),
        );
    }
    warnings
}

/// Largest bucket (first by key on ties) when it exceeds the configured share.
fn dominant<'a>(buckets: &BTreeMap<&'a str, usize>, skew: &SkewConfig) -> Option<(&'a str, f64)> {
    let total: usize = buckets.values().sum();
    if total == 0 || total < skew.min_population {
        return None;
    }
    let (key, count) = buckets
        .iter()
        .fold(None, |best: Option<(&'a str, usize)>, (&k, &c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((k, c)),
        })?;
    let share = count as f64 / total as f64;
    (share > skew.max_share).then_some((key, share))
}

/// Fail with the computed and required values when a gate metric is too low.
pub fn enforce_gates(stats: &GraphStats, gates: &GateConfig) -> Result<(), AssemblyError> {
    check_gate(
        "config_parse_success_pct",
        stats.config_parse_success_pct,
        gates.min_config_parse_success_pct,
    )?;
    if let Some(minimum) = gates.min_route_resolution_rate {
        check_gate("route_resolution_rate", stats.route_resolution_rate, minimum)?;
    }
    Ok(())
}

fn check_gate(metric: &str, actual: f64, minimum: f64) -> Result<(), AssemblyError> {
    if actual < minimum {
        return Err(AssemblyError::ValidationGate {
            metric: metric.to_string(),
            actual,
            minimum,
        });
    }
    Ok(())
}

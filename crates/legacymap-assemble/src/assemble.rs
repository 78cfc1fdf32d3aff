//! The assembly pass.

use crate::{
    build_traces, compute_stats, dangling_warnings, enforce_gates, filter_relations,
    filter_warnings, skew_warnings, AssemblyConfig, AssemblyError, Diagnostics, GraphDocument,
    LinkerCounts,
};
use legacymap_ingest::{
    JspClassifier, LinkContext, LinkOutput, LinkerKind, Warning, WarningCode,
};
use legacymap_model::{EntityKind, GraphRegistry, SourceInventory};

/// Run the full pass and enforce the quality gates.
pub fn assemble(
    inventory: &SourceInventory,
    config: &AssemblyConfig,
    diagnostics: &mut Diagnostics,
) -> Result<GraphDocument, AssemblyError> {
    let document = assemble_graph(inventory, config, diagnostics)?;
    enforce_gates(&document.stats, &config.gates)?;
    Ok(document)
}

/// Like `assemble`, but a failed gate is attached to the document as a
/// `gate_failure` warning instead of aborting.
pub fn assemble_lenient(
    inventory: &SourceInventory,
    config: &AssemblyConfig,
    diagnostics: &mut Diagnostics,
) -> Result<GraphDocument, AssemblyError> {
    let mut document = assemble_graph(inventory, config, diagnostics)?;
    if let Err(err) = enforce_gates(&document.stats, &config.gates) {
        let warning = Warning::new(WarningCode::GateFailure, err.to_string());
        diagnostics.warn(warning.clone());
        document.warnings.push(warning);
    }
    Ok(document)
}

/// Link, classify, filter, trace and measure. Gates are not applied.
pub fn assemble_graph(
    inventory: &SourceInventory,
    config: &AssemblyConfig,
    diagnostics: &mut Diagnostics,
) -> Result<GraphDocument, AssemblyError> {
    config.validate()?;
    tracing::info!(
        files = inventory.file_count(),
        linkers = config.linkers.len(),
        "assembling graph"
    );

    let mut registry = GraphRegistry::new();
    let mut routes_discovered = false;
    for &kind in &config.linkers {
        if kind.needs_routes() && !routes_discovered {
            diagnostics.warn(
                Warning::new(
                    WarningCode::LinkerOrder,
                    format!("{kind} runs before any route-discovering linker"),
                )
                .about(kind.label()),
            );
        }
        run_linker(kind, inventory, config, &mut registry, diagnostics);
        routes_discovered |= kind.discovers_routes();
    }

    classify_screens(&mut registry, inventory)?;

    let (entities, relations) = registry.into_parts();
    let filtered = filter_relations(relations, config.min_relation_confidence);
    diagnostics.extend_warnings(filter_warnings(&filtered, config.min_relation_confidence));
    let relations = filtered.kept;

    diagnostics.extend_warnings(dangling_warnings(&entities, &relations));

    let traces = build_traces(
        &entities,
        &relations,
        config.max_chain_hops,
        &config.trace_confidence,
    );

    let mut stats = compute_stats(&entities, &relations);
    stats.filtered_relations_below_confidence = filtered.removed;
    stats.filtered_relations_by_type = filtered.removed_by_type;
    stats.traces_total = traces.len();
    stats.plugin_failures = diagnostics.failures().len();
    stats.plugin_failures_by_linker = diagnostics.failures_by_linker();
    stats.linker_counts = diagnostics.linker_counts().clone();

    diagnostics.extend_warnings(skew_warnings(&entities, &relations, &config.skew));

    tracing::info!(
        entities = entities.len(),
        relations = relations.len(),
        traces = traces.len(),
        coverage = stats.config_parse_success_pct,
        "graph assembled"
    );

    Ok(GraphDocument::new(
        entities,
        relations,
        traces,
        stats,
        diagnostics.warnings().to_vec(),
    ))
}

fn run_linker(
    kind: LinkerKind,
    inventory: &SourceInventory,
    config: &AssemblyConfig,
    registry: &mut GraphRegistry,
    diagnostics: &mut Diagnostics,
) {
    let routes = registry.routes();
    let ctx = LinkContext {
        routes: &routes,
        inventory,
        confidence: &config.link_confidence,
    };
    let output = kind.plugin().apply(&ctx);
    let counts = merge_output(registry, output, diagnostics);
    tracing::info!(
        linker = %kind,
        entities = counts.entities,
        relations = counts.relations,
        failures = counts.failures,
        "linker finished"
    );
    diagnostics.record_linker(kind, counts);
}

/// Fold one linker's output into the registry. Counts only what was new.
fn merge_output(
    registry: &mut GraphRegistry,
    output: LinkOutput,
    diagnostics: &mut Diagnostics,
) -> LinkerCounts {
    let mut counts = LinkerCounts {
        failures: output.failures.len(),
        ..Default::default()
    };
    for entity in output
        .entities
        .into_values()
        .chain(output.method_entities.into_values())
    {
        if registry.insert_entity(entity) {
            counts.entities += 1;
        }
    }
    for relation in output.relations {
        if registry.insert_relation(relation) {
            counts.relations += 1;
        }
    }
    diagnostics.extend_warnings(output.warnings);
    diagnostics.record_failures(output.failures);
    counts
}

fn classify_screens(
    registry: &mut GraphRegistry,
    inventory: &SourceInventory,
) -> Result<(), AssemblyError> {
    let classifier = JspClassifier::new().map_err(|e| AssemblyError::Classifier(e.to_string()))?;
    let patches = classifier.patches(registry.entities_of(EntityKind::Jsp), inventory);
    tracing::debug!(screens = patches.len(), "classified JSP screens");
    for (id, patch) in patches {
        registry.enrich(&id, patch)?;
    }
    Ok(())
}

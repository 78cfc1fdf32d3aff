//! Human-readable summaries printed to stdout.

use colored::Colorize;
use legacymap_assemble::{GraphDocument, GraphStats, Trace};

pub fn print_summary(doc: &GraphDocument) {
    let stats = &doc.stats;
    println!(
        "  {} {} entities, {} relations, {} traces",
        "→".cyan(),
        doc.entities.len(),
        doc.relations.len(),
        stats.traces_total
    );
    print_coverage(stats);
    if stats.filtered_relations_below_confidence > 0 {
        println!(
            "  {} {} relations below confidence threshold",
            "filtered".yellow(),
            stats.filtered_relations_below_confidence
        );
    }
    for (linker, failures) in &stats.plugin_failures_by_linker {
        println!(
            "  {} {linker}: {failures} file(s) could not be linked",
            "failed".red()
        );
    }
    if !doc.warnings.is_empty() {
        println!("  {} {} warning(s)", "warn".yellow().bold(), doc.warnings.len());
        for warning in doc.warnings.iter().take(10) {
            println!("    [{}] {}", warning.code, warning.message);
        }
        if doc.warnings.len() > 10 {
            println!("    ... {} more", doc.warnings.len() - 10);
        }
    }
    println!("  {} {}", "digest".dimmed(), doc.digest);
}

pub fn print_coverage(stats: &GraphStats) {
    println!(
        "  {} routes={} with_view={} with_handler={} coverage={:.2} resolution={:.2} jsp_links={:.2}",
        "stats".cyan(),
        stats.routes_total,
        stats.routes_with_view,
        stats.routes_with_handler,
        stats.config_parse_success_pct,
        stats.route_resolution_rate,
        stats.jsp_link_coverage
    );
}

pub fn print_trace(trace: &Trace) {
    println!("{} {}", trace.route.bold(), format!("({:.2})", trace.confidence).dimmed());
    match &trace.handler {
        Some(handler) => println!("  handler {handler}"),
        None => println!("  handler {}", "none".dimmed()),
    }
    let chain: Vec<&str> = trace
        .path
        .iter()
        .skip_while(|id| **id != trace.screen)
        .map(String::as_str)
        .collect();
    println!("  screens {}", chain.join(" → "));
    if trace.tables.is_empty() {
        println!("  tables  {}", "none".dimmed());
    } else {
        println!("  tables  {}", trace.tables.join(", "));
        let crud = &trace.crud_summary;
        let buckets = [
            ("reads", &crud.reads),
            ("writes", &crud.writes),
            ("deletes", &crud.deletes),
        ];
        for (label, tables) in buckets {
            if !tables.is_empty() {
                println!("    {label:<7} {}", tables.join(", "));
            }
        }
    }
    if !trace.evidence.is_empty() {
        let cited: Vec<String> = trace
            .evidence
            .iter()
            .map(|e| match e.line {
                Some(line) => format!("{}:{line}", e.file),
                None => e.file.clone(),
            })
            .collect();
        println!("  {}", format!("evidence {}", cited.join(", ")).dimmed());
    }
}

//! JAX-RS route discovery.
//!
//! Per Java file, the first strategy that yields anything is authoritative:
//!
//! 1. `rest_endpoints` metadata from the upstream parser;
//! 2. `rest_endpoint` code mappings (`to_reference` = `package.Class.method`);
//! 3. annotation scan: class-level `@Path` + method-level verb annotation, with
//!    `full_path = base + class_path + method_path`.
//!
//! `base` is the shortest servlet mount already in the graph (trailing `/*` removed)
//! or, without mounts, the shortest `@ApplicationPath` in the inventory.

use super::{
    checked_verb, link_files, list_values, LinkConfidence, LinkContext, LinkError, LinkOutput,
    LinkerKind, LinkerPlugin, HTTP_VERBS,
};
use legacymap_model::{
    ids, Annotation, Entity, Evidence, FileRef, JavaClass, JavaDetails, Relation, RelationKind,
    RestEndpoint, RouteAttributes, SourceFile,
};

pub const REST_ENDPOINT: &str = "rest_endpoint";

pub struct JaxRsLinker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Metadata,
    CodeMapping,
    AnnotationScan,
}

impl Strategy {
    fn describe(self) -> &'static str {
        match self {
            Strategy::Metadata => "parser endpoint metadata",
            Strategy::CodeMapping => "rest_endpoint code mapping",
            Strategy::AnnotationScan => "@Path/@VERB annotation scan",
        }
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    path: String,
    verb: String,
    controller: Option<String>,
    method: Option<String>,
    produces: Vec<String>,
    consumes: Vec<String>,
    line: Option<u32>,
    strategy: Strategy,
}

/// Servlet mounts visible to this linker, as `(path prefix, mount route id)`.
#[derive(Debug, Default)]
struct Mounts {
    prefixes: Vec<(String, String)>,
}

impl Mounts {
    fn from_routes(ctx: &LinkContext<'_>) -> Self {
        let mut prefixes: Vec<(String, String)> = ctx
            .routes
            .values()
            .filter_map(|route| {
                let attrs = route.as_route()?;
                attrs.is_mount.then(|| {
                    let prefix = ids::normalize_path(attrs.path.trim_end_matches("/*"));
                    (prefix, route.id.clone())
                })
            })
            .collect();
        prefixes.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        Self { prefixes }
    }

    fn shortest(&self) -> Option<&str> {
        self.prefixes.first().map(|(p, _)| p.as_str())
    }

    /// Longest mount whose prefix contains `path` on a segment boundary.
    fn containing(&self, path: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .rev()
            .find(|(prefix, _)| {
                prefix == "/"
                    || path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|(_, id)| id.as_str())
    }
}

impl LinkerPlugin for JaxRsLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::Jaxrs
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let mounts = Mounts::from_routes(ctx);
        let files = ctx.inventory.java_files();
        let base = match mounts.shortest() {
            Some(mount) => mount.to_string(),
            None => shortest_application_path(&files).unwrap_or_default(),
        };
        tracing::debug!(base = %base, mounts = mounts.prefixes.len(), "jaxrs base path");

        let confidence = ctx.confidence;
        let out = link_files(self.kind(), &files, |file, details| {
            let endpoints = discover(details, &base)?;
            Ok(emit(file, endpoints, &mounts, confidence))
        });

        tracing::info!(
            routes = out.entities.len(),
            handlers = out.method_entities.len(),
            "linked JAX-RS routes"
        );
        out
    }
}

fn shortest_application_path(files: &[(&SourceFile, &JavaDetails)]) -> Option<String> {
    files
        .iter()
        .flat_map(|(_, details)| details.classes.iter())
        .flat_map(|class| class.annotations.iter())
        .filter(|a| a.simple_name() == "ApplicationPath")
        .filter_map(|a| a.value())
        .map(ids::normalize_path)
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

fn discover(details: &JavaDetails, base: &str) -> Result<Vec<Endpoint>, LinkError> {
    let from_metadata = details
        .rest_endpoints
        .iter()
        .map(endpoint_from_metadata)
        .collect::<Result<Vec<_>, _>>()?;
    if !from_metadata.is_empty() {
        return Ok(from_metadata);
    }

    let from_mappings = details
        .code_mappings
        .iter()
        .filter(|m| m.mapping_type == REST_ENDPOINT)
        .map(|m| {
            let member = ids::split_member_reference(&m.to_reference)
                .ok_or_else(|| LinkError::UnresolvableReference(m.to_reference.clone()))?;
            if m.from_reference.trim().is_empty() {
                return Err(LinkError::malformed(REST_ENDPOINT, "missing path"));
            }
            let controller = match &member.package {
                Some(package) => format!("{package}.{}", member.class),
                None => member.class.clone(),
            };
            Ok(Endpoint {
                path: ids::normalize_path(&m.from_reference),
                verb: checked_verb(m.attr("http_method").or_else(|| m.attr("verb")))?,
                controller: Some(controller),
                method: Some(member.member),
                produces: m.attr("produces").map(list_values).unwrap_or_default(),
                consumes: m.attr("consumes").map(list_values).unwrap_or_default(),
                line: m.line,
                strategy: Strategy::CodeMapping,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if !from_mappings.is_empty() {
        return Ok(from_mappings);
    }

    let package = details.package.as_deref();
    details
        .classes
        .iter()
        .map(|class| scan_class(class, package, base))
        .collect::<Result<Vec<_>, _>>()
        .map(|nested| nested.into_iter().flatten().collect())
}

fn endpoint_from_metadata(ep: &RestEndpoint) -> Result<Endpoint, LinkError> {
    let path = match (&ep.path, &ep.class_path, &ep.method_path) {
        (Some(path), _, _) if !path.trim().is_empty() => ids::normalize_path(path),
        (_, None, None) => {
            return Err(LinkError::malformed(REST_ENDPOINT, "endpoint without a path"))
        }
        (_, class_path, method_path) => ids::join_paths(&[
            class_path.as_deref().unwrap_or(""),
            method_path.as_deref().unwrap_or(""),
        ]),
    };
    Ok(Endpoint {
        path,
        verb: checked_verb(ep.http_method.as_deref())?,
        controller: ep.controller.clone().filter(|c| !c.trim().is_empty()),
        method: ep.method_name.clone().filter(|m| !m.trim().is_empty()),
        produces: ep.produces.clone(),
        consumes: ep.consumes.clone(),
        line: ep.line,
        strategy: Strategy::Metadata,
    })
}

fn scan_class(
    class: &JavaClass,
    file_package: Option<&str>,
    base: &str,
) -> Result<Vec<Endpoint>, LinkError> {
    let Some(class_path) = find(&class.annotations, "Path").and_then(Annotation::value) else {
        return Ok(Vec::new());
    };
    let package = class.package.as_deref().or(file_package);
    let controller = match package {
        Some(p) => format!("{p}.{}", class.name),
        None => class.name.clone(),
    };
    let class_produces = media_types(&class.annotations, "Produces");
    let class_consumes = media_types(&class.annotations, "Consumes");

    let mut endpoints = Vec::new();
    for method in &class.methods {
        let Some(verb) = method
            .annotations
            .iter()
            .map(Annotation::simple_name)
            .find(|name| HTTP_VERBS.contains(name))
        else {
            continue;
        };
        let method_path = find(&method.annotations, "Path")
            .and_then(Annotation::value)
            .unwrap_or("");
        let produces = media_types(&method.annotations, "Produces");
        let consumes = media_types(&method.annotations, "Consumes");

        endpoints.push(Endpoint {
            path: ids::join_paths(&[base, class_path, method_path]),
            verb: checked_verb(Some(verb))?,
            controller: Some(controller.clone()),
            method: Some(method.name.clone()),
            produces: if produces.is_empty() { class_produces.clone() } else { produces },
            consumes: if consumes.is_empty() { class_consumes.clone() } else { consumes },
            line: None,
            strategy: Strategy::AnnotationScan,
        });
    }
    Ok(endpoints)
}

fn find<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.simple_name() == name)
}

fn media_types(annotations: &[Annotation], name: &str) -> Vec<String> {
    find(annotations, name)
        .and_then(Annotation::value)
        .map(list_values)
        .unwrap_or_default()
}

fn emit(
    file: &SourceFile,
    endpoints: Vec<Endpoint>,
    mounts: &Mounts,
    confidence: &LinkConfidence,
) -> LinkOutput {
    let mut out = LinkOutput::default();
    for ep in endpoints {
        let source = FileRef {
            path: file.path.clone(),
            line: ep.line,
        };
        let route = Entity::route(RouteAttributes {
            framework: "jaxrs".to_string(),
            http_method: ep.verb.clone(),
            path: ep.path.clone(),
            produces: ep.produces,
            consumes: ep.consumes,
            controller: ep.controller.clone(),
            method: ep.method.clone(),
            ..Default::default()
        })
        .with_source(source.clone());
        let evidence = Evidence::file(file.path.clone()).at_line(ep.line);

        if let (Some(controller), Some(method)) = (&ep.controller, &ep.method) {
            let (package, class) = ids::split_class_name(controller);
            let handler =
                Entity::java_method(package.as_deref(), &class, method).with_source(source);
            out.add_relation(
                Relation::new(
                    route.id.clone(),
                    RelationKind::HandlesRoute,
                    handler.id.clone(),
                    confidence.handles_route,
                    format!("{} maps {} to {}", ep.strategy.describe(), route.name, handler.name),
                )
                .with_evidence(evidence.clone()),
            );
            out.add_method(handler);
        }

        if let Some(mount_id) = mounts.containing(&ep.path) {
            if mount_id != route.id {
                out.add_relation(
                    Relation::new(
                        route.id.clone(),
                        RelationKind::MountedUnder,
                        mount_id.to_string(),
                        confidence.mounted_under,
                        format!("{} lies under servlet mount {mount_id}", ep.path),
                    )
                    .with_evidence(evidence),
                );
            }
        }
        out.add_entity(route);
    }
    out
}

//! Declarative security: `securedBy` from routes (web.xml `security-constraint`) and
//! from handler methods (`@RolesAllowed`).

use super::{
    link_files, list_values, record_failure, LinkContext, LinkError, LinkOutput, LinkerKind,
    LinkerPlugin,
};
use legacymap_model::{
    ids, Annotation, Entity, Evidence, FileRef, JavaDetails, Relation, RelationKind, SourceFile,
};
use std::collections::BTreeMap;

pub const SECURITY_CONSTRAINT: &str = "security_constraint";

pub struct SecurityLinker;

impl LinkerPlugin for SecurityLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::Security
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let mut out = LinkOutput::default();
        let confidence = ctx.confidence.secured_by;

        for (file, details) in ctx.inventory.config_files() {
            for mapping in details
                .code_mappings
                .iter()
                .filter(|m| m.mapping_type == SECURITY_CONSTRAINT)
            {
                let pattern = mapping.from_reference.trim();
                let roles = list_values(&mapping.to_reference);
                if pattern.is_empty() || roles.is_empty() {
                    let err = LinkError::malformed(
                        SECURITY_CONSTRAINT,
                        "needs a url-pattern and at least one role",
                    );
                    record_failure(&mut out, self.kind(), &file.path, pattern.to_string(), &err);
                    continue;
                }

                for route_id in matching_routes(ctx.routes, pattern) {
                    for role_name in &roles {
                        let role = Entity::role(role_name, "web.xml").with_source(FileRef {
                            path: file.path.clone(),
                            line: mapping.line,
                        });
                        out.add_relation(
                            Relation::new(
                                route_id.clone(),
                                RelationKind::SecuredBy,
                                role.id.clone(),
                                confidence,
                                format!("security-constraint {pattern} requires role {role_name}"),
                            )
                            .with_evidence(
                                Evidence::file(file.path.clone())
                                    .at_line(mapping.line)
                                    .with_detail(pattern.to_string()),
                            ),
                        );
                        out.add_entity(role);
                    }
                }
            }
        }

        let java = ctx.inventory.java_files();
        out.merge(link_files(self.kind(), &java, |file, details| {
            Ok(link_roles_allowed(file, details, confidence))
        }));

        tracing::info!(secured = out.relations.len(), "linked security constraints");
        out
    }
}

/// Servlet url-pattern matching: exact, `/prefix/*`, `*.ext`, or `/`/`/*` for all.
pub fn url_pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.trim();
    if pattern == "/" || pattern == "/*" {
        return true;
    }
    if let Some(ext) = pattern.strip_prefix("*.") {
        return path.ends_with(&format!(".{ext}"));
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        let prefix = ids::normalize_path(prefix);
        return path == prefix
            || path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'));
    }
    ids::normalize_path(pattern) == path
}

fn matching_routes(routes: &BTreeMap<String, Entity>, pattern: &str) -> Vec<String> {
    routes
        .values()
        .filter(|route| {
            route
                .as_route()
                .is_some_and(|attrs| !attrs.is_mount && url_pattern_matches(pattern, &attrs.path))
        })
        .map(|route| route.id.clone())
        .collect()
}

fn roles_of(annotations: &[Annotation]) -> Option<Vec<String>> {
    annotations
        .iter()
        .find(|a| a.simple_name() == "RolesAllowed")
        .and_then(Annotation::value)
        .map(list_values)
}

fn link_roles_allowed(file: &SourceFile, details: &JavaDetails, confidence: f64) -> LinkOutput {
    let mut out = LinkOutput::default();
    for class in &details.classes {
        let package = class.package.as_deref().or(details.package.as_deref());
        let class_roles = roles_of(&class.annotations);
        for method in &class.methods {
            // Method-level roles replace class-level ones.
            let Some(roles) = roles_of(&method.annotations).or_else(|| class_roles.clone()) else {
                continue;
            };
            let handler = Entity::java_method(package, &class.name, &method.name)
                .with_source(FileRef::new(file.path.clone()));
            for role_name in roles {
                let role = Entity::role(&role_name, "annotation")
                    .with_source(FileRef::new(file.path.clone()));
                out.add_relation(
                    Relation::new(
                        handler.id.clone(),
                        RelationKind::SecuredBy,
                        role.id.clone(),
                        confidence,
                        format!("@RolesAllowed({role_name}) on {}", handler.name),
                    )
                    .with_evidence(
                        Evidence::file(file.path.clone()).with_detail("@RolesAllowed".to_string()),
                    ),
                );
                out.add_entity(role);
            }
            out.add_method(handler);
        }
    }
    out
}

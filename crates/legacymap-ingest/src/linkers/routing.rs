//! Servlet and Struts route discovery.
//!
//! - `servlet_mapping` records (web.xml) and `@WebServlet` classes mount a servlet
//!   class under a url-pattern. Patterns ending in `/*` are *mounts*: the JAX-RS
//!   linker uses them as base paths and links its routes under them.
//! - `action_mapping` records (struts-config.xml) declare an action path, its action
//!   class, form bean, dispatch method and forwards. Forwards to JSPs become
//!   `renders` relations.

use super::screens::placeholder_screen;
use super::{
    checked_verb, is_view_path, link_files, list_values, resolve_view_path, LinkConfidence,
    LinkContext, LinkError, LinkOutput, LinkerKind, LinkerPlugin,
};
use legacymap_model::{
    ids, CodeMapping, Entity, Evidence, FileRef, JavaDetails, Relation, RelationKind,
    RouteAttributes, SourceFile,
};

pub const SERVLET_MAPPING: &str = "servlet_mapping";
pub const ACTION_MAPPING: &str = "action_mapping";

pub struct ServletStrutsLinker;

impl LinkerPlugin for ServletStrutsLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::ServletStruts
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let confidence = ctx.confidence;

        let configs = ctx.inventory.config_files();
        let mut out = link_files(self.kind(), &configs, |file, details| {
            link_mappings(file, &details.code_mappings, confidence)
        });

        let java = ctx.inventory.java_files();
        out.merge(link_files(self.kind(), &java, |file, details| {
            let mut partial = link_mappings(file, &details.code_mappings, confidence)?;
            partial.merge(link_web_servlets(file, details, confidence));
            Ok(partial)
        }));

        tracing::info!(
            routes = out.entities.values().filter(|e| e.as_route().is_some()).count(),
            handlers = out.method_entities.len(),
            "linked servlet/struts routes"
        );
        out
    }
}

fn link_mappings(
    file: &SourceFile,
    mappings: &[CodeMapping],
    confidence: &LinkConfidence,
) -> Result<LinkOutput, LinkError> {
    let mut out = LinkOutput::default();
    for mapping in mappings {
        match mapping.mapping_type.as_str() {
            SERVLET_MAPPING => {
                let route = servlet_route(file, mapping)?;
                emit_route(&mut out, route, file, mapping.line, "servlet-mapping", confidence);
            }
            ACTION_MAPPING => {
                let route = struts_route(file, mapping)?;
                emit_forwards(&mut out, &route, file, mapping, confidence);
                let source = "struts action-mapping";
                emit_route(&mut out, route, file, mapping.line, source, confidence);
            }
            _ => {}
        }
    }
    Ok(out)
}

fn servlet_route(file: &SourceFile, mapping: &CodeMapping) -> Result<Entity, LinkError> {
    let pattern = mapping.from_reference.trim();
    if pattern.is_empty() {
        return Err(LinkError::malformed(SERVLET_MAPPING, "missing url-pattern"));
    }
    let class = mapping
        .attr("servlet_class")
        .unwrap_or_else(|| mapping.to_reference.trim());

    Ok(Entity::route(RouteAttributes {
        framework: "servlet".to_string(),
        http_method: "ANY".to_string(),
        path: pattern.to_string(),
        controller: non_empty(class),
        method: non_empty(class).map(|_| "service".to_string()),
        config_file: Some(file.path.clone()),
        mapping_type: Some(SERVLET_MAPPING.to_string()),
        is_mount: pattern.ends_with("/*"),
        ..Default::default()
    })
    .with_source(FileRef {
        path: file.path.clone(),
        line: mapping.line,
    }))
}

/// Route for a Struts `action_mapping` record. The business-rules linker re-derives
/// these from the same records to index form beans.
pub(crate) fn struts_route(file: &SourceFile, mapping: &CodeMapping) -> Result<Entity, LinkError> {
    let path = mapping.from_reference.trim();
    if path.is_empty() {
        return Err(LinkError::malformed(ACTION_MAPPING, "missing action path"));
    }
    let verb = checked_verb(mapping.attr("http_method"))?;
    let controller = non_empty(mapping.to_reference.trim());
    let method = mapping
        .attr("method")
        .map(str::to_string)
        .or_else(|| controller.as_ref().map(|_| "execute".to_string()));
    let framework = non_empty(mapping.framework.trim()).unwrap_or_else(|| "struts".to_string());

    Ok(Entity::route(RouteAttributes {
        framework,
        http_method: verb,
        path: path.to_string(),
        controller,
        method,
        form_name: mapping
            .attr("form_name")
            .or_else(|| mapping.attr("name"))
            .map(str::to_string),
        config_file: Some(file.path.clone()),
        mapping_type: Some(ACTION_MAPPING.to_string()),
        ..Default::default()
    })
    .with_source(FileRef {
        path: file.path.clone(),
        line: mapping.line,
    }))
}

fn emit_forwards(
    out: &mut LinkOutput,
    route: &Entity,
    file: &SourceFile,
    mapping: &CodeMapping,
    confidence: &LinkConfidence,
) {
    for (key, value) in &mapping.attributes {
        let is_forward = key == "input" || key == "forward" || key.starts_with("forward:");
        if !is_forward || !is_view_path(value) {
            continue;
        }
        let Some(view_path) = resolve_view_path("/", value) else {
            continue;
        };
        let screen = placeholder_screen(&view_path);
        out.add_relation(
            Relation::new(
                route.id.clone(),
                RelationKind::Renders,
                screen.id.clone(),
                confidence.renders,
                format!("struts {key} -> {view_path}"),
            )
            .with_evidence(
                Evidence::file(file.path.clone())
                    .at_line(mapping.line)
                    .with_detail(format!("{key}={value}")),
            ),
        );
        out.add_entity(screen);
    }
}

/// `@WebServlet("/path")` / `@WebServlet(urlPatterns = {...})` on servlet classes.
fn link_web_servlets(
    file: &SourceFile,
    details: &JavaDetails,
    confidence: &LinkConfidence,
) -> LinkOutput {
    let mut out = LinkOutput::default();
    for class in &details.classes {
        let package = class.package.as_deref().or(details.package.as_deref());
        let qualified = match package {
            Some(p) => format!("{p}.{}", class.name),
            None => class.name.clone(),
        };
        for annotation in class
            .annotations
            .iter()
            .filter(|a| a.simple_name() == "WebServlet")
        {
            let raw = annotation
                .attributes
                .get("urlPatterns")
                .map(String::as_str)
                .or_else(|| annotation.value());
            for pattern in raw.map(list_values).unwrap_or_default() {
                let route = Entity::route(RouteAttributes {
                    framework: "servlet".to_string(),
                    http_method: "ANY".to_string(),
                    path: pattern.clone(),
                    controller: Some(qualified.clone()),
                    method: Some("service".to_string()),
                    is_mount: pattern.ends_with("/*"),
                    ..Default::default()
                })
                .with_source(FileRef::new(file.path.clone()));
                emit_route(&mut out, route, file, None, "@WebServlet", confidence);
            }
        }
    }
    out
}

/// Route + handler method + `handlesRoute`, when the handler is known.
fn emit_route(
    out: &mut LinkOutput,
    route: Entity,
    file: &SourceFile,
    line: Option<u32>,
    strategy: &str,
    confidence: &LinkConfidence,
) {
    let handler = route.as_route().and_then(|attrs| {
        let controller = attrs.controller.as_deref()?;
        let method = attrs.method.as_deref()?;
        let (package, class) = ids::split_class_name(controller);
        Some(
            Entity::java_method(package.as_deref(), &class, method)
                .with_source(FileRef::new(file.path.clone())),
        )
    });

    if let Some(handler) = handler {
        out.add_relation(
            Relation::new(
                route.id.clone(),
                RelationKind::HandlesRoute,
                handler.id.clone(),
                confidence.handles_route,
                format!("{strategy} maps {} to {}", route.name, handler.name),
            )
            .with_evidence(Evidence::file(file.path.clone()).at_line(line)),
        );
        out.add_method(handler);
    }
    out.add_entity(route);
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legacymap_model::{ConfigDetails, FileDetails, SourceInventory};
    use std::collections::BTreeMap;

    fn mapping(kind: &str, from: &str, to: &str, attrs: &[(&str, &str)]) -> CodeMapping {
        CodeMapping {
            mapping_type: kind.to_string(),
            framework: String::new(),
            from_reference: from.to_string(),
            to_reference: to.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            line: Some(12),
        }
    }

    fn run(mappings: Vec<CodeMapping>) -> LinkOutput {
        let mut inventory = SourceInventory::default();
        inventory.push_file(
            "web",
            "config",
            SourceFile {
                path: "WEB-INF/struts-config.xml".to_string(),
                details: FileDetails::Config(ConfigDetails {
                    validation_rules: vec![],
                    code_mappings: mappings,
                }),
            },
        );
        let routes = BTreeMap::new();
        let confidence = LinkConfidence::default();
        ServletStrutsLinker.apply(&LinkContext {
            routes: &routes,
            inventory: &inventory,
            confidence: &confidence,
        })
    }

    #[test]
    fn action_mapping_yields_route_handler_and_screens() {
        let out = run(vec![mapping(
            ACTION_MAPPING,
            "/user/save",
            "com.acme.web.SaveUserAction",
            &[
                ("form_name", "UserForm"),
                ("http_method", "post"),
                ("forward:success", "/jsp/users/list.jsp"),
                ("forward:failure", "tiles.def.error"),
                ("input", "/jsp/users/edit.jsp"),
            ],
        )]);

        let route = &out.entities["route__user_save_POST"];
        let attrs = route.as_route().unwrap();
        assert_eq!(attrs.form_name.as_deref(), Some("UserForm"));
        assert_eq!(attrs.method.as_deref(), Some("execute"));
        assert_eq!(attrs.config_file.as_deref(), Some("WEB-INF/struts-config.xml"));
        assert_eq!(attrs.mapping_type.as_deref(), Some(ACTION_MAPPING));

        assert!(out
            .method_entities
            .contains_key("method_com.acme.web.SaveUserAction#execute"));

        let renders: Vec<_> = out
            .relations
            .iter()
            .filter(|r| r.kind == RelationKind::Renders)
            .map(|r| r.to_id.as_str())
            .collect();
        assert_eq!(renders, vec!["jsp__jsp_users_list_jsp", "jsp__jsp_users_edit_jsp"]);
    }

    #[test]
    fn servlet_mounts_are_flagged() {
        let out = run(vec![
            mapping(SERVLET_MAPPING, "/api/*", "org.glassfish.jersey.ServletContainer", &[]),
            mapping(SERVLET_MAPPING, "*.do", "org.apache.struts.action.ActionServlet", &[]),
        ]);
        let mount = out.entities["route__api___ANY"].as_route().unwrap();
        assert!(mount.is_mount);
        let ext = out
            .entities
            .values()
            .find_map(|e| e.as_route().filter(|r| r.path == "/*.do"))
            .unwrap();
        assert!(!ext.is_mount);
    }

    #[test]
    fn bad_record_fails_the_file() {
        let out = run(vec![
            mapping(ACTION_MAPPING, "/ok", "com.acme.OkAction", &[]),
            mapping(ACTION_MAPPING, "/bad", "com.acme.BadAction", &[("http_method", "FETCH")]),
        ]);
        assert_eq!(out.failures.len(), 1);
        assert!(out.failures[0].message.contains("FETCH"));
    }
}

//! Validation rules (Commons Validator / Struts `validation.xml`) joined to routes.
//!
//! Join strategies, strongest first:
//!
//! 1. form name: every route whose action mapping declares the rule's form bean;
//! 2. same configuration file as the rule;
//! 3. for `validation.xml`-style files, routes configured in the same directory.
//!
//! A rule restricted to an `action_method` skips candidates dispatching elsewhere.
//! A form shared by several routes links all of them and reports the ambiguity.
//! Strategies 2 and 3 are fallbacks: they are reported, and when they yield several
//! candidates only the first by id is linked.

use super::routing::{struts_route, ACTION_MAPPING};
use super::{record_failure, LinkContext, LinkError, LinkOutput, LinkerKind, LinkerPlugin};
use crate::{Warning, WarningCode};
use legacymap_model::{
    Entity, Evidence, FileRef, Relation, RelationKind, RouteAttributes, RuleAttributes,
    SourceFile, ValidationRule,
};
use std::collections::{BTreeMap, BTreeSet};

pub struct BusinessRulesLinker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    FormName,
    SameConfigFile,
    SameDirectory,
}

impl Join {
    fn describe(self) -> &'static str {
        match self {
            Join::FormName => "form name",
            Join::SameConfigFile => "same configuration file",
            Join::SameDirectory => "same configuration directory",
        }
    }
}

impl LinkerPlugin for BusinessRulesLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::BusinessRules
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let mut out = LinkOutput::default();
        let configs = ctx.inventory.config_files();
        let has_rules = configs.iter().any(|(_, d)| !d.validation_rules.is_empty());
        if has_rules && ctx.routes.is_empty() {
            out.warnings.push(Warning::new(
                WarningCode::LinkerOrder,
                "business_rules ran with no routes; validation rules cannot be joined \
                 (run route discovery linkers first)",
            ));
        }

        let forms = form_index(ctx);
        for (file, details) in &configs {
            for rule in &details.validation_rules {
                if let Err(err) = link_rule(&mut out, ctx, &forms, file, rule) {
                    let record = format!("{}.{}", rule.form_name, rule.field_reference);
                    record_failure(&mut out, self.kind(), &file.path, record, &err);
                }
            }
        }

        tracing::info!(
            rules = out.entities.len(),
            links = out.relations.len(),
            warnings = out.warnings.len(),
            "linked validation rules"
        );
        out
    }
}

/// Form bean → routes that declare it. Action-mapping records are indexed first, so
/// a form declared by any mapping of a route joins even when the graph kept another
/// declaration of that route; form names on the route snapshot follow. Only routes
/// present in the graph are indexed.
fn form_index(ctx: &LinkContext<'_>) -> BTreeMap<String, BTreeSet<String>> {
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let configs = ctx.inventory.config_files();
    let java = ctx.inventory.java_files();
    let records = configs
        .iter()
        .map(|(file, d)| (*file, &d.code_mappings))
        .chain(java.iter().map(|(file, d)| (*file, &d.code_mappings)));

    for (file, mappings) in records {
        for mapping in mappings.iter().filter(|m| m.mapping_type == ACTION_MAPPING) {
            let route = match struts_route(file, mapping) {
                Ok(route) => route,
                Err(err) => {
                    // Already reported by the routing linker.
                    tracing::debug!(file = %file.path, error = %err, "unindexed action mapping");
                    continue;
                }
            };
            if !ctx.routes.contains_key(&route.id) {
                continue;
            }
            if let Some(form) = route.as_route().and_then(|r| r.form_name.clone()) {
                index.entry(form).or_default().insert(route.id);
            }
        }
    }
    for route in ctx.routes.values() {
        if let Some(form) = route.as_route().and_then(|r| r.form_name.as_ref()) {
            index.entry(form.clone()).or_default().insert(route.id.clone());
        }
    }
    index
}

fn rule_entity(file: &SourceFile, rule: &ValidationRule) -> Result<Entity, LinkError> {
    for (field, value) in [
        ("form_name", &rule.form_name),
        ("field_reference", &rule.field_reference),
        ("validation_type", &rule.validation_type),
    ] {
        if value.trim().is_empty() {
            return Err(LinkError::malformed("validation_rule", format!("empty {field}")));
        }
    }
    Ok(Entity::rule(RuleAttributes {
        form_name: rule.form_name.trim().to_string(),
        field_reference: rule.field_reference.trim().to_string(),
        validation_type: rule.validation_type.trim().to_string(),
        variables: rule.validation_variables.clone(),
        framework: rule.framework.clone(),
        validation_source: rule.validation_source.clone(),
        action_method: rule.action_method.clone(),
    })
    .with_source(FileRef {
        path: file.path.clone(),
        line: rule.line,
    }))
}

fn link_rule(
    out: &mut LinkOutput,
    ctx: &LinkContext<'_>,
    forms: &BTreeMap<String, BTreeSet<String>>,
    file: &SourceFile,
    rule: &ValidationRule,
) -> Result<(), LinkError> {
    let entity = rule_entity(file, rule)?;
    let action_method = rule.action_method.as_deref().map(str::trim);

    let accepts = |route_id: &String| {
        ctx.routes
            .get(route_id)
            .and_then(Entity::as_route)
            .is_some_and(|attrs| dispatches_to(attrs, action_method))
    };

    let by_form: Vec<String> = forms
        .get(rule.form_name.trim())
        .into_iter()
        .flatten()
        .filter(|&id| accepts(id))
        .cloned()
        .collect();

    let (join, candidates) = if !by_form.is_empty() {
        (Join::FormName, by_form)
    } else {
        let same_file = routes_where(ctx, |attrs| {
            attrs.config_file.as_deref() == Some(file.path.as_str())
        });
        let same_file: Vec<String> = same_file.into_iter().filter(|id| accepts(id)).collect();
        if !same_file.is_empty() {
            (Join::SameConfigFile, same_file)
        } else if is_validation_file(&file.path) {
            let dir = parent_dir(&file.path);
            let same_dir = routes_where(ctx, |attrs| {
                attrs.mapping_type.as_deref() == Some(ACTION_MAPPING)
                    && attrs.config_file.as_deref().map(parent_dir) == Some(dir)
            });
            (
                Join::SameDirectory,
                same_dir.into_iter().filter(|id| accepts(id)).collect(),
            )
        } else {
            (Join::SameDirectory, Vec::new())
        }
    };

    let targets = if candidates.len() <= 1 {
        candidates
    } else if join == Join::FormName {
        out.warnings.push(
            Warning::new(
                WarningCode::MappingAmbiguity,
                format!(
                    "{} routes declare form {} for rule {}; linking all of them",
                    candidates.len(),
                    rule.form_name.trim(),
                    entity.name
                ),
            )
            .about(entity.id.clone()),
        );
        candidates
    } else {
        out.warnings.push(
            Warning::new(
                WarningCode::MappingAmbiguity,
                format!(
                    "{} candidate routes by {} for rule {}; using {}",
                    candidates.len(),
                    join.describe(),
                    entity.name,
                    candidates[0]
                ),
            )
            .about(entity.id.clone()),
        );
        candidates.into_iter().take(1).collect()
    };

    if !targets.is_empty() && join != Join::FormName {
        out.warnings.push(
            Warning::new(
                WarningCode::MappingFallback,
                format!(
                    "no route declares form {}; joined rule by {}",
                    rule.form_name,
                    join.describe()
                ),
            )
            .about(entity.id.clone()),
        );
    }
    tracing::debug!(
        rule = %entity.id,
        join = join.describe(),
        targets = targets.len(),
        "validation rule join"
    );

    for route_id in targets {
        out.add_relation(
            Relation::new(
                route_id,
                RelationKind::ValidatedBy,
                entity.id.clone(),
                ctx.confidence.validated_by,
                format!(
                    "{} rule on {}.{} joined by {}",
                    rule.validation_type,
                    rule.form_name,
                    rule.field_reference,
                    join.describe()
                ),
            )
            .with_evidence(
                Evidence::file(file.path.clone())
                    .at_line(rule.line)
                    .with_detail(format!("{}:{}", rule.form_name, rule.field_reference)),
            ),
        );
    }
    out.add_entity(entity);
    Ok(())
}

/// A route without a dispatch method accepts any method-restricted rule.
fn dispatches_to(route: &RouteAttributes, action_method: Option<&str>) -> bool {
    match (action_method, route.method.as_deref()) {
        (Some(wanted), Some(actual)) if !wanted.is_empty() => wanted == actual,
        _ => true,
    }
}

fn routes_where(ctx: &LinkContext<'_>, pred: impl Fn(&RouteAttributes) -> bool) -> Vec<String> {
    ctx.routes
        .values()
        .filter(|route| route.as_route().is_some_and(&pred))
        .map(|route| route.id.clone())
        .collect()
}

fn is_validation_file(path: &str) -> bool {
    let name = path.replace('\\', "/");
    let name = name.rsplit('/').next().unwrap_or_default().to_ascii_lowercase();
    name.ends_with(".xml") && name.starts_with("validation")
}

fn parent_dir(path: &str) -> &str {
    path.rfind(['/', '\\']).map(|idx| &path[..idx]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkConfidence;
    use legacymap_model::{CodeMapping, ConfigDetails, FileDetails, SourceInventory};

    fn route(path: &str, config: &str, form: Option<&str>, method: &str) -> Entity {
        Entity::route(RouteAttributes {
            framework: "struts".to_string(),
            path: path.to_string(),
            controller: Some("com.acme.Action".to_string()),
            method: Some(method.to_string()),
            form_name: form.map(str::to_string),
            config_file: Some(config.to_string()),
            mapping_type: Some(ACTION_MAPPING.to_string()),
            ..Default::default()
        })
    }

    fn rule(form: &str, field: &str, action_method: Option<&str>) -> ValidationRule {
        ValidationRule {
            form_name: form.to_string(),
            field_reference: field.to_string(),
            validation_type: "required".to_string(),
            framework: "commons-validator".to_string(),
            action_method: action_method.map(str::to_string),
            line: Some(8),
            ..Default::default()
        }
    }

    fn config_file(
        path: &str,
        rules: Vec<ValidationRule>,
        mappings: Vec<CodeMapping>,
    ) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            details: FileDetails::Config(ConfigDetails {
                validation_rules: rules,
                code_mappings: mappings,
            }),
        }
    }

    fn run(routes: Vec<Entity>, path: &str, rules: Vec<ValidationRule>) -> LinkOutput {
        let mut inventory = SourceInventory::default();
        inventory.push_file("web", "config", config_file(path, rules, vec![]));
        run_inventory(routes, &inventory)
    }

    fn run_inventory(routes: Vec<Entity>, inventory: &SourceInventory) -> LinkOutput {
        let routes: BTreeMap<_, _> = routes.into_iter().map(|r| (r.id.clone(), r)).collect();
        let confidence = LinkConfidence::default();
        BusinessRulesLinker.apply(&LinkContext {
            routes: &routes,
            inventory,
            confidence: &confidence,
        })
    }

    #[test]
    fn same_directory_fallback_is_reported() {
        let out = run(
            vec![route("/a", "WEB-INF/struts-config.xml", None, "execute")],
            "WEB-INF/validation.xml",
            vec![rule("OrphanForm", "email", None)],
        );
        assert_eq!(out.relations.len(), 1);
        assert_eq!(out.relations[0].from_id, "route__a_ANY");
        assert!(out
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::MappingFallback));
    }

    #[test]
    fn action_method_filters_candidates() {
        let out = run(
            vec![
                route("/user/save", "WEB-INF/struts-config.xml", Some("UserForm"), "save"),
                route("/user/delete", "WEB-INF/struts-config.xml", Some("UserForm"), "delete"),
            ],
            "WEB-INF/validation.xml",
            vec![rule("UserForm", "name", Some("save"))],
        );
        let targets: Vec<_> = out.relations.iter().map(|r| r.from_id.as_str()).collect();
        assert_eq!(targets, vec!["route__user_save_ANY"]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn same_directory_fallback_skips_servlet_routes() {
        let mount = Entity::route(RouteAttributes {
            framework: "servlet".to_string(),
            path: "/api/*".to_string(),
            config_file: Some("WEB-INF/web.xml".to_string()),
            mapping_type: Some("servlet_mapping".to_string()),
            is_mount: true,
            ..Default::default()
        });
        let out = run(
            vec![mount, route("/user/save", "WEB-INF/struts-config.xml", None, "save")],
            "WEB-INF/validation.xml",
            vec![rule("OrphanForm", "email", None)],
        );
        let targets: Vec<_> = out.relations.iter().map(|r| r.from_id.as_str()).collect();
        assert_eq!(targets, vec!["route__user_save_ANY"]);
        assert!(out
            .warnings
            .iter()
            .all(|w| w.code != WarningCode::MappingAmbiguity));
    }

    #[test]
    fn shared_form_links_every_route_and_reports_ambiguity() {
        let out = run(
            vec![
                route("/user/save", "WEB-INF/struts-config.xml", Some("UserForm"), "save"),
                route("/user/update", "WEB-INF/struts-config.xml", Some("UserForm"), "update"),
            ],
            "WEB-INF/validation.xml",
            vec![rule("UserForm", "name", None)],
        );
        let targets: Vec<_> = out.relations.iter().map(|r| r.from_id.as_str()).collect();
        assert_eq!(targets, vec!["route__user_save_ANY", "route__user_update_ANY"]);
        let codes: Vec<_> = out.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::MappingAmbiguity]);
        assert_eq!(out.warnings[0].subject.as_deref(), Some("rule_UserForm_name_required"));
    }

    #[test]
    fn form_declared_by_a_second_mapping_of_a_known_route_joins() {
        // The graph kept the module declaration of /user/save, which names no form.
        let known = route("/user/save", "WEB-INF/modules/a/struts-a.xml", None, "save");
        let mut attributes = BTreeMap::new();
        attributes.insert("form_name".to_string(), "UserForm".to_string());
        attributes.insert("method".to_string(), "save".to_string());
        let redeclared = CodeMapping {
            mapping_type: ACTION_MAPPING.to_string(),
            framework: "struts".to_string(),
            from_reference: "/user/save".to_string(),
            to_reference: "com.acme.Action".to_string(),
            attributes,
            line: Some(14),
        };

        let mut inventory = SourceInventory::default();
        inventory.push_file(
            "web",
            "b",
            config_file("WEB-INF/modules/b/struts-b.xml", vec![], vec![redeclared]),
        );
        inventory.push_file(
            "web",
            "config",
            config_file("WEB-INF/validation.xml", vec![rule("UserForm", "email", None)], vec![]),
        );

        let out = run_inventory(vec![known], &inventory);
        let targets: Vec<_> = out.relations.iter().map(|r| r.from_id.as_str()).collect();
        assert_eq!(targets, vec!["route__user_save_ANY"]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn ambiguous_fallback_picks_first_by_id() {
        let out = run(
            vec![
                route("/b", "conf/struts-config.xml", None, "execute"),
                route("/a", "conf/struts-config.xml", None, "execute"),
            ],
            "conf/struts-config.xml",
            vec![rule("NoSuchForm", "id", None)],
        );
        assert_eq!(out.relations.len(), 1);
        assert_eq!(out.relations[0].from_id, "route__a_ANY");
        let codes: Vec<_> = out.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::MappingAmbiguity, WarningCode::MappingFallback]);
    }

    #[test]
    fn empty_route_set_warns_and_malformed_rules_fail() {
        let out = run(
            vec![],
            "WEB-INF/validation.xml",
            vec![rule("UserForm", "", None), rule("UserForm", "name", None)],
        );
        assert_eq!(out.warnings[0].code, WarningCode::LinkerOrder);
        assert_eq!(out.failures.len(), 1);
        assert!(out.relations.is_empty());
        assert!(out.entities.contains_key("rule_UserForm_name_required"));
    }
}

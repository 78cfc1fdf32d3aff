//! Integration tests for the complete legacymap pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Inventory → linkers → registry → classifier → filter → traces → gates
//! - Graph document JSON → structural re-check
//!
//! Run with: cargo test --test integration_tests

use approx::assert_relative_eq;
use legacymap_assemble::{assemble, check_document, AssemblyConfig, Diagnostics, GraphDocument};
use legacymap_ingest::WarningCode;
use legacymap_model::{
    jsp_id, method_id, role_id, route_id, rule_id, Annotation, CodeMapping, ConfigDetails,
    FileDetails, FunctionType, IncludeKind, JavaClass, JavaDetails, JavaMethodDecl, JspDetails,
    RelationKind, SourceFile, SourceInventory, SqlStatement, ValidationRule, ViewInclude,
};
use std::collections::BTreeMap;

fn annotation(name: &str, value: Option<&str>) -> Annotation {
    Annotation {
        name: name.to_string(),
        value: value.map(str::to_string),
        attributes: BTreeMap::new(),
    }
}

fn mapping(kind: &str, from: &str, to: &str, attributes: &[(&str, &str)]) -> CodeMapping {
    CodeMapping {
        mapping_type: kind.to_string(),
        framework: String::new(),
        from_reference: from.to_string(),
        to_reference: to.to_string(),
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        line: None,
    }
}

fn config_file(path: &str, mappings: Vec<CodeMapping>, rules: Vec<ValidationRule>) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        details: FileDetails::Config(ConfigDetails {
            validation_rules: rules,
            code_mappings: mappings,
        }),
    }
}

fn jsp_file(path: &str, includes: Vec<ViewInclude>) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        details: FileDetails::Jsp(JspDetails {
            includes,
            ..Default::default()
        }),
    }
}

/// A shop with a Jersey servlet mount, one JAX-RS resource, one Struts admin action
/// with validation and security, and an admin page that includes a menu.
fn shop_inventory() -> SourceInventory {
    let mut inventory = SourceInventory::default();

    inventory.push_file(
        "shop",
        "web",
        config_file(
            "src/main/webapp/WEB-INF/web.xml",
            vec![
                mapping(
                    "servlet_mapping",
                    "/api/*",
                    "org.glassfish.jersey.servlet.ServletContainer",
                    &[],
                ),
                mapping("security_constraint", "/admin/*", "admin", &[]),
            ],
            Vec::new(),
        ),
    );
    inventory.push_file(
        "shop",
        "web",
        config_file(
            "src/main/webapp/WEB-INF/struts-config.xml",
            vec![mapping(
                "action_mapping",
                "/admin/users/save",
                "com.shop.admin.UserAction",
                &[
                    ("form_name", "UserForm"),
                    ("method", "save"),
                    ("input", "/admin/user_edit.jsp"),
                ],
            )],
            Vec::new(),
        ),
    );
    inventory.push_file(
        "shop",
        "web",
        config_file(
            "src/main/webapp/WEB-INF/validation.xml",
            Vec::new(),
            vec![ValidationRule {
                form_name: "UserForm".to_string(),
                field_reference: "email".to_string(),
                validation_type: "required".to_string(),
                framework: "struts".to_string(),
                ..Default::default()
            }],
        ),
    );

    inventory.push_file(
        "shop",
        "orders",
        SourceFile {
            path: "src/main/java/com/shop/api/OrderResource.java".to_string(),
            details: FileDetails::Java(JavaDetails {
                package: Some("com.shop.api".to_string()),
                classes: vec![JavaClass {
                    name: "OrderResource".to_string(),
                    annotations: vec![annotation("javax.ws.rs.Path", Some("orders"))],
                    methods: vec![JavaMethodDecl {
                        name: "find".to_string(),
                        annotations: vec![
                            annotation("GET", None),
                            annotation("Path", Some("{id}")),
                        ],
                        sql_statements: vec![SqlStatement {
                            operation: "SELECT".to_string(),
                            tables: vec!["shop.ORDERS".to_string()],
                            line: Some(41),
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
        },
    );

    inventory.push_file(
        "shop",
        "web",
        jsp_file(
            "src/main/webapp/admin/user_edit.jsp",
            vec![ViewInclude {
                path: "/common/menu.jsp".to_string(),
                kind: IncludeKind::Include,
                line: Some(3),
            }],
        ),
    );
    inventory.push_file("shop", "web", jsp_file("src/main/webapp/common/menu.jsp", Vec::new()));
    inventory
}

fn has_relation(doc: &GraphDocument, from: &str, kind: RelationKind, to: &str) -> bool {
    doc.relations
        .iter()
        .any(|r| r.from_id == from && r.kind == kind && r.to_id == to)
}

#[test]
fn test_shop_graph_links_every_framework() {
    let mut diagnostics = Diagnostics::new();
    let doc = assemble(&shop_inventory(), &AssemblyConfig::default(), &mut diagnostics)
        .expect("shop graph passes the default gate");

    let mount = route_id("/api/*", "ANY");
    let orders = route_id("/api/orders/{id}", "GET");
    let save = route_id("/admin/users/save", "ANY");

    // JAX-RS under the servlet mount.
    assert!(has_relation(
        &doc,
        &orders,
        RelationKind::HandlesRoute,
        &method_id(Some("com.shop.api"), "OrderResource", "find")
    ));
    assert!(has_relation(&doc, &orders, RelationKind::MountedUnder, &mount));
    assert!(has_relation(
        &doc,
        &method_id(Some("com.shop.api"), "OrderResource", "find"),
        RelationKind::ReadsFrom,
        "table_orders"
    ));

    // Struts action: form rule, security and input view.
    assert!(has_relation(
        &doc,
        &save,
        RelationKind::ValidatedBy,
        &rule_id("UserForm", "email", "required")
    ));
    assert!(has_relation(&doc, &save, RelationKind::SecuredBy, &role_id("admin")));
    assert!(!has_relation(&doc, &orders, RelationKind::SecuredBy, &role_id("admin")));
    assert!(has_relation(&doc, &save, RelationKind::Renders, &jsp_id("/admin/user_edit.jsp")));

    assert_eq!(doc.stats.routes_total, 3);
    assert_relative_eq!(doc.stats.config_parse_success_pct, 1.0);
    assert_eq!(doc.stats.plugin_failures, 0);
    assert_eq!(diagnostics.count(WarningCode::MappingFallback), 0);
    assert_eq!(diagnostics.count(WarningCode::LinkerOrder), 0);
}

#[test]
fn test_shop_trace_follows_the_include_chain() {
    let doc = assemble(&shop_inventory(), &AssemblyConfig::default(), &mut Diagnostics::new())
        .expect("assemble");

    let save = route_id("/admin/users/save", "ANY");
    let traces: Vec<_> = doc.traces_for_route(&save).collect();
    assert_eq!(traces.len(), 1);
    let trace = traces[0];
    assert_eq!(
        trace.path,
        vec![
            save.clone(),
            method_id(Some("com.shop.admin"), "UserAction", "save"),
            jsp_id("/admin/user_edit.jsp"),
            jsp_id("/common/menu.jsp"),
        ]
    );
    assert!(trace.tables.is_empty());
    assert_relative_eq!(trace.confidence, 0.65);

    // Only the struts route renders a screen.
    assert_eq!(doc.traces.len(), 1);
}

#[test]
fn test_shop_screens_are_classified() {
    let doc = assemble(&shop_inventory(), &AssemblyConfig::default(), &mut Diagnostics::new())
        .expect("assemble");

    let classification = |web_path: &str| {
        doc.entities
            .iter()
            .find(|e| e.id == jsp_id(web_path))
            .and_then(|e| e.as_jsp())
            .and_then(|attrs| attrs.classification.clone())
            .expect("classified screen")
    };

    let menu = classification("/common/menu.jsp");
    assert_eq!(menu.function_type, FunctionType::MenuNavigation);
    assert!(menu.is_component);

    let edit = classification("/admin/user_edit.jsp");
    assert_eq!(edit.function_type, FunctionType::BusinessScreen);
    assert!(!edit.is_component);
}

#[test]
fn test_shop_document_round_trips_and_rechecks() {
    let config = AssemblyConfig::default();
    let doc = assemble(&shop_inventory(), &config, &mut Diagnostics::new()).expect("assemble");
    let json = doc.to_json_pretty().expect("serialize");

    let parsed = GraphDocument::from_json_str(&json).expect("parse");
    assert_eq!(parsed.digest, doc.digest);
    assert_eq!(parsed.recompute_digest(), doc.digest);

    let stats = check_document(&parsed, &config).expect("re-check");
    assert_eq!(stats.routes_total, doc.stats.routes_total);
    assert_eq!(stats.traces_total, doc.traces.len());
}

#[test]
fn test_linker_subset_is_respected() {
    let config = AssemblyConfig {
        linkers: vec![
            legacymap_ingest::LinkerKind::JspScreens,
            legacymap_ingest::LinkerKind::ServletStruts,
        ],
        ..Default::default()
    };
    let doc = assemble(&shop_inventory(), &config, &mut Diagnostics::new()).expect("assemble");

    assert!(!doc.relations.iter().any(|r| r.kind == RelationKind::ValidatedBy));
    assert!(!doc.relations.iter().any(|r| r.kind == RelationKind::SecuredBy));
    assert_eq!(doc.stats.linker_counts.len(), 2);
    assert_eq!(doc.stats.routes_total, 2);
}

//! Entities: routes, handlers, screens, tables and the rest of the application model.

use crate::ids;
use crate::FileRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Route,
    JavaMethod,
    #[serde(rename = "JSP")]
    Jsp,
    Table,
    Rule,
    Role,
    Procedure,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Route,
        EntityKind::JavaMethod,
        EntityKind::Jsp,
        EntityKind::Table,
        EntityKind::Rule,
        EntityKind::Role,
        EntityKind::Procedure,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Route => "Route",
            EntityKind::JavaMethod => "JavaMethod",
            EntityKind::Jsp => "JSP",
            EntityKind::Table => "Table",
            EntityKind::Rule => "Rule",
            EntityKind::Role => "Role",
            EntityKind::Procedure => "Procedure",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteAttributes {
    /// `servlet`, `struts`, `jaxrs`, ...
    pub framework: String,
    pub http_method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    /// Fully qualified controller class, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Form bean declared by the action mapping (Struts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    /// Configuration file that declared the route (`struts-config.xml`, `web.xml`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    /// Code-mapping record type that declared the route (`action_mapping`,
    /// `servlet_mapping`); unset for annotation-discovered routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_type: Option<String>,
    /// Servlet url-pattern ending in `/*`; other routes may be mounted under it.
    #[serde(default)]
    pub is_mount: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub class: String,
    pub method: String,
}

impl MethodAttributes {
    pub fn qualified_class(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.class),
            None => self.class.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    MenuNavigation,
    Fragment,
    ErrorUtility,
    AdminSetup,
    ReportDashboard,
    DialogModal,
    BusinessScreen,
}

impl FunctionType {
    pub const fn label(self) -> &'static str {
        match self {
            FunctionType::MenuNavigation => "menu_navigation",
            FunctionType::Fragment => "fragment",
            FunctionType::ErrorUtility => "error_utility",
            FunctionType::AdminSetup => "admin_setup",
            FunctionType::ReportDashboard => "report_dashboard",
            FunctionType::DialogModal => "dialog_modal",
            FunctionType::BusinessScreen => "business_screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiComplexity {
    Simple,
    Medium,
    Complex,
}

/// Functional classification of a JSP screen (see `legacymap_ingest::classifier`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JspClassification {
    pub function_type: FunctionType,
    pub is_component: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_complexity: Option<UiComplexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_domain: Option<String>,
    #[serde(default)]
    pub has_forms: bool,
    #[serde(default)]
    pub has_security: bool,
    pub classification_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JspAttributes {
    /// Web-root relative path (`/jsp/users/list.jsp`).
    pub web_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<JspClassification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableAttributes {
    /// Name as first observed (may carry a schema prefix).
    pub qualified_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleAttributes {
    pub form_name: String,
    pub field_reference: String,
    pub validation_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    pub framework: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleAttributes {
    /// `web.xml`, `annotation`, ...
    pub declared_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcedureAttributes {
    pub qualified_name: String,
}

/// Per-kind structured attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindAttributes {
    Route(RouteAttributes),
    JavaMethod(MethodAttributes),
    Jsp(JspAttributes),
    Table(TableAttributes),
    Rule(RuleAttributes),
    Role(RoleAttributes),
    Procedure(ProcedureAttributes),
}

impl KindAttributes {
    pub const fn kind(&self) -> EntityKind {
        match self {
            KindAttributes::Route(_) => EntityKind::Route,
            KindAttributes::JavaMethod(_) => EntityKind::JavaMethod,
            KindAttributes::Jsp(_) => EntityKind::Jsp,
            KindAttributes::Table(_) => EntityKind::Table,
            KindAttributes::Rule(_) => EntityKind::Rule,
            KindAttributes::Role(_) => EntityKind::Role,
            KindAttributes::Procedure(_) => EntityKind::Procedure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    pub attributes: KindAttributes,
    /// Framework-specific extras that have no typed home yet.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(default)]
    pub source_refs: Vec<FileRef>,
}

impl Entity {
    /// The kind is always taken from the attribute variant.
    pub fn new(id: impl Into<String>, name: impl Into<String>, attributes: KindAttributes) -> Self {
        Self {
            id: id.into(),
            kind: attributes.kind(),
            name: name.into(),
            attributes,
            extra: BTreeMap::new(),
            source_refs: Vec::new(),
        }
    }

    pub fn route(attrs: RouteAttributes) -> Self {
        let path = ids::normalize_path(&attrs.path);
        let verb = ids::normalize_verb(&attrs.http_method);
        let attrs = RouteAttributes {
            path: path.clone(),
            http_method: verb.clone(),
            ..attrs
        };
        Self::new(
            ids::route_id(&path, &verb),
            format!("{verb} {path}"),
            KindAttributes::Route(attrs),
        )
    }

    pub fn java_method(package: Option<&str>, class: &str, method: &str) -> Self {
        let package = package.map(str::trim).filter(|p| !p.is_empty());
        Self::new(
            ids::method_id(package, class, method),
            format!("{class}#{method}"),
            KindAttributes::JavaMethod(MethodAttributes {
                package: package.map(str::to_string),
                class: class.to_string(),
                method: method.to_string(),
            }),
        )
    }

    pub fn jsp(web_path: &str) -> Self {
        let web_path = ids::normalize_path(web_path);
        let name = web_path
            .rsplit('/')
            .next()
            .unwrap_or(web_path.as_str())
            .to_string();
        Self::new(
            ids::jsp_id(&web_path),
            name,
            KindAttributes::Jsp(JspAttributes {
                web_path,
                classification: None,
            }),
        )
    }

    pub fn table(name: &str) -> Self {
        let name = name.trim();
        let simple = name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase();
        Self::new(
            ids::table_id(&simple),
            simple,
            KindAttributes::Table(TableAttributes {
                qualified_name: name.to_string(),
            }),
        )
    }

    pub fn procedure(name: &str) -> Self {
        let name = name.trim();
        Self::new(
            ids::procedure_id(name),
            name.to_string(),
            KindAttributes::Procedure(ProcedureAttributes {
                qualified_name: name.to_string(),
            }),
        )
    }

    pub fn role(name: &str, declared_by: &str) -> Self {
        let name = name.trim();
        Self::new(
            ids::role_id(name),
            name.to_string(),
            KindAttributes::Role(RoleAttributes {
                declared_by: declared_by.to_string(),
            }),
        )
    }

    pub fn rule(attrs: RuleAttributes) -> Self {
        let id = ids::rule_id(&attrs.form_name, &attrs.field_reference, &attrs.validation_type);
        let name = format!(
            "{}.{} ({})",
            attrs.form_name, attrs.field_reference, attrs.validation_type
        );
        Self::new(id, name, KindAttributes::Rule(attrs))
    }

    pub fn with_source(mut self, source: FileRef) -> Self {
        if !self.source_refs.contains(&source) {
            self.source_refs.push(source);
        }
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn as_route(&self) -> Option<&RouteAttributes> {
        match &self.attributes {
            KindAttributes::Route(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodAttributes> {
        match &self.attributes {
            KindAttributes::JavaMethod(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_jsp(&self) -> Option<&JspAttributes> {
        match &self.attributes {
            KindAttributes::Jsp(attrs) => Some(attrs),
            _ => None,
        }
    }
}

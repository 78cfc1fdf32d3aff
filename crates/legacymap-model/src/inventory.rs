//! Normalized source inventory (input contract).
//!
//! These records are produced by the external parsing stage: files grouped by
//! source location and subdomain, each carrying a `details` payload tagged by
//! file kind. Field aliases accept the spellings different parsers emit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceInventory {
    #[serde(default)]
    pub locations: Vec<SourceLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub name: String,
    #[serde(default)]
    pub subdomains: Vec<Subdomain>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subdomain {
    pub name: String,
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub details: FileDetails,
}

/// One per-file record as stored on disk when the inventory is split into files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(default = "default_group")]
    pub location: String,
    #[serde(default = "default_group")]
    pub subdomain: String,
    pub file: SourceFile,
}

fn default_group() -> String {
    "default".to_string()
}

impl SourceInventory {
    /// Append a file under `location`/`subdomain`, creating the groups on first use.
    pub fn push_file(&mut self, location: &str, subdomain: &str, file: SourceFile) {
        let loc_idx = match self.locations.iter().position(|l| l.name == location) {
            Some(idx) => idx,
            None => {
                self.locations.push(SourceLocation {
                    name: location.to_string(),
                    subdomains: Vec::new(),
                });
                self.locations.len() - 1
            }
        };
        let loc = &mut self.locations[loc_idx];
        let sub_idx = match loc.subdomains.iter().position(|s| s.name == subdomain) {
            Some(idx) => idx,
            None => {
                loc.subdomains.push(Subdomain {
                    name: subdomain.to_string(),
                    files: Vec::new(),
                });
                loc.subdomains.len() - 1
            }
        };
        loc.subdomains[sub_idx].files.push(file);
    }

    pub fn from_records(records: impl IntoIterator<Item = InventoryRecord>) -> Self {
        let mut inventory = Self::default();
        for record in records {
            inventory.push_file(&record.location, &record.subdomain, record.file);
        }
        inventory
    }

    /// All files, in inventory order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.locations
            .iter()
            .flat_map(|l| l.subdomains.iter())
            .flat_map(|s| s.files.iter())
    }

    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    pub fn java_files(&self) -> Vec<(&SourceFile, &JavaDetails)> {
        self.files()
            .filter_map(|f| match &f.details {
                FileDetails::Java(d) => Some((f, d)),
                _ => None,
            })
            .collect()
    }

    pub fn jsp_files(&self) -> Vec<(&SourceFile, &JspDetails)> {
        self.files()
            .filter_map(|f| match &f.details {
                FileDetails::Jsp(d) => Some((f, d)),
                _ => None,
            })
            .collect()
    }

    pub fn config_files(&self) -> Vec<(&SourceFile, &ConfigDetails)> {
        self.files()
            .filter_map(|f| match &f.details {
                FileDetails::Config(d) => Some((f, d)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileDetails {
    Java(JavaDetails),
    Jsp(JspDetails),
    Config(ConfigDetails),
    Other,
}

// ============================================================================
// Java
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JavaDetails {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub classes: Vec<JavaClass>,
    #[serde(default)]
    pub rest_endpoints: Vec<RestEndpoint>,
    #[serde(default)]
    pub code_mappings: Vec<CodeMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JavaClass {
    pub name: String,
    /// Falls back to the file-level package when absent.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub methods: Vec<JavaMethodDecl>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotation {
    /// Simple or qualified name, without `@` (`Path`, `javax.ws.rs.GET`).
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    /// Simple name without package or leading `@`.
    pub fn simple_name(&self) -> &str {
        let name = self.name.trim().trim_start_matches('@');
        name.rsplit('.').next().unwrap_or(name)
    }

    /// `value`, or the `value` attribute.
    pub fn value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .or_else(|| self.attributes.get("value").map(String::as_str))
            .map(|v| v.trim().trim_matches('"'))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JavaMethodDecl {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub sql_statements: Vec<SqlStatement>,
    #[serde(default)]
    pub procedure_calls: Vec<ProcedureCall>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlStatement {
    /// `SELECT`, `INSERT`, `UPDATE`, `DELETE`, ...
    pub operation: String,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureCall {
    pub name: String,
    #[serde(default)]
    pub line: Option<u32>,
}

/// Endpoint metadata extracted by the upstream parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestEndpoint {
    #[serde(default, alias = "full_path")]
    pub path: Option<String>,
    #[serde(default)]
    pub class_path: Option<String>,
    #[serde(default)]
    pub method_path: Option<String>,
    #[serde(default, alias = "verb")]
    pub http_method: Option<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default, alias = "class")]
    pub controller: Option<String>,
    #[serde(default, alias = "java_method")]
    pub method_name: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

/// A framework mapping record (`action_mapping`, `servlet_mapping`, `rest_endpoint`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMapping {
    pub mapping_type: String,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub from_reference: String,
    #[serde(default)]
    pub to_reference: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub line: Option<u32>,
}

impl CodeMapping {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

// ============================================================================
// JSP
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JspDetails {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub form_elements: Vec<FormElement>,
    #[serde(default)]
    pub embedded_code: Vec<String>,
    #[serde(default)]
    pub includes: Vec<ViewInclude>,
    /// Pattern category (`security`, `menu`, ...) → matched strings.
    #[serde(default)]
    pub pattern_hits: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub sql_statements: Vec<SqlStatement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormElement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    /// `<%@ include file=... %>`
    Include,
    /// `<jsp:include page=...>`
    JspInclude,
    Iframe,
    Forward,
    Redirect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewInclude {
    pub path: String,
    #[serde(default = "default_include_kind")]
    pub kind: IncludeKind,
    #[serde(default)]
    pub line: Option<u32>,
}

fn default_include_kind() -> IncludeKind {
    IncludeKind::Include
}

// ============================================================================
// Configuration (struts-config.xml, validation.xml, web.xml, mybatis mappers)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDetails {
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub code_mappings: Vec<CodeMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    pub form_name: String,
    pub field_reference: String,
    pub validation_type: String,
    #[serde(default)]
    pub validation_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub framework: String,
    #[serde(default)]
    pub validation_source: Option<String>,
    /// Dispatch method the rule is limited to, when declared.
    #[serde(default)]
    pub action_method: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_endpoint_accepts_alias_fields() {
        let ep: RestEndpoint = serde_json::from_str(
            r#"{"full_path": "/api/users", "verb": "GET", "class": "com.acme.Users", "java_method": "list"}"#,
        )
        .unwrap();
        assert_eq!(ep.path.as_deref(), Some("/api/users"));
        assert_eq!(ep.http_method.as_deref(), Some("GET"));
        assert_eq!(ep.controller.as_deref(), Some("com.acme.Users"));
        assert_eq!(ep.method_name.as_deref(), Some("list"));
    }

    #[test]
    fn records_are_grouped_in_first_seen_order() {
        let file = |path: &str| SourceFile {
            path: path.to_string(),
            details: FileDetails::Other,
        };
        let inventory = SourceInventory::from_records(vec![
            InventoryRecord {
                location: "web".into(),
                subdomain: "users".into(),
                file: file("a.jsp"),
            },
            InventoryRecord {
                location: "core".into(),
                subdomain: "orders".into(),
                file: file("b.java"),
            },
            InventoryRecord {
                location: "web".into(),
                subdomain: "users".into(),
                file: file("c.jsp"),
            },
        ]);

        assert_eq!(inventory.locations.len(), 2);
        let paths: Vec<_> = inventory.files().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.jsp", "c.jsp", "b.java"]);
    }

    #[test]
    fn annotation_names_are_simplified() {
        let a = Annotation {
            name: "@javax.ws.rs.Path".to_string(),
            value: Some("\"/users\"".to_string()),
            attributes: BTreeMap::new(),
        };
        assert_eq!(a.simple_name(), "Path");
        assert_eq!(a.value(), Some("/users"));
    }

    #[test]
    fn details_are_tagged_by_kind() {
        let f: SourceFile = serde_json::from_str(
            r#"{"path": "WEB-INF/validation.xml", "details": {"kind": "config", "validation_rules": []}}"#,
        )
        .unwrap();
        assert!(matches!(f.details, FileDetails::Config(_)));
    }
}

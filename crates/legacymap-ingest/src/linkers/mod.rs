//! Linker plugins.
//!
//! A linker is a pure function over `(current routes, source inventory)` that
//! returns new entities and relations. Linkers never see each other's private
//! state; later linkers only observe earlier ones through the route snapshot the
//! assembler hands them.
//!
//! The plugin set is the closed `LinkerKind` enum, run in the configured order.
//! Within a linker, per-file work is mapped in parallel and reduced sequentially
//! in inventory order, so output order does not depend on scheduling.

pub mod business_rules;
pub mod data_access;
pub mod jaxrs;
pub mod routing;
pub mod screens;
pub mod security;
pub mod view_render;

use crate::{LinkFailure, Warning};
use legacymap_model::{ids, Entity, Relation, SourceFile, SourceInventory};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub use business_rules::BusinessRulesLinker;
pub use data_access::DataAccessLinker;
pub use jaxrs::JaxRsLinker;
pub use routing::ServletStrutsLinker;
pub use screens::JspScreenLinker;
pub use security::SecurityLinker;
pub use view_render::ViewRenderLinker;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum LinkError {
    #[error("malformed {record} record: {reason}")]
    MalformedRecord { record: &'static str, reason: String },
    #[error("unsupported HTTP method `{0}`")]
    UnsupportedVerb(String),
    #[error("unresolvable member reference `{0}` (expected package.Class.method)")]
    UnresolvableReference(String),
}

impl LinkError {
    pub(crate) fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        LinkError::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }
}

/// The statically known linker plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkerKind {
    JspScreens,
    ServletStruts,
    Jaxrs,
    ViewRender,
    DataAccess,
    Security,
    BusinessRules,
}

impl LinkerKind {
    pub const fn label(self) -> &'static str {
        match self {
            LinkerKind::JspScreens => "jsp_screens",
            LinkerKind::ServletStruts => "servlet_struts",
            LinkerKind::Jaxrs => "jaxrs",
            LinkerKind::ViewRender => "view_render",
            LinkerKind::DataAccess => "data_access",
            LinkerKind::Security => "security",
            LinkerKind::BusinessRules => "business_rules",
        }
    }

    pub fn default_order() -> Vec<LinkerKind> {
        vec![
            LinkerKind::JspScreens,
            LinkerKind::ServletStruts,
            LinkerKind::Jaxrs,
            LinkerKind::ViewRender,
            LinkerKind::DataAccess,
            LinkerKind::Security,
            LinkerKind::BusinessRules,
        ]
    }

    /// Whether the linker joins against routes discovered by earlier linkers.
    pub const fn needs_routes(self) -> bool {
        matches!(
            self,
            LinkerKind::ViewRender | LinkerKind::Security | LinkerKind::BusinessRules
        )
    }

    pub const fn discovers_routes(self) -> bool {
        matches!(self, LinkerKind::ServletStruts | LinkerKind::Jaxrs)
    }

    pub fn plugin(self) -> Box<dyn LinkerPlugin> {
        match self {
            LinkerKind::JspScreens => Box::new(JspScreenLinker),
            LinkerKind::ServletStruts => Box::new(ServletStrutsLinker),
            LinkerKind::Jaxrs => Box::new(JaxRsLinker),
            LinkerKind::ViewRender => Box::new(ViewRenderLinker),
            LinkerKind::DataAccess => Box::new(DataAccessLinker),
            LinkerKind::Security => Box::new(SecurityLinker),
            LinkerKind::BusinessRules => Box::new(BusinessRulesLinker),
        }
    }
}

impl fmt::Display for LinkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Confidence assigned by linkers to the relations they emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfidence {
    pub handles_route: f64,
    pub mounted_under: f64,
    pub validated_by: f64,
    pub renders: f64,
    pub view_link: f64,
    pub data_access: f64,
    pub procedure: f64,
    pub secured_by: f64,
}

impl Default for LinkConfidence {
    fn default() -> Self {
        Self {
            handles_route: 0.9,
            mounted_under: 0.8,
            validated_by: 0.9,
            renders: 0.85,
            view_link: 0.85,
            data_access: 0.9,
            procedure: 0.85,
            secured_by: 0.8,
        }
    }
}

/// Read-only input handed to every linker.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub routes: &'a BTreeMap<String, Entity>,
    pub inventory: &'a SourceInventory,
    pub confidence: &'a LinkConfidence,
}

/// Everything a linker produced. Entity maps keep the first entity seen per id.
#[derive(Debug, Clone, Default)]
pub struct LinkOutput {
    pub entities: BTreeMap<String, Entity>,
    pub relations: Vec<Relation>,
    pub method_entities: BTreeMap<String, Entity>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<LinkFailure>,
    relation_ids: HashSet<String>,
}

impl LinkOutput {
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.entry(entity.id.clone()).or_insert(entity);
    }

    pub fn add_method(&mut self, entity: Entity) {
        self.method_entities
            .entry(entity.id.clone())
            .or_insert(entity);
    }

    pub fn add_relation(&mut self, relation: Relation) {
        if self.relation_ids.insert(relation.id.clone()) {
            self.relations.push(relation);
        }
    }

    pub fn merge(&mut self, other: LinkOutput) {
        for (_, entity) in other.entities {
            self.add_entity(entity);
        }
        for (_, entity) in other.method_entities {
            self.add_method(entity);
        }
        for relation in other.relations {
            self.add_relation(relation);
        }
        self.warnings.extend(other.warnings);
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty() && self.method_entities.is_empty()
    }
}

pub trait LinkerPlugin: Send + Sync {
    fn kind(&self) -> LinkerKind;

    /// Must not assume any other linker ran unless `kind().needs_routes()`.
    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput;
}

/// Map `link` over files in parallel, then fold results in input order. Failures are
/// logged with file context and recorded instead of aborting the linker.
pub(crate) fn link_files<D, F>(
    linker: LinkerKind,
    files: &[(&SourceFile, &D)],
    link: F,
) -> LinkOutput
where
    D: Sync,
    F: Fn(&SourceFile, &D) -> Result<LinkOutput, LinkError> + Sync,
{
    let results: Vec<Result<LinkOutput, LinkError>> = files
        .par_iter()
        .map(|(file, details)| link(*file, *details))
        .collect();

    let mut out = LinkOutput::default();
    for ((file, _), result) in files.iter().zip(results) {
        match result {
            Ok(partial) => out.merge(partial),
            Err(err) => {
                tracing::warn!(
                    linker = %linker,
                    file = %file.path,
                    error = %err,
                    "linker failed on file; continuing"
                );
                out.failures.push(LinkFailure {
                    linker: linker.label().to_string(),
                    file: file.path.clone(),
                    record: None,
                    message: err.to_string(),
                });
            }
        }
    }
    out
}

pub(crate) fn record_failure(
    out: &mut LinkOutput,
    linker: LinkerKind,
    file: &str,
    record: String,
    err: &LinkError,
) {
    tracing::warn!(
        linker = %linker,
        file = %file,
        record = %record,
        error = %err,
        "linker skipped record"
    );
    out.failures.push(LinkFailure {
        linker: linker.label().to_string(),
        file: file.to_string(),
        record: Some(record),
        message: err.to_string(),
    });
}

pub(crate) const HTTP_VERBS: [&str; 7] =
    ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Validate and normalize a verb; empty means `ANY`.
pub(crate) fn checked_verb(verb: Option<&str>) -> Result<String, LinkError> {
    let verb = ids::normalize_verb(verb.unwrap_or(""));
    if verb == "ANY" || HTTP_VERBS.contains(&verb.as_str()) {
        Ok(verb)
    } else {
        Err(LinkError::UnsupportedVerb(verb))
    }
}

const WEB_ROOT_MARKERS: [&str; 4] = ["webapp", "WebContent", "WebRoot", "web"];

/// Web-root relative path of a source file: everything after the last web root
/// directory (`webapp/`, `WebContent/`, ...), or the path itself.
pub fn web_path(file_path: &str) -> String {
    let normalized = file_path.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    let start = segments
        .iter()
        .rposition(|s| WEB_ROOT_MARKERS.contains(s))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    ids::normalize_path(&segments[start..].join("/"))
}

/// Resolve a view reference relative to the referring view. Returns `None` for
/// dynamic targets (EL/scriptlet expressions) and absolute URLs.
pub fn resolve_view_path(from_web_path: &str, target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty()
        || target.contains("${")
        || target.contains("<%")
        || target.contains("://")
    {
        return None;
    }
    let target = target.split(['?', '#']).next().unwrap_or(target);

    let joined = if target.starts_with('/') {
        target.to_string()
    } else {
        let dir = from_web_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("");
        format!("{dir}/{target}")
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    Some(ids::normalize_path(&stack.join("/")))
}

/// Split an annotation/attribute value such as `{"/a", "/b"}` into its items.
pub(crate) fn list_values(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(|v| v.trim().trim_matches('"').trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub(crate) fn is_view_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".jsp", ".jspf", ".jspx", ".html", ".htm"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

//! Stable id derivations.
//!
//! Every id in the graph is a pure function of semantic content. Re-running the
//! pipeline on unchanged input must yield byte-identical ids, so nothing here may
//! consult counters, clocks or hash-map iteration order.

/// Replace every non-alphanumeric character with `_` (after trimming whitespace).
pub fn slug(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Normalize a URL path: leading slash, repeated slashes collapsed, no trailing slash
/// (except for the root path itself).
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for segment in path.trim().split('/').filter(|s| !s.is_empty()) {
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Join path fragments (`base + class_path + method_path`) and normalize the result.
pub fn join_paths(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize_path(&joined)
}

/// Upper-case an HTTP verb; an empty verb means "any method".
pub fn normalize_verb(verb: &str) -> String {
    let verb = verb.trim();
    if verb.is_empty() {
        "ANY".to_string()
    } else {
        verb.to_ascii_uppercase()
    }
}

/// `route_{slug(normalized path)}_{VERB}`.
pub fn route_id(path: &str, verb: &str) -> String {
    format!(
        "route_{}_{}",
        slug(&normalize_path(path)),
        normalize_verb(verb)
    )
}

/// `method_{package}.{class}#{method}` (the package prefix is omitted when unknown).
pub fn method_id(package: Option<&str>, class: &str, method: &str) -> String {
    match package.map(str::trim).filter(|p| !p.is_empty()) {
        Some(package) => format!("method_{package}.{class}#{method}"),
        None => format!("method_{class}#{method}"),
    }
}

pub fn jsp_id(web_path: &str) -> String {
    format!("jsp_{}", slug(&normalize_path(web_path)))
}

pub fn table_id(name: &str) -> String {
    format!("table_{}", slug(&name.to_ascii_lowercase()))
}

pub fn rule_id(form_name: &str, field_reference: &str, validation_type: &str) -> String {
    format!(
        "rule_{}",
        slug(&format!("{form_name}:{field_reference}:{validation_type}"))
    )
}

pub fn role_id(name: &str) -> String {
    format!("role_{}", slug(name))
}

pub fn procedure_id(name: &str) -> String {
    format!("procedure_{}", slug(&name.to_ascii_lowercase()))
}

/// Relation ids are derived from `(from_id, relation label, to_id)`.
pub fn relation_id(from_id: &str, label: &str, to_id: &str) -> String {
    format!("rel::{label}::{from_id}::{to_id}")
}

/// A Java member reference split into `(package, class, member)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedMember {
    pub package: Option<String>,
    pub class: String,
    pub member: String,
}

/// Split `package.Class.method` on the rightmost dot (class vs. method), then split the
/// class part on its rightmost dot (package vs. simple class name).
///
/// `Class#method` is accepted as well.
pub fn split_member_reference(reference: &str) -> Option<QualifiedMember> {
    let reference = reference.trim();
    let (class_part, member) = match reference.rsplit_once('#') {
        Some(split) => split,
        None => reference.rsplit_once('.')?,
    };
    if class_part.is_empty() || member.is_empty() {
        return None;
    }
    let (package, class) = split_class_name(class_part);
    Some(QualifiedMember {
        package,
        class,
        member: member.to_string(),
    })
}

/// Split a (possibly qualified) class name into `(package, simple name)`.
pub fn split_class_name(class_name: &str) -> (Option<String>, String) {
    match class_name.trim().rsplit_once('.') {
        Some((package, class)) if !package.is_empty() => {
            (Some(package.to_string()), class.to_string())
        }
        _ => (None, class_name.trim().to_string()),
    }
}

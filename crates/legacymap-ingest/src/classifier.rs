//! Functional classification of JSP screens.
//!
//! Ordered, deterministic rules over the file name plus (when the inventory has
//! them) structural details of the page:
//!
//! 1. file-name pattern groups, first match wins: menu/navigation, fragment,
//!    error/utility, admin/setup, report/dashboard, dialog/modal;
//! 2. business-domain hint from the path segment after `/jsp/`;
//! 3. structural refinement (forms, security hits, menu hits, UI complexity,
//!    include fan-out), additive.
//!
//! `classification_confidence = min(0.95, 0.7 + sum(boosts))`.

use crate::linkers::web_path;
use legacymap_model::{
    AttributePatch, Entity, FunctionType, IncludeKind, JspClassification, JspDetails,
    SourceInventory, UiComplexity,
};
use regex::Regex;
use std::collections::HashMap;

const BASE_CONFIDENCE: f64 = 0.7;
const MAX_CONFIDENCE: f64 = 0.95;
const SECURITY_BOOST: f64 = 0.1;
const MENU_STRUCTURE_BOOST: f64 = 0.15;
const FAN_OUT_BOOST: f64 = 0.1;
/// More embedded views than this makes the page a component.
const FAN_OUT_LIMIT: usize = 2;
const SIMPLE_BELOW: usize = 5;
const COMPLEX_ABOVE: usize = 20;

struct PatternGroup {
    function_type: FunctionType,
    is_component: bool,
    boost: f64,
    pattern: Regex,
}

/// Name patterns match the snake-cased file stem, with `_` as token separator.
const GROUPS: [(FunctionType, bool, f64, &str); 6] = [
    (
        FunctionType::MenuNavigation,
        true,
        0.3,
        r"(^|_)(menu|nav|navigation|navbar|sidebar|breadcrumbs?|tabs)(_|$)",
    ),
    (
        FunctionType::Fragment,
        true,
        0.25,
        r"(^|_)(header|footer|fragment|include|inc|common|layout|banner|top|bottom)(_|$)",
    ),
    (
        FunctionType::ErrorUtility,
        false,
        0.25,
        r"(^|_)(error|errors|exception|404|500|not_found|access_denied|logout|timeout|blank|loading)(_|$)",
    ),
    (
        FunctionType::AdminSetup,
        false,
        0.2,
        r"(^|_)(admin|setup|config|configuration|settings|maintenance|manage)(_|$)",
    ),
    (
        FunctionType::ReportDashboard,
        false,
        0.2,
        r"(^|_)(report|reports|dashboard|summary|stats|statistics|chart|export)(_|$)",
    ),
    (
        FunctionType::DialogModal,
        true,
        0.15,
        r"(^|_)(dialog|modal|popup|lookup|picker|confirm)(_|$)",
    ),
];

pub struct JspClassifier {
    groups: Vec<PatternGroup>,
}

impl JspClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        let groups = GROUPS
            .iter()
            .map(|&(function_type, is_component, boost, pattern)| {
                Ok(PatternGroup {
                    function_type,
                    is_component,
                    boost,
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { groups })
    }

    /// Classify a JSP by its web path and, when available, its parsed details.
    pub fn classify(&self, web_path: &str, details: Option<&JspDetails>) -> JspClassification {
        let file_name = web_path.rsplit('/').next().unwrap_or(web_path);
        let (stem, extension) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
        let tokens = snake_case(stem);

        let mut boost = 0.0;
        let mut classification = JspClassification {
            function_type: FunctionType::BusinessScreen,
            is_component: false,
            ui_complexity: None,
            business_domain: business_domain(web_path),
            has_forms: false,
            has_security: false,
            classification_confidence: BASE_CONFIDENCE,
        };

        let matched = self
            .groups
            .iter()
            .find(|g| g.pattern.is_match(&tokens))
            .or_else(|| {
                // `.jspf` is the conventional fragment extension.
                extension
                    .eq_ignore_ascii_case("jspf")
                    .then(|| {
                        self.groups
                            .iter()
                            .find(|g| g.function_type == FunctionType::Fragment)
                    })
                    .flatten()
            });
        if let Some(group) = matched {
            classification.function_type = group.function_type;
            classification.is_component = group.is_component;
            boost += group.boost;
        }

        if let Some(details) = details {
            classification.has_forms = !details.form_elements.is_empty();

            if has_hits(details, "security") {
                classification.has_security = true;
                boost += SECURITY_BOOST;
            }

            let menu_structure = has_hits(details, "menu") || has_hits(details, "navigation");
            if menu_structure && classification.function_type == FunctionType::BusinessScreen {
                classification.function_type = FunctionType::MenuNavigation;
                classification.is_component = true;
                boost += MENU_STRUCTURE_BOOST;
            }

            classification.ui_complexity = Some(ui_complexity(details));

            let fan_out = details
                .includes
                .iter()
                .filter(|i| {
                    matches!(
                        i.kind,
                        IncludeKind::Include | IncludeKind::JspInclude | IncludeKind::Iframe
                    )
                })
                .count();
            if fan_out > FAN_OUT_LIMIT {
                classification.is_component = true;
                boost += FAN_OUT_BOOST;
            }
        }

        classification.classification_confidence = (BASE_CONFIDENCE + boost).min(MAX_CONFIDENCE);
        classification
    }

    /// Classification patches for every JSP entity, in the given order. Details are
    /// looked up by web path; JSPs only referenced from elsewhere get name rules only.
    pub fn patches<'a>(
        &self,
        jsps: impl IntoIterator<Item = &'a Entity>,
        inventory: &SourceInventory,
    ) -> Vec<(String, AttributePatch)> {
        let details: HashMap<String, &JspDetails> = inventory
            .jsp_files()
            .into_iter()
            .map(|(file, details)| (web_path(&file.path), details))
            .collect();

        jsps.into_iter()
            .filter_map(|entity| {
                let attrs = entity.as_jsp()?;
                let classification =
                    self.classify(&attrs.web_path, details.get(&attrs.web_path).copied());
                Some((
                    entity.id.clone(),
                    AttributePatch {
                        classification: Some(classification),
                        ..Default::default()
                    },
                ))
            })
            .collect()
    }
}

fn has_hits(details: &JspDetails, category: &str) -> bool {
    details
        .pattern_hits
        .get(category)
        .is_some_and(|hits| !hits.is_empty())
}

fn ui_complexity(details: &JspDetails) -> UiComplexity {
    let weight =
        details.tags.len() + 3 * details.form_elements.len() + 2 * details.embedded_code.len();
    if weight < SIMPLE_BELOW {
        UiComplexity::Simple
    } else if weight > COMPLEX_ABOVE {
        UiComplexity::Complex
    } else {
        UiComplexity::Medium
    }
}

/// First segment after `/jsp/`, when a further segment follows it.
fn business_domain(web_path: &str) -> Option<String> {
    let (_, rest) = web_path.split_once("/jsp/")?;
    let (domain, _) = rest.split_once('/')?;
    (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
}

/// `userListMenu-top` → `user_list_menu_top`.
fn snake_case(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use legacymap_model::{FormElement, ViewInclude};
    use std::collections::BTreeMap;

    fn classifier() -> JspClassifier {
        JspClassifier::new().unwrap()
    }

    #[test]
    fn name_groups_are_ordered() {
        let c = classifier();
        let menu = c.classify("/jsp/common/mainMenu.jsp", None);
        assert_eq!(menu.function_type, FunctionType::MenuNavigation);
        assert!(menu.is_component);
        assert_relative_eq!(menu.classification_confidence, 0.95);

        // "header" and "admin" both match; fragment comes first.
        let header = c.classify("/admin_header.jsp", None);
        assert_eq!(header.function_type, FunctionType::Fragment);

        let plain = c.classify("/jsp/orders/edit/orderEntry.jsp", None);
        assert_eq!(plain.function_type, FunctionType::BusinessScreen);
        assert_eq!(plain.business_domain.as_deref(), Some("orders"));
        assert_relative_eq!(plain.classification_confidence, 0.7);
        assert_eq!(plain.ui_complexity, None);

        let fragment = c.classify("/WEB-INF/parts/address.jspf", None);
        assert_eq!(fragment.function_type, FunctionType::Fragment);

        // Token boundaries: "topic" is not "top".
        assert_eq!(
            c.classify("/topicList.jsp", None).function_type,
            FunctionType::BusinessScreen
        );
    }

    #[test]
    fn structure_refines_and_caps_confidence() {
        let c = classifier();
        let mut hits = BTreeMap::new();
        hits.insert("security".to_string(), vec!["isUserInRole".to_string()]);
        hits.insert("menu".to_string(), vec!["<ul class=\"nav\">".to_string()]);
        let details = JspDetails {
            tags: vec!["c:forEach".to_string(); 6],
            form_elements: vec![FormElement::default(); 2],
            embedded_code: vec!["<% x %>".to_string()],
            includes: (0..3)
                .map(|i| ViewInclude {
                    path: format!("/part{i}.jsp"),
                    kind: IncludeKind::JspInclude,
                    line: None,
                })
                .collect(),
            pattern_hits: hits,
            ..Default::default()
        };

        let result = c.classify("/jsp/users/home.jsp", Some(&details));
        assert!(result.has_forms);
        assert!(result.has_security);
        assert!(result.is_component);
        assert_eq!(result.function_type, FunctionType::MenuNavigation);
        // 6 + 3*2 + 2*1 = 14
        assert_eq!(result.ui_complexity, Some(UiComplexity::Medium));
        // 0.7 + 0.1 + 0.15 + 0.1 = 1.05, capped
        assert_relative_eq!(result.classification_confidence, 0.95);
        assert_eq!(result.business_domain.as_deref(), Some("users"));
    }

    #[test]
    fn complexity_buckets() {
        let details = |tags: usize| JspDetails {
            tags: vec!["t".to_string(); tags],
            ..Default::default()
        };
        assert_eq!(ui_complexity(&details(4)), UiComplexity::Simple);
        assert_eq!(ui_complexity(&details(5)), UiComplexity::Medium);
        assert_eq!(ui_complexity(&details(20)), UiComplexity::Medium);
        assert_eq!(ui_complexity(&details(21)), UiComplexity::Complex);
    }

    #[test]
    fn domain_needs_a_following_segment() {
        assert_eq!(business_domain("/jsp/index.jsp"), None);
        assert_eq!(business_domain("/app/jsp/Billing/list.jsp").as_deref(), Some("billing"));
        assert_eq!(snake_case("userListMenu-top"), "user_list_menu_top");
    }
}

//! JSP screens and the include/embed/redirect wiring between them.

use super::{
    is_view_path, link_files, resolve_view_path, web_path, LinkContext, LinkError, LinkOutput,
    LinkerKind, LinkerPlugin,
};
use legacymap_model::{
    Entity, Evidence, FileRef, IncludeKind, JspDetails, Relation, RelationKind, SourceFile,
};

pub(crate) const PLACEHOLDER: &str = "placeholder";

pub struct JspScreenLinker;

impl LinkerPlugin for JspScreenLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::JspScreens
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let files = ctx.inventory.jsp_files();
        let view_link = ctx.confidence.view_link;
        let mut out = link_files(self.kind(), &files, |file, details| {
            link_screen(file, details, view_link)
        });

        // A screen referenced before its own file was folded in is a placeholder;
        // the declaring file always wins.
        for (file, _) in &files {
            let declared = declared_screen(file);
            let replace = out
                .entities
                .get(&declared.id)
                .map(|e| e.extra.contains_key(PLACEHOLDER))
                .unwrap_or(true);
            if replace {
                out.entities.insert(declared.id.clone(), declared);
            }
        }

        tracing::info!(
            screens = out.entities.len(),
            links = out.relations.len(),
            "linked JSP screens"
        );
        out
    }
}

fn declared_screen(file: &SourceFile) -> Entity {
    Entity::jsp(&web_path(&file.path)).with_source(FileRef::new(file.path.clone()))
}

/// Screen entity for a view referenced by path but not (yet) declared by a file.
pub(crate) fn placeholder_screen(web_path: &str) -> Entity {
    Entity::jsp(web_path).with_extra(PLACEHOLDER, "true")
}

fn link_screen(
    file: &SourceFile,
    details: &JspDetails,
    confidence: f64,
) -> Result<LinkOutput, LinkError> {
    let mut out = LinkOutput::default();
    let screen = declared_screen(file);
    let from_path = web_path(&file.path);

    for include in &details.includes {
        let Some(target_path) = resolve_view_path(&from_path, &include.path) else {
            continue;
        };
        if target_path == from_path || !is_view_path(&target_path) {
            continue;
        }

        let (kind, what) = match include.kind {
            IncludeKind::Include => (RelationKind::IncludesView, "static include"),
            IncludeKind::JspInclude => (RelationKind::EmbedsView, "jsp:include"),
            IncludeKind::Iframe => (RelationKind::EmbedsView, "iframe"),
            IncludeKind::Forward => (RelationKind::RedirectsTo, "jsp:forward"),
            IncludeKind::Redirect => (RelationKind::RedirectsTo, "redirect"),
        };

        let target = placeholder_screen(&target_path);
        out.add_relation(
            Relation::new(
                screen.id.clone(),
                kind,
                target.id.clone(),
                confidence,
                format!("{what} of {target_path}"),
            )
            .with_evidence(
                Evidence::file(file.path.clone())
                    .at_line(include.line)
                    .with_detail(include.path.clone()),
            ),
        );
        out.add_entity(target);
    }

    out.add_entity(screen);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use legacymap_model::{FileDetails, SourceInventory, ViewInclude};
    use std::collections::BTreeMap;

    fn jsp(path: &str, includes: Vec<(&str, IncludeKind)>) -> SourceFile {
        SourceFile {
            path: path.to_string(),
            details: FileDetails::Jsp(JspDetails {
                includes: includes
                    .into_iter()
                    .map(|(p, kind)| ViewInclude {
                        path: p.to_string(),
                        kind,
                        line: Some(3),
                    })
                    .collect(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn includes_become_typed_view_links() {
        let mut inventory = SourceInventory::default();
        inventory.push_file(
            "web",
            "users",
            jsp(
                "webapp/jsp/users/list.jsp",
                vec![
                    ("../common/header.jsp", IncludeKind::Include),
                    ("/menu.jsp", IncludeKind::JspInclude),
                    ("detail.jsp", IncludeKind::Forward),
                    ("${dynamic}", IncludeKind::Include),
                ],
            ),
        );
        inventory.push_file("web", "common", jsp("webapp/jsp/common/header.jsp", vec![]));

        let routes = BTreeMap::new();
        let confidence = Default::default();
        let out = JspScreenLinker.apply(&LinkContext {
            routes: &routes,
            inventory: &inventory,
            confidence: &confidence,
        });

        let kinds: Vec<_> = out
            .relations
            .iter()
            .map(|r| (r.kind, r.to_id.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (RelationKind::IncludesView, "jsp__jsp_common_header_jsp"),
                (RelationKind::EmbedsView, "jsp__menu_jsp"),
                (RelationKind::RedirectsTo, "jsp__jsp_users_detail_jsp"),
            ]
        );

        // header.jsp was referenced first but is declared by its own file.
        let header = &out.entities["jsp__jsp_common_header_jsp"];
        assert!(!header.extra.contains_key(PLACEHOLDER));
        assert_eq!(header.source_refs[0].path, "webapp/jsp/common/header.jsp");

        // menu.jsp is only referenced.
        assert!(out.entities["jsp__menu_jsp"].extra.contains_key(PLACEHOLDER));
    }
}

//! `view_render` code mappings: a controller method returns/forwards to a view.
//!
//! Joined against the current routes by `(controller, method)`, so this linker must
//! run after route discovery.

use super::screens::placeholder_screen;
use super::{
    is_view_path, link_files, resolve_view_path, LinkContext, LinkError, LinkOutput, LinkerKind,
    LinkerPlugin,
};
use legacymap_model::{
    ids, CodeMapping, Entity, Evidence, JavaDetails, Relation, RelationKind, SourceFile,
};
use std::collections::BTreeMap;

pub const VIEW_RENDER: &str = "view_render";

pub struct ViewRenderLinker;

impl LinkerPlugin for ViewRenderLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::ViewRender
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let handlers = handler_index(ctx.routes);
        let files = ctx.inventory.java_files();
        let confidence = ctx.confidence.renders;
        let out = link_files(self.kind(), &files, |file, details| {
            link_views(file, details, &handlers, confidence)
        });
        tracing::info!(renders = out.relations.len(), "linked controller views");
        out
    }
}

/// `(qualified controller, method)` → route ids, sorted.
fn handler_index(routes: &BTreeMap<String, Entity>) -> BTreeMap<(String, String), Vec<String>> {
    let mut index: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for route in routes.values() {
        let Some(attrs) = route.as_route() else {
            continue;
        };
        if let (Some(controller), Some(method)) = (&attrs.controller, &attrs.method) {
            index
                .entry((controller.clone(), method.clone()))
                .or_default()
                .push(route.id.clone());
        }
    }
    index
}

fn link_views(
    file: &SourceFile,
    details: &JavaDetails,
    handlers: &BTreeMap<(String, String), Vec<String>>,
    confidence: f64,
) -> Result<LinkOutput, LinkError> {
    let mut out = LinkOutput::default();
    for mapping in details
        .code_mappings
        .iter()
        .filter(|m| m.mapping_type == VIEW_RENDER)
    {
        let (controller, method) = controller_of(mapping, details)?;
        let Some(view_path) = resolve_view_path("/", &mapping.to_reference)
            .filter(|p| is_view_path(p))
        else {
            tracing::debug!(
                file = %file.path,
                target = %mapping.to_reference,
                "skipping non-view render target"
            );
            continue;
        };
        let Some(route_ids) = handlers.get(&(controller.clone(), method.clone())) else {
            continue;
        };

        let screen = placeholder_screen(&view_path);
        for route_id in route_ids {
            out.add_relation(
                Relation::new(
                    route_id.clone(),
                    RelationKind::Renders,
                    screen.id.clone(),
                    confidence,
                    format!("{controller}.{method} renders {view_path}"),
                )
                .with_evidence(
                    Evidence::file(file.path.clone())
                        .at_line(mapping.line)
                        .with_detail(mapping.to_reference.clone()),
                ),
            );
        }
        out.add_entity(screen);
    }
    Ok(out)
}

fn controller_of(
    mapping: &CodeMapping,
    details: &JavaDetails,
) -> Result<(String, String), LinkError> {
    let member = ids::split_member_reference(&mapping.from_reference)
        .ok_or_else(|| LinkError::UnresolvableReference(mapping.from_reference.clone()))?;
    let package = member.package.as_deref().or(details.package.as_deref());
    let controller = match package {
        Some(p) => format!("{p}.{}", member.class),
        None => member.class,
    };
    Ok((controller, member.member))
}

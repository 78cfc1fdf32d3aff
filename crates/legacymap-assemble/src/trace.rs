//! Request traces: route → handler → screen chain → tables.
//!
//! For each route with at least one `renders` edge:
//!
//! 1. the screen is the smallest `renders` target id;
//! 2. the screen expands breadth-first along `includesView`, `embedsView` and
//!    `redirectsTo` (in that order, targets sorted by id), each node visited once,
//!    up to the hop limit;
//! 3. without a `handlesRoute` edge there is one trace `[route, screen, ..chain]`
//!    with CRUD from the screen chain; otherwise one trace per handler
//!    `[route, handler, screen, ..chain]` with CRUD from the handler and the chain.
//!
//! A trace cites the evidence of every edge it was built from, first-seen order.

use crate::TraceConfidence;
use legacymap_model::{Entity, EntityKind, Evidence, Relation, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Table names per CRUD bucket, sorted and de-duplicated. Empty buckets are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<String>,
}

impl CrudSummary {
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty() && self.deletes.is_empty()
    }

    /// Sorted union of all buckets.
    pub fn tables(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self
            .reads
            .iter()
            .chain(&self.writes)
            .chain(&self.deletes)
            .collect();
        all.into_iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub screen: String,
    /// Entity ids from the route to the last screen of the chain.
    pub path: Vec<String>,
    pub tables: Vec<String>,
    pub crud_summary: CrudSummary,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub confidence: f64,
}

pub fn trace_id(route_id: &str, handler_id: Option<&str>) -> String {
    format!("trace::{route_id}::{}", handler_id.unwrap_or("none"))
}

/// Adjacency over a (filtered) graph.
pub struct GraphIndex<'a> {
    entities: HashMap<&'a str, &'a Entity>,
    outgoing: HashMap<&'a str, Vec<&'a Relation>>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(entities: &'a [Entity], relations: &'a [Relation]) -> Self {
        let entities = entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let mut outgoing: HashMap<&str, Vec<&Relation>> = HashMap::new();
        for relation in relations {
            outgoing
                .entry(relation.from_id.as_str())
                .or_default()
                .push(relation);
        }
        Self { entities, outgoing }
    }

    pub fn entity(&self, id: &str) -> Option<&'a Entity> {
        self.entities.get(id).copied()
    }

    /// Distinct targets of `from`'s edges of `kind`, sorted by id.
    pub fn targets(&self, from: &str, kind: RelationKind) -> Vec<&'a str> {
        let targets: BTreeSet<&str> = self
            .outgoing
            .get(from)
            .into_iter()
            .flatten()
            .filter(|r| r.kind == kind)
            .map(|r| r.to_id.as_str())
            .collect();
        targets.into_iter().collect()
    }

    /// Breadth-first JSP chain from `start`, excluding `start` itself.
    pub fn jsp_chain(&self, start: &str, max_hops: usize) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(start);
        let mut chain = Vec::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for kind in RelationKind::VIEW_CHAIN {
                for target in self.targets(node, kind) {
                    if visited.insert(target) {
                        chain.push(target.to_string());
                        queue.push_back((target, depth + 1));
                    }
                }
            }
        }
        chain
    }

    fn is_table(&self, id: &str) -> bool {
        self.entity(id).is_some_and(|e| e.kind == EntityKind::Table)
    }

    /// Evidence of the `renders`/`handlesRoute` edges leaving `route`, the view-chain
    /// edges between `screens`, and the CRUD edges into tables from the handler and
    /// the screens. De-duplicated, in first-seen order.
    pub fn trace_evidence(
        &self,
        route: &str,
        handler: Option<&str>,
        screens: &[&str],
    ) -> Vec<Evidence> {
        let on_chain: HashSet<&str> = screens.iter().copied().collect();
        let mut edges: Vec<&Relation> = Vec::new();

        for &relation in self.outgoing.get(route).into_iter().flatten() {
            let used = match relation.kind {
                RelationKind::Renders => screens.first() == Some(&relation.to_id.as_str()),
                RelationKind::HandlesRoute => handler == Some(relation.to_id.as_str()),
                _ => false,
            };
            if used {
                edges.push(relation);
            }
        }
        for node in handler.into_iter().chain(screens.iter().copied()) {
            for &relation in self.outgoing.get(node).into_iter().flatten() {
                let chain_edge = RelationKind::VIEW_CHAIN.contains(&relation.kind)
                    && on_chain.contains(node)
                    && on_chain.contains(relation.to_id.as_str());
                let crud_edge = relation.kind.is_crud() && self.is_table(&relation.to_id);
                if chain_edge || crud_edge {
                    edges.push(relation);
                }
            }
        }

        let mut seen: HashSet<&Evidence> = HashSet::new();
        let mut evidence = Vec::new();
        for relation in edges {
            for item in &relation.evidence {
                if seen.insert(item) {
                    evidence.push(item.clone());
                }
            }
        }
        evidence
    }

    /// CRUD edges from any of `nodes` into Table entities.
    pub fn crud_summary<'n>(&self, nodes: impl IntoIterator<Item = &'n str>) -> CrudSummary {
        let mut buckets: BTreeMap<RelationKind, BTreeSet<String>> = BTreeMap::new();
        for node in nodes {
            for relation in self.outgoing.get(node).into_iter().flatten() {
                if !relation.kind.is_crud() {
                    continue;
                }
                let Some(table) = self
                    .entity(&relation.to_id)
                    .filter(|e| e.kind == EntityKind::Table)
                else {
                    continue;
                };
                buckets
                    .entry(relation.kind)
                    .or_default()
                    .insert(table.name.clone());
            }
        }
        let mut take = |kind: RelationKind| -> Vec<String> {
            buckets
                .remove(&kind)
                .map(|set| set.into_iter().collect())
                .unwrap_or_default()
        };
        CrudSummary {
            reads: take(RelationKind::ReadsFrom),
            writes: take(RelationKind::WritesTo),
            deletes: take(RelationKind::DeletesFrom),
        }
    }
}

/// Derive traces for every route, in entity order.
pub fn build_traces(
    entities: &[Entity],
    relations: &[Relation],
    max_hops: usize,
    confidence: &TraceConfidence,
) -> Vec<Trace> {
    let index = GraphIndex::new(entities, relations);
    let mut traces = Vec::new();

    for route in entities.iter().filter(|e| e.kind == EntityKind::Route) {
        let Some(screen) = index.targets(&route.id, RelationKind::Renders).first().copied() else {
            continue;
        };
        let chain = index.jsp_chain(screen, max_hops);
        let screens: Vec<&str> = std::iter::once(screen)
            .chain(chain.iter().map(String::as_str))
            .collect();

        let handlers = index.targets(&route.id, RelationKind::HandlesRoute);
        if handlers.is_empty() {
            let crud = index.crud_summary(screens.iter().copied());
            let mut path = vec![route.id.clone()];
            path.extend(screens.iter().map(|s| s.to_string()));
            traces.push(Trace {
                id: trace_id(&route.id, None),
                route: route.id.clone(),
                handler: None,
                screen: screen.to_string(),
                path,
                tables: crud.tables(),
                crud_summary: crud,
                evidence: index.trace_evidence(&route.id, None, &screens),
                confidence: confidence.screen_only,
            });
            continue;
        }

        for handler in handlers {
            let crud = index.crud_summary(std::iter::once(handler).chain(screens.iter().copied()));
            let mut path = vec![route.id.clone(), handler.to_string()];
            path.extend(screens.iter().map(|s| s.to_string()));
            let score = if crud.is_empty() {
                confidence.handler_without_crud
            } else {
                confidence.handler_with_crud
            };
            traces.push(Trace {
                id: trace_id(&route.id, Some(handler)),
                route: route.id.clone(),
                handler: Some(handler.to_string()),
                screen: screen.to_string(),
                path,
                tables: crud.tables(),
                crud_summary: crud,
                evidence: index.trace_evidence(&route.id, Some(handler), &screens),
                confidence: score,
            });
        }
    }

    tracing::info!(traces = traces.len(), "derived request traces");
    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use legacymap_model::RouteAttributes;

    fn rel(from: &str, kind: RelationKind, to: &str) -> Relation {
        Relation::new(from, kind, to, 0.9, "test")
    }

    fn cited(relation: Relation, file: &str, line: u32) -> Relation {
        relation.with_evidence(Evidence::file(file).at_line(Some(line)))
    }

    #[test]
    fn chain_is_cycle_safe() {
        let entities = vec![Entity::jsp("/a.jsp"), Entity::jsp("/b.jsp")];
        let relations = vec![
            rel("jsp__a_jsp", RelationKind::IncludesView, "jsp__b_jsp"),
            rel("jsp__b_jsp", RelationKind::IncludesView, "jsp__a_jsp"),
        ];
        let index = GraphIndex::new(&entities, &relations);
        assert_eq!(index.jsp_chain("jsp__a_jsp", 5), vec!["jsp__b_jsp"]);
    }

    #[test]
    fn chain_prefers_edge_types_then_ids_and_honors_hops() {
        let relations = vec![
            rel("s", RelationKind::RedirectsTo, "a"),
            rel("s", RelationKind::EmbedsView, "c"),
            rel("s", RelationKind::IncludesView, "z"),
            rel("s", RelationKind::IncludesView, "y"),
            rel("y", RelationKind::IncludesView, "deep"),
            rel("deep", RelationKind::IncludesView, "deeper"),
        ];
        let index = GraphIndex::new(&[], &relations);
        assert_eq!(index.jsp_chain("s", 5), vec!["y", "z", "c", "a", "deep", "deeper"]);
        assert_eq!(index.jsp_chain("s", 1), vec!["y", "z", "c", "a"]);
    }

    #[test]
    fn screen_only_route_gets_screen_chain_crud() {
        let route = Entity::route(RouteAttributes {
            framework: "struts".to_string(),
            path: "/report".to_string(),
            ..Default::default()
        });
        let entities = vec![
            route.clone(),
            Entity::jsp("/report.jsp"),
            Entity::jsp("/report_rows.jsp"),
            Entity::table("sales"),
        ];
        let relations = vec![
            rel(&route.id, RelationKind::Renders, "jsp__report_jsp"),
            rel("jsp__report_jsp", RelationKind::IncludesView, "jsp__report_rows_jsp"),
            rel("jsp__report_rows_jsp", RelationKind::ReadsFrom, "table_sales"),
            // Not a table: ignored.
            rel("jsp__report_rows_jsp", RelationKind::ReadsFrom, "jsp__report_jsp"),
        ];
        let traces = build_traces(&entities, &relations, 5, &TraceConfidence::default());
        assert_eq!(traces.len(), 1);
        let trace = &traces[0];
        assert_eq!(trace.id, "trace::route__report_ANY::none");
        assert_eq!(
            trace.path,
            vec!["route__report_ANY", "jsp__report_jsp", "jsp__report_rows_jsp"]
        );
        assert_eq!(trace.tables, vec!["sales"]);
        assert_eq!(trace.confidence, 0.6);
    }

    #[test]
    fn trace_cites_the_edges_it_was_built_from() {
        let route = Entity::route(RouteAttributes {
            framework: "struts".to_string(),
            path: "/orders".to_string(),
            ..Default::default()
        });
        let entities = vec![
            route.clone(),
            Entity::java_method(Some("com.shop"), "OrderAction", "list"),
            Entity::jsp("/orders.jsp"),
            Entity::jsp("/footer.jsp"),
            Entity::table("orders"),
        ];
        let handler = "method_com.shop.OrderAction#list";
        let config = "struts-config.xml";
        let relations = vec![
            cited(rel(&route.id, RelationKind::HandlesRoute, handler), config, 4),
            cited(rel(&route.id, RelationKind::Renders, "jsp__orders_jsp"), config, 4),
            cited(
                rel("jsp__orders_jsp", RelationKind::IncludesView, "jsp__footer_jsp"),
                "orders.jsp",
                2,
            ),
            cited(rel(handler, RelationKind::ReadsFrom, "table_orders"), "OrderAction.java", 17),
            // Not part of the trace.
            cited(rel(handler, RelationKind::ReadsFrom, "jsp__orders_jsp"), "OrderAction.java", 99),
            cited(
                rel("jsp__unrelated_jsp", RelationKind::IncludesView, "jsp__footer_jsp"),
                "x.jsp",
                1,
            ),
        ];
        let traces = build_traces(&entities, &relations, 5, &TraceConfidence::default());
        assert_eq!(traces.len(), 1);

        let evidence: Vec<(&str, Option<u32>)> = traces[0]
            .evidence
            .iter()
            .map(|e| (e.file.as_str(), e.line))
            .collect();
        assert_eq!(
            evidence,
            vec![
                ("struts-config.xml", Some(4)),
                ("OrderAction.java", Some(17)),
                ("orders.jsp", Some(2)),
            ]
        );

        let value = serde_json::to_value(&traces[0]).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let expected = [
            "id", "route", "screen", "path", "crud_summary", "tables", "evidence", "confidence",
        ];
        for key in expected {
            assert!(keys.contains(&key), "missing {key} in {keys:?}");
        }
        assert_eq!(value["route"], "route__orders_ANY");
        assert_eq!(value["screen"], "jsp__orders_jsp");
    }

    #[test]
    fn empty_buckets_are_omitted() {
        let summary = CrudSummary {
            reads: vec!["users".to_string()],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            serde_json::json!({"reads": ["users"]})
        );
    }
}

//! Property tests for the confidence filter and trace derivation.

use legacymap_assemble::*;
use legacymap_model::{Entity, Relation, RelationKind};
use proptest::prelude::*;
use std::collections::HashSet;

fn relations_strategy() -> impl Strategy<Value = Vec<Relation>> {
    prop::collection::vec((0usize..20, 0usize..20, 0.0f64..=1.0), 0..40).prop_map(|edges| {
        edges
            .into_iter()
            .map(|(from, to, confidence)| {
                Relation::new(
                    format!("jsp__p{from}_jsp"),
                    RelationKind::IncludesView,
                    format!("jsp__p{to}_jsp"),
                    confidence,
                    "generated",
                )
            })
            .collect()
    })
}

fn ids(relations: &[Relation]) -> HashSet<String> {
    relations.iter().map(|r| r.id.clone()).collect()
}

proptest! {
    #[test]
    fn higher_threshold_keeps_a_subset(
        relations in relations_strategy(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let kept_low = ids(&filter_relations(relations.clone(), low).kept);
        let kept_high = ids(&filter_relations(relations, high).kept);
        prop_assert!(kept_high.is_subset(&kept_low));
    }

    #[test]
    fn filter_accounts_for_every_relation(relations in relations_strategy(), t in 0.0f64..=1.0) {
        let total = relations.len();
        let outcome = filter_relations(relations, t);
        prop_assert_eq!(outcome.kept.len() + outcome.removed, total);
        prop_assert_eq!(outcome.removed_by_type.values().sum::<usize>(), outcome.removed);
        prop_assert!(outcome.kept.iter().all(|r| r.confidence.value() >= t));
    }

    #[test]
    fn jsp_chains_terminate_without_repeats(relations in relations_strategy(), hops in 1usize..8) {
        let entities: Vec<Entity> = (0..20).map(|n| Entity::jsp(&format!("/p{n}.jsp"))).collect();
        let index = GraphIndex::new(&entities, &relations);
        let chain = index.jsp_chain("jsp__p0_jsp", hops);
        let distinct: HashSet<&String> = chain.iter().collect();
        prop_assert_eq!(distinct.len(), chain.len());
        prop_assert!(!chain.iter().any(|id| id == "jsp__p0_jsp"));
    }
}

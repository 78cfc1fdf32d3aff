//! Append-only entity/relation registry for a single assembly pass.
//!
//! Inserts are idempotent and keyed by the derived ids: the first writer wins for
//! structural fields. The only mutation after insertion is `enrich`, which overlays
//! attributes and never touches `id`, `type`, `name` or `source_refs`.

use crate::{Entity, EntityKind, JspClassification, KindAttributes, Relation};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("cannot apply {patch} to entity {id} of type {kind}")]
    KindMismatch {
        id: String,
        kind: EntityKind,
        patch: &'static str,
    },
}

/// Attribute overlay applied by `GraphRegistry::enrich`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    /// Only valid on JSP entities.
    pub classification: Option<JspClassification>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    entities: Vec<Entity>,
    entity_index: HashMap<String, usize>,
    relations: Vec<Relation>,
    relation_index: HashMap<String, usize>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and changes nothing) when the id is already present.
    pub fn insert_entity(&mut self, entity: Entity) -> bool {
        if self.entity_index.contains_key(&entity.id) {
            return false;
        }
        self.entity_index
            .insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Returns `false` (and changes nothing) when the derived relation id is already present.
    pub fn insert_relation(&mut self, relation: Relation) -> bool {
        if self.relation_index.contains_key(&relation.id) {
            return false;
        }
        self.relation_index
            .insert(relation.id.clone(), self.relations.len());
        self.relations.push(relation);
        true
    }

    pub fn enrich(&mut self, id: &str, patch: AttributePatch) -> Result<(), RegistryError> {
        let idx = *self
            .entity_index
            .get(id)
            .ok_or_else(|| RegistryError::UnknownEntity(id.to_string()))?;
        let entity = &mut self.entities[idx];

        if let Some(classification) = patch.classification {
            match &mut entity.attributes {
                KindAttributes::Jsp(attrs) => attrs.classification = Some(classification),
                _ => {
                    return Err(RegistryError::KindMismatch {
                        id: id.to_string(),
                        kind: entity.kind,
                        patch: "jsp classification",
                    })
                }
            }
        }
        entity.extra.extend(patch.extra);
        Ok(())
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entity_index.get(id).map(|&idx| &self.entities[idx])
    }

    pub fn relation(&self, id: &str) -> Option<&Relation> {
        self.relation_index.get(id).map(|&idx| &self.relations[idx])
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entity_index.contains_key(id)
    }

    pub fn contains_relation(&self, id: &str) -> bool {
        self.relation_index.contains_key(id)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Snapshot of the current Route entities keyed by id (linker input).
    pub fn routes(&self) -> BTreeMap<String, Entity> {
        self.entities_of(EntityKind::Route)
            .map(|e| (e.id.clone(), e.clone()))
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn into_parts(self) -> (Vec<Entity>, Vec<Relation>) {
        (self.entities, self.relations)
    }
}

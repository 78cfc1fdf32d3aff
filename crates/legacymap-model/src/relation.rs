//! Relations between entities, with confidence and evidence.

use crate::ids;
use crate::Evidence;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    HandlesRoute,
    Renders,
    ReadsFrom,
    WritesTo,
    DeletesFrom,
    SecuredBy,
    ValidatedBy,
    MountedUnder,
    InvokesProcedure,
    IncludesView,
    EmbedsView,
    RedirectsTo,
}

impl RelationKind {
    pub const fn label(self) -> &'static str {
        match self {
            RelationKind::HandlesRoute => "handlesRoute",
            RelationKind::Renders => "renders",
            RelationKind::ReadsFrom => "readsFrom",
            RelationKind::WritesTo => "writesTo",
            RelationKind::DeletesFrom => "deletesFrom",
            RelationKind::SecuredBy => "securedBy",
            RelationKind::ValidatedBy => "validatedBy",
            RelationKind::MountedUnder => "mountedUnder",
            RelationKind::InvokesProcedure => "invokesProcedure",
            RelationKind::IncludesView => "includesView",
            RelationKind::EmbedsView => "embedsView",
            RelationKind::RedirectsTo => "redirectsTo",
        }
    }

    pub const fn is_crud(self) -> bool {
        matches!(
            self,
            RelationKind::ReadsFrom | RelationKind::WritesTo | RelationKind::DeletesFrom
        )
    }

    /// Edges followed when expanding a screen into its JSP chain, in priority order.
    pub const VIEW_CHAIN: [RelationKind; 3] = [
        RelationKind::IncludesView,
        RelationKind::EmbedsView,
        RelationKind::RedirectsTo,
    ];
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A score in `[0, 1]`. Out-of-range and NaN inputs are clamped on construction,
/// including when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub rationale: String,
}

impl Relation {
    pub fn new(
        from_id: impl Into<String>,
        kind: RelationKind,
        to_id: impl Into<String>,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        let from_id = from_id.into();
        let to_id = to_id.into();
        Self {
            id: ids::relation_id(&from_id, kind.label(), &to_id),
            from_id,
            to_id,
            kind,
            confidence: Confidence::new(confidence),
            evidence: Vec::new(),
            rationale: rationale.into(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        if !self.evidence.contains(&evidence) {
            self.evidence.push(evidence);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_id_is_derived_from_endpoints_and_kind() {
        let a = Relation::new("route_a", RelationKind::HandlesRoute, "method_b", 0.9, "x");
        let b = Relation::new("route_a", RelationKind::HandlesRoute, "method_b", 0.4, "y");
        let c = Relation::new("route_a", RelationKind::Renders, "method_b", 0.9, "x");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id, "rel::handlesRoute::route_a::method_b");
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);

        let parsed: Confidence = serde_json::from_str("3.5").unwrap();
        assert_eq!(parsed.value(), 1.0);
    }

    #[test]
    fn kind_serializes_as_camel_case_label() {
        let v = serde_json::to_value(RelationKind::HandlesRoute).unwrap();
        assert_eq!(v, "handlesRoute");
        for kind in RelationKind::VIEW_CHAIN {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.label());
        }
    }
}

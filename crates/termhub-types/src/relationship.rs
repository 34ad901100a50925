//! Concept relationship types.

use crate::ConceptId;

/// A row of the raw `concept_relationship` table.
///
/// # Examples
///
/// ```
/// use termhub_types::ConceptRelationshipRow;
///
/// let row = ConceptRelationshipRow::subsumes(4274025, 201826);
/// assert!(row.is_subsumes());
/// assert!(!row.is_self_loop());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptRelationshipRow {
    /// Source concept; the parent for `Subsumes`.
    pub concept_id_1: ConceptId,
    /// Target concept; the child for `Subsumes`.
    pub concept_id_2: ConceptId,
    /// Relationship kind.
    pub relationship_id: String,
}

impl ConceptRelationshipRow {
    /// Relationship id for the "is ancestor of" kind.
    pub const SUBSUMES: &'static str = "Subsumes";

    /// Creates a subsumes row.
    pub fn subsumes(parent: ConceptId, child: ConceptId) -> Self {
        Self {
            concept_id_1: parent,
            concept_id_2: child,
            relationship_id: Self::SUBSUMES.to_string(),
        }
    }

    /// Returns true if this row is a subsumes relationship.
    pub fn is_subsumes(&self) -> bool {
        self.relationship_id == Self::SUBSUMES
    }

    /// Returns true if both endpoints are the same concept.
    pub fn is_self_loop(&self) -> bool {
        self.concept_id_1 == self.concept_id_2
    }

    /// Converts to a parent/child edge.
    pub fn to_edge(&self) -> RelationshipEdge {
        RelationshipEdge {
            parent_concept_id: self.concept_id_1,
            child_concept_id: self.concept_id_2,
        }
    }
}

/// A directed subsumption edge: the parent is an ancestor of the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelationshipEdge {
    /// Ancestor concept.
    #[cfg_attr(feature = "serde", serde(rename = "concept_id_1"))]
    pub parent_concept_id: ConceptId,
    /// Descendant concept.
    #[cfg_attr(feature = "serde", serde(rename = "concept_id_2"))]
    pub child_concept_id: ConceptId,
}

impl RelationshipEdge {
    /// Creates a new edge.
    pub fn new(parent_concept_id: ConceptId, child_concept_id: ConceptId) -> Self {
        Self {
            parent_concept_id,
            child_concept_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_kinds() {
        let subsumes = ConceptRelationshipRow::subsumes(1, 2);
        assert!(subsumes.is_subsumes());

        let maps_to = ConceptRelationshipRow {
            relationship_id: "Maps to".to_string(),
            ..subsumes.clone()
        };
        assert!(!maps_to.is_subsumes());
    }

    #[test]
    fn test_self_loop_and_edge() {
        assert!(ConceptRelationshipRow::subsumes(7, 7).is_self_loop());

        let edge = ConceptRelationshipRow::subsumes(1, 2).to_edge();
        assert_eq!(edge, RelationshipEdge::new(1, 2));
    }
}

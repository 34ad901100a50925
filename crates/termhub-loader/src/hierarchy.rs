//! Nested hierarchy rendering.
//!
//! A hierarchy maps each concept to its subtree: `null` for a leaf, a nested
//! map for a concept with children, and the marker `"cycle"` where a concept
//! reappears on its own ancestor path.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::ser::{Serialize, Serializer};
use termhub_types::{ConceptId, PLACEHOLDER_ROOT};

use crate::index::RelationshipIndex;
use crate::types::EngineError;

/// Marker written in place of a subtree that would revisit an ancestor.
pub const CYCLE_MARKER: &str = "cycle";

/// A concept to subtree mapping, ordered by concept id.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct Hierarchy(BTreeMap<ConceptId, HierarchyNode>);

/// One entry in a [`Hierarchy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyNode {
    /// No children.
    Leaf,
    /// Nested children.
    Branch(Hierarchy),
    /// Truncated: this concept is already on the path from the root.
    Cycle,
}

impl Serialize for HierarchyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf => serializer.serialize_none(),
            Self::Branch(children) => children.serialize(serializer),
            Self::Cycle => serializer.serialize_str(CYCLE_MARKER),
        }
    }
}

impl Hierarchy {
    /// Returns true if there are no top-level entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Subtree for a top-level concept.
    pub fn get(&self, concept_id: ConceptId) -> Option<&HierarchyNode> {
        self.0.get(&concept_id)
    }

    /// Top-level entries in concept id order.
    pub fn iter(&self) -> impl Iterator<Item = (ConceptId, &HierarchyNode)> {
        self.0.iter().map(|(id, node)| (*id, node))
    }

    /// Every concept id appearing anywhere in the tree.
    pub fn concept_ids(&self) -> BTreeSet<ConceptId> {
        let mut ids = BTreeSet::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut BTreeSet<ConceptId>) {
        for (id, node) in &self.0 {
            ids.insert(*id);
            if let HierarchyNode::Branch(children) = node {
                children.collect_ids(ids);
            }
        }
    }

    /// Longest root to leaf path, counted in nodes. Zero for an empty tree.
    pub fn depth(&self) -> usize {
        self.0
            .values()
            .map(|node| match node {
                HierarchyNode::Branch(children) => 1 + children.depth(),
                HierarchyNode::Leaf | HierarchyNode::Cycle => 1,
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of cycle markers in the tree.
    pub fn cycle_count(&self) -> usize {
        self.0
            .values()
            .map(|node| match node {
                HierarchyNode::Branch(children) => children.cycle_count(),
                HierarchyNode::Cycle => 1,
                HierarchyNode::Leaf => 0,
            })
            .sum()
    }
}

/// Renders the subtrees under `roots` as a nested hierarchy.
///
/// The placeholder root `-1` is never emitted. A concept reached again on
/// its own ancestor path is written as [`HierarchyNode::Cycle`] and not
/// expanded, so the result is always finite.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use termhub_loader::{flatten, RelationshipIndex};
/// use termhub_loader::termhub_types::RelationshipEdge;
///
/// let edges = [RelationshipEdge::new(1, 2), RelationshipEdge::new(1, 3)];
/// let index = RelationshipIndex::build(&edges);
/// let roots: BTreeSet<_> = [1].into_iter().collect();
///
/// let tree = flatten(&roots, &index);
/// assert_eq!(serde_json::to_string(&tree).unwrap(), r#"{"1":{"2":null,"3":null}}"#);
/// ```
pub fn flatten(roots: &BTreeSet<ConceptId>, index: &RelationshipIndex) -> Hierarchy {
    let mut path = HashSet::new();
    subtree(PLACEHOLDER_ROOT, roots.iter().copied(), index, &mut path)
}

fn subtree(
    parent: ConceptId,
    ids: impl Iterator<Item = ConceptId>,
    index: &RelationshipIndex,
    path: &mut HashSet<ConceptId>,
) -> Hierarchy {
    let mut tree = BTreeMap::new();

    for id in ids.filter(|&id| id != parent && id != PLACEHOLDER_ROOT) {
        let node = if path.contains(&id) {
            tracing::warn!("{}", EngineError::CycleDetected { concept_id: id });
            HierarchyNode::Cycle
        } else {
            match index.children_of(id) {
                Some(children) if !children.is_empty() => {
                    path.insert(id);
                    let nested = subtree(id, children.iter().copied(), index, path);
                    path.remove(&id);
                    if nested.is_empty() {
                        HierarchyNode::Leaf
                    } else {
                        HierarchyNode::Branch(nested)
                    }
                }
                _ => HierarchyNode::Leaf,
            }
        };
        tree.insert(id, node);
    }

    Hierarchy(tree)
}

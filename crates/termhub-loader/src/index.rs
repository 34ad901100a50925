//! Parent to children lookup over subsumption edges.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use termhub_types::{ConceptId, RelationshipEdge};

/// Adjacency index from parent concept to child concepts.
///
/// Lookups are memoized. The cache is safe to share across threads and is
/// only ever filled from the immutable adjacency, so concurrent readers see
/// the same answer for the same parent.
#[derive(Debug, Default)]
pub struct RelationshipIndex {
    adjacency: HashMap<ConceptId, Vec<ConceptId>>,
    memo: DashMap<ConceptId, Option<Arc<[ConceptId]>>>,
}

impl RelationshipIndex {
    /// Builds the index from edges. Duplicate edges are tolerated.
    pub fn build<'a>(edges: impl IntoIterator<Item = &'a RelationshipEdge>) -> Self {
        let mut adjacency: HashMap<ConceptId, Vec<ConceptId>> = HashMap::new();
        for edge in edges {
            adjacency
                .entry(edge.parent_concept_id)
                .or_default()
                .push(edge.child_concept_id);
        }

        Self {
            adjacency,
            memo: DashMap::new(),
        }
    }

    /// Children of `parent`, or `None` if `parent` has no outgoing edges.
    ///
    /// Children are unique, in first-seen order, and never include `parent`.
    pub fn children_of(&self, parent: ConceptId) -> Option<Arc<[ConceptId]>> {
        if let Some(hit) = self.memo.get(&parent) {
            return hit.value().clone();
        }

        let children = self.adjacency.get(&parent).map(|kids| {
            let mut seen = HashSet::new();
            kids.iter()
                .copied()
                .filter(|&child| child != parent && seen.insert(child))
                .collect::<Arc<[ConceptId]>>()
        });

        self.memo.insert(parent, children.clone());
        children
    }

    /// Returns true if `parent` has outgoing edges.
    pub fn is_parent(&self, parent: ConceptId) -> bool {
        self.adjacency.contains_key(&parent)
    }

    /// Number of distinct parents.
    pub fn parent_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges indexed, duplicates included.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Number of memoized lookups.
    pub fn cached_count(&self) -> usize {
        self.memo.len()
    }

    /// Edges whose endpoints both lie in `nodes`, ordered by parent then child.
    pub fn induced_edges(&self, nodes: &BTreeSet<ConceptId>) -> Vec<RelationshipEdge> {
        let mut edges = Vec::new();
        for &parent in nodes {
            let Some(children) = self.children_of(parent) else {
                continue;
            };
            edges.extend(
                children
                    .iter()
                    .filter(|child| nodes.contains(child))
                    .map(|&child| RelationshipEdge::new(parent, child)),
            );
        }
        edges.sort_unstable();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(ConceptId, ConceptId)]) -> Vec<RelationshipEdge> {
        pairs.iter().map(|&(p, c)| RelationshipEdge::new(p, c)).collect()
    }

    #[test]
    fn test_children_unique_in_first_seen_order() {
        let index = RelationshipIndex::build(&edges(&[(1, 3), (1, 2), (1, 3), (1, 1)]));

        assert_eq!(index.children_of(1).as_deref(), Some(&[3, 2][..]));
        assert_eq!(index.edge_count(), 4);
    }

    #[test]
    fn test_absent_parent_is_none() {
        let index = RelationshipIndex::build(&edges(&[(1, 2)]));
        assert!(index.children_of(2).is_none());
        assert!(index.children_of(42).is_none());
        assert!(!index.is_parent(2));
    }

    #[test]
    fn test_only_self_loop_gives_empty_children() {
        let index = RelationshipIndex::build(&edges(&[(5, 5)]));
        assert_eq!(index.children_of(5).as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_lookups_are_memoized() {
        let index = RelationshipIndex::build(&edges(&[(1, 2), (2, 3)]));
        let first = index.children_of(1);
        let second = index.children_of(1);
        index.children_of(9);

        assert_eq!(first, second);
        assert_eq!(index.cached_count(), 2);
    }

    #[test]
    fn test_induced_edges() {
        let index = RelationshipIndex::build(&edges(&[(1, 2), (1, 3), (2, 4), (2, 4), (3, 3)]));
        let nodes: BTreeSet<_> = [1, 2, 3].into_iter().collect();

        assert_eq!(index.induced_edges(&nodes), edges(&[(1, 2), (1, 3)]));
    }

    #[test]
    fn test_concurrent_lookups_agree() {
        let index = RelationshipIndex::build(&edges(&[(1, 2), (1, 3), (2, 4)]));
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| index.children_of(1))).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap().as_deref(), Some(&[2, 3][..]));
            }
        });
    }
}

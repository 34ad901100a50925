//! Immutable, indexed view of a cleaned dataset.

use std::collections::{BTreeSet, HashMap};

use termhub_types::{
    CodesetId, Codeset, Concept, ConceptId, ConceptSetContainer, ConceptSetVersionItem,
    ConceptUsage, CsetSummary, RelationshipEdge, Researcher,
};

use crate::index::RelationshipIndex;
use crate::pipeline::{PipelineReport, Tables};

/// A cleaned dataset with lookup indexes.
///
/// Snapshots are never mutated after construction. Readers hold an
/// `Arc<Snapshot>` and see a consistent view while a replacement is built.
#[derive(Debug, Default)]
pub struct Snapshot {
    concepts: HashMap<ConceptId, Concept>,
    edges: Vec<RelationshipEdge>,
    index: RelationshipIndex,
    containers: HashMap<String, ConceptSetContainer>,
    code_sets: HashMap<CodesetId, Codeset>,
    members_by_codeset: HashMap<CodesetId, Vec<ConceptId>>,
    codesets_by_concept: HashMap<ConceptId, Vec<CodesetId>>,
    version_items_by_codeset: HashMap<CodesetId, Vec<ConceptSetVersionItem>>,
    all_csets: Vec<CsetSummary>,
    all_csets_by_id: HashMap<CodesetId, usize>,
    researchers: HashMap<String, Researcher>,
    report: PipelineReport,
}

impl Snapshot {
    /// Indexes cleaned tables.
    pub fn from_tables(tables: Tables, report: PipelineReport) -> Self {
        let usage: HashMap<ConceptId, ConceptUsage> = tables
            .concept_usage
            .into_iter()
            .map(|u| (u.concept_id, u))
            .collect();
        let concepts = tables
            .concept
            .iter()
            .map(|row| {
                let concept = match usage.get(&row.concept_id) {
                    Some(u) => Concept::from_parts(row, u),
                    None => Concept::from_parts(row, &ConceptUsage::none(row.concept_id)),
                };
                (row.concept_id, concept)
            })
            .collect();

        let edges: Vec<RelationshipEdge> = tables
            .concept_relationship
            .iter()
            .map(|r| r.to_edge())
            .collect();
        let index = RelationshipIndex::build(&edges);

        let mut members_by_codeset: HashMap<CodesetId, Vec<ConceptId>> = HashMap::new();
        let mut codesets_by_concept: HashMap<ConceptId, Vec<CodesetId>> = HashMap::new();
        for m in &tables.concept_set_members {
            members_by_codeset.entry(m.codeset_id).or_default().push(m.concept_id);
            codesets_by_concept.entry(m.concept_id).or_default().push(m.codeset_id);
        }
        for ids in members_by_codeset.values_mut().chain(codesets_by_concept.values_mut()) {
            ids.sort_unstable();
            ids.dedup();
        }

        let mut version_items_by_codeset: HashMap<CodesetId, Vec<ConceptSetVersionItem>> = HashMap::new();
        for item in tables.concept_set_version_item {
            version_items_by_codeset.entry(item.codeset_id).or_default().push(item);
        }

        let mut all_csets_by_id = HashMap::new();
        for (position, row) in tables.all_csets.iter().enumerate() {
            all_csets_by_id.entry(row.codeset_id).or_insert(position);
        }

        let snapshot = Self {
            concepts,
            edges,
            index,
            containers: tables
                .concept_set_container
                .into_iter()
                .map(|c| (c.concept_set_name.clone(), c))
                .collect(),
            code_sets: tables.code_sets.into_iter().map(|c| (c.codeset_id, c)).collect(),
            members_by_codeset,
            codesets_by_concept,
            version_items_by_codeset,
            all_csets: tables.all_csets,
            all_csets_by_id,
            researchers: tables
                .researcher
                .into_iter()
                .map(|r| (r.multipass_id.clone(), r))
                .collect(),
            report,
        };

        tracing::info!(
            concepts = snapshot.concept_count(),
            edges = snapshot.edge_count(),
            codesets = snapshot.codeset_count(),
            all_csets = snapshot.all_csets.len(),
            "Snapshot built"
        );

        snapshot
    }

    /// Looks up a concept.
    pub fn concept(&self, concept_id: ConceptId) -> Option<&Concept> {
        self.concepts.get(&concept_id)
    }

    /// Concepts for the given ids, ordered by id. Unknown ids are skipped.
    pub fn concepts_for<'a>(&self, concept_ids: impl IntoIterator<Item = &'a ConceptId>) -> Vec<Concept> {
        let ids: BTreeSet<ConceptId> = concept_ids.into_iter().copied().collect();
        ids.iter().filter_map(|id| self.concepts.get(id)).cloned().collect()
    }

    /// Subsumption edges, parent to child.
    pub fn edges(&self) -> &[RelationshipEdge] {
        &self.edges
    }

    /// Index over every edge in the snapshot.
    pub fn index(&self) -> &RelationshipIndex {
        &self.index
    }

    /// Container by name.
    pub fn container(&self, name: &str) -> Option<&ConceptSetContainer> {
        self.containers.get(name)
    }

    /// Codeset version by id.
    pub fn codeset(&self, codeset_id: CodesetId) -> Option<&Codeset> {
        self.code_sets.get(&codeset_id)
    }

    /// Returns true if the codeset survived cleaning.
    pub fn has_codeset(&self, codeset_id: CodesetId) -> bool {
        self.code_sets.contains_key(&codeset_id)
    }

    /// Distinct member concepts of a codeset, ascending.
    pub fn member_concepts(&self, codeset_id: CodesetId) -> &[ConceptId] {
        self.members_by_codeset.get(&codeset_id).map_or(&[], Vec::as_slice)
    }

    /// Codesets containing a concept, ascending.
    pub fn codesets_for_concept(&self, concept_id: ConceptId) -> &[CodesetId] {
        self.codesets_by_concept.get(&concept_id).map_or(&[], Vec::as_slice)
    }

    /// Version items of a codeset, in source order.
    pub fn version_items(&self, codeset_id: CodesetId) -> &[ConceptSetVersionItem] {
        self.version_items_by_codeset.get(&codeset_id).map_or(&[], Vec::as_slice)
    }

    /// The `all_csets` view, ordered by codeset id.
    pub fn all_csets(&self) -> &[CsetSummary] {
        &self.all_csets
    }

    /// The `all_csets` row for a codeset.
    pub fn cset(&self, codeset_id: CodesetId) -> Option<&CsetSummary> {
        self.all_csets_by_id.get(&codeset_id).map(|&i| &self.all_csets[i])
    }

    /// Looks up a researcher.
    pub fn researcher(&self, multipass_id: &str) -> Option<&Researcher> {
        self.researchers.get(multipass_id)
    }

    /// Researchers referenced by the given rows, ordered by id.
    pub fn researchers_for<'a>(&self, rows: impl IntoIterator<Item = &'a CsetSummary>) -> Vec<Researcher> {
        let ids: BTreeSet<&str> = rows.into_iter().flat_map(CsetSummary::researcher_ids).collect();
        ids.into_iter().filter_map(|id| self.researcher(id)).cloned().collect()
    }

    /// Diagnostics from the cleaning run.
    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Number of concepts.
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of codeset versions.
    pub fn codeset_count(&self) -> usize {
        self.code_sets.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::clean;
    use crate::test_fixtures::raw_tables;

    #[test]
    fn test_snapshot_indexes() {
        let snapshot = clean(raw_tables()).unwrap();

        assert_eq!(snapshot.concept_count(), 4);
        assert_eq!(snapshot.codeset_count(), 2);
        assert_eq!(snapshot.member_concepts(100), &[1, 2, 3]);
        assert_eq!(snapshot.codesets_for_concept(3), &[100, 200]);
        assert!(snapshot.member_concepts(300).is_empty());
        assert_eq!(snapshot.version_items(100).len(), 1);
        assert_eq!(snapshot.cset(200).unwrap().concepts, 2);
        assert!(snapshot.cset(999).is_none());
        assert!(snapshot.container("Diabetes").is_some());
    }

    #[test]
    fn test_concepts_carry_usage() {
        let snapshot = clean(raw_tables()).unwrap();

        let one = snapshot.concept(1).unwrap();
        assert_eq!(one.domain_cnt, 2);
        assert_eq!(one.total_count, 15);

        let four = snapshot.concept(4).unwrap();
        assert_eq!(four.domain_cnt, 0);
        assert_eq!(four.distinct_person_count, "0");

        let ids: Vec<_> = snapshot.concepts_for(&[4, 1, 999]).iter().map(|c| c.concept_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_researchers_for_rows() {
        let snapshot = clean(raw_tables()).unwrap();
        let names: Vec<_> = snapshot
            .researchers_for(snapshot.all_csets())
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
    }

    #[test]
    fn test_edges_have_no_self_loops() {
        let snapshot = clean(raw_tables()).unwrap();
        assert_eq!(snapshot.edge_count(), 4);
        assert!(snapshot
            .edges()
            .iter()
            .all(|e| e.parent_concept_id != e.child_concept_id));
    }
}

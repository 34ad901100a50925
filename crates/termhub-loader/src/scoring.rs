//! Selection analysis: related codesets, their recall and precision against
//! the selected concepts, and the hierarchy of the selected concepts.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use termhub_types::{CodesetId, Concept, ConceptId, CsetSummary, RelationshipEdge, Researcher};

use crate::hierarchy::{flatten, Hierarchy};
use crate::index::RelationshipIndex;
use crate::snapshot::Snapshot;
use crate::types::{EngineError, EngineResult};

/// A (codeset, concept) pair with where it was found.
///
/// `csm` marks presence in the expanded membership, `item` presence in the
/// version's item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsetMemberItem {
    /// Codeset version.
    pub codeset_id: CodesetId,
    /// Concept.
    pub concept_id: ConceptId,
    /// Present in `concept_set_members`.
    pub csm: bool,
    /// Present in `concept_set_version_item`.
    pub item: bool,
    /// Comma-joined item flags, empty when `item` is false.
    pub item_flags: String,
}

/// An `all_csets` row scored against a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedCset {
    /// The summary row.
    #[serde(flatten)]
    pub cset: CsetSummary,
    /// Member concepts that are also selected concepts.
    pub intersecting_concepts: usize,
    /// Share of selected concepts found in this codeset.
    pub recall: f64,
    /// Share of this codeset's concepts that are selected.
    pub precision: f64,
    /// Whether the codeset is part of the selection.
    pub selected: bool,
}

/// Everything computed for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    /// Selected codeset ids.
    pub codeset_ids: BTreeSet<CodesetId>,
    /// Membership of the selected codesets, ordered by codeset then concept.
    pub cset_members_items: Vec<CsetMemberItem>,
    /// Union of concepts in the selected codesets.
    pub selected_concept_ids: BTreeSet<ConceptId>,
    /// Edges among the selected concepts.
    pub concept_relationships: Vec<RelationshipEdge>,
    /// Codesets sharing a concept with the selection, selected first then
    /// by descending size.
    pub related_csets: Vec<RelatedCset>,
    /// The selected subset of `related_csets`, same order.
    pub selected_csets: Vec<RelatedCset>,
    /// Selected concepts with no selected parent.
    pub top_level_cids: BTreeSet<ConceptId>,
    /// Nested hierarchy under `top_level_cids`.
    pub hierarchy: Hierarchy,
    /// Details for the hierarchy and selected concepts, ordered by id.
    pub concepts: Vec<Concept>,
    /// Researchers referenced by the selected codesets.
    pub researchers: Vec<Researcher>,
}

/// Membership rows for the given codesets, ordered by (codeset, concept).
///
/// Unknown codesets contribute no rows.
pub fn cset_members_items(codeset_ids: &BTreeSet<CodesetId>, snapshot: &Snapshot) -> Vec<CsetMemberItem> {
    let mut rows: BTreeMap<(CodesetId, ConceptId), CsetMemberItem> = BTreeMap::new();

    for &codeset_id in codeset_ids {
        for &concept_id in snapshot.member_concepts(codeset_id) {
            rows.entry((codeset_id, concept_id))
                .or_insert_with(|| CsetMemberItem {
                    codeset_id,
                    concept_id,
                    csm: false,
                    item: false,
                    item_flags: String::new(),
                })
                .csm = true;
        }

        for version_item in snapshot.version_items(codeset_id) {
            let row = rows
                .entry((codeset_id, version_item.concept_id))
                .or_insert_with(|| CsetMemberItem {
                    codeset_id,
                    concept_id: version_item.concept_id,
                    csm: false,
                    item: false,
                    item_flags: String::new(),
                });
            if !row.item {
                row.item = true;
                row.item_flags = version_item.item_flags();
            }
        }
    }

    rows.into_values().collect()
}

/// Scores every codeset related to the selection.
///
/// # Errors
/// - [`EngineError::EmptySelection`] if the selected codesets have no concepts.
/// - [`EngineError::ZeroMemberCodeset`] if a related codeset has no members.
pub fn score(
    codeset_ids: impl IntoIterator<Item = CodesetId>,
    snapshot: &Snapshot,
) -> EngineResult<SelectionResult> {
    let codeset_ids: BTreeSet<CodesetId> = codeset_ids.into_iter().collect();
    for &id in &codeset_ids {
        if !snapshot.has_codeset(id) {
            tracing::debug!(codeset_id = id, "Selected codeset not in snapshot");
        }
    }

    let cset_members_items = cset_members_items(&codeset_ids, snapshot);
    let selected_concept_ids: BTreeSet<ConceptId> =
        cset_members_items.iter().map(|row| row.concept_id).collect();
    if selected_concept_ids.is_empty() {
        return Err(EngineError::EmptySelection);
    }

    let concept_relationships = snapshot.index().induced_edges(&selected_concept_ids);

    let related_ids: BTreeSet<CodesetId> = selected_concept_ids
        .iter()
        .flat_map(|&concept_id| snapshot.codesets_for_concept(concept_id).iter().copied())
        .collect();
    let candidates: Vec<&CsetSummary> = snapshot
        .all_csets()
        .iter()
        .filter(|row| related_ids.contains(&row.codeset_id))
        .collect();

    let score_one = |row: &&CsetSummary| -> EngineResult<RelatedCset> {
        score_cset(row, &codeset_ids, &selected_concept_ids, snapshot)
    };
    #[cfg(feature = "parallel")]
    let scored: EngineResult<Vec<RelatedCset>> = candidates.par_iter().map(score_one).collect();
    #[cfg(not(feature = "parallel"))]
    let scored: EngineResult<Vec<RelatedCset>> = candidates.iter().map(score_one).collect();

    let mut related_csets = scored?;
    related_csets.sort_by(|a, b| (b.selected, b.cset.concepts).cmp(&(a.selected, a.cset.concepts)));
    let selected_csets: Vec<RelatedCset> = related_csets.iter().filter(|r| r.selected).cloned().collect();

    let children: BTreeSet<ConceptId> = concept_relationships.iter().map(|e| e.child_concept_id).collect();
    let top_level_cids: BTreeSet<ConceptId> = selected_concept_ids.difference(&children).copied().collect();

    let selection_index = RelationshipIndex::build(&concept_relationships);
    let hierarchy = flatten(&top_level_cids, &selection_index);

    let mut detail_ids = hierarchy.concept_ids();
    detail_ids.extend(selected_concept_ids.iter().copied());
    let concepts = snapshot.concepts_for(&detail_ids);

    let researchers = snapshot.researchers_for(selected_csets.iter().map(|r| &r.cset));

    tracing::debug!(
        codesets = codeset_ids.len(),
        concepts = selected_concept_ids.len(),
        related = related_csets.len(),
        roots = top_level_cids.len(),
        "Selection scored"
    );

    Ok(SelectionResult {
        codeset_ids,
        cset_members_items,
        selected_concept_ids,
        concept_relationships,
        related_csets,
        selected_csets,
        top_level_cids,
        hierarchy,
        concepts,
        researchers,
    })
}

fn score_cset(
    row: &CsetSummary,
    selected_codesets: &BTreeSet<CodesetId>,
    selected_concepts: &BTreeSet<ConceptId>,
    snapshot: &Snapshot,
) -> EngineResult<RelatedCset> {
    let members = snapshot.member_concepts(row.codeset_id);
    if members.is_empty() {
        return Err(EngineError::ZeroMemberCodeset {
            codeset_id: row.codeset_id,
        });
    }

    let intersecting = members.iter().filter(|id| selected_concepts.contains(id)).count();

    Ok(RelatedCset {
        cset: row.clone(),
        intersecting_concepts: intersecting,
        recall: intersecting as f64 / selected_concepts.len() as f64,
        precision: intersecting as f64 / members.len() as f64,
        selected: selected_codesets.contains(&row.codeset_id),
    })
}

//! Cleaning pipeline.
//!
//! Turns raw tables into the canonical dataset a [`Snapshot`] is built from.
//! Steps run in a fixed order, each depending on the output of the ones
//! before it. Every step is idempotent: running it on its own output
//! changes nothing.
//!
//! A later step can strand rows an earlier step kept: dropping version items
//! that are not members can leave a codeset with no items. The whole
//! sequence therefore repeats until a pass changes nothing.
//!
//! Before and after each step the distinct values of a few key columns are
//! counted. The counts are diagnostic only and are kept in a
//! [`PipelineReport`] on the snapshot.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use termhub_types::{
    CodesetId, Codeset, ConceptId, ConceptRelationshipRow, ConceptRow, ConceptSetContainer,
    ConceptSetMember, ConceptSetVersionItem, ConceptUsage, CsetCounts, CsetSummary, Researcher,
    TermUsage,
};

use crate::loader::RawTables;
use crate::snapshot::Snapshot;
use crate::types::{EngineError, EngineResult, TableName};

/// Working set of tables the pipeline filters in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tables {
    /// `concept`
    pub concept: Vec<ConceptRow>,
    /// `concept_relationship`
    pub concept_relationship: Vec<ConceptRelationshipRow>,
    /// `concept_set_container`
    pub concept_set_container: Vec<ConceptSetContainer>,
    /// `code_sets`
    pub code_sets: Vec<Codeset>,
    /// `concept_set_members`
    pub concept_set_members: Vec<ConceptSetMember>,
    /// `concept_set_version_item`
    pub concept_set_version_item: Vec<ConceptSetVersionItem>,
    /// `concept_set_counts_clamped`
    pub concept_set_counts_clamped: Vec<CsetCounts>,
    /// `deidentified_term_usage_by_domain_clamped`
    pub term_usage: Vec<TermUsage>,
    /// `researcher`
    pub researcher: Vec<Researcher>,
    /// Derived `all_csets` view, ordered by codeset id.
    pub all_csets: Vec<CsetSummary>,
    /// Derived usage per concept, ordered by concept id.
    pub concept_usage: Vec<ConceptUsage>,
}

impl TryFrom<RawTables> for Tables {
    type Error = EngineError;

    fn try_from(raw: RawTables) -> EngineResult<Self> {
        let missing = raw.missing_tables();
        if !missing.is_empty() {
            let names: Vec<_> = missing.iter().map(|t| t.as_str()).collect();
            return Err(EngineError::SnapshotBuildFailure {
                reason: format!("required tables absent: {}", names.join(", ")),
            });
        }

        Ok(Self {
            concept: raw.concept.unwrap_or_default(),
            concept_relationship: raw.concept_relationship.unwrap_or_default(),
            concept_set_container: raw.concept_set_container.unwrap_or_default(),
            code_sets: raw.code_sets.unwrap_or_default(),
            concept_set_members: raw.concept_set_members.unwrap_or_default(),
            concept_set_version_item: raw.concept_set_version_item.unwrap_or_default(),
            concept_set_counts_clamped: raw.concept_set_counts_clamped.unwrap_or_default(),
            term_usage: raw.term_usage.unwrap_or_default(),
            researcher: raw.researcher.unwrap_or_default(),
            all_csets: Vec::new(),
            concept_usage: Vec::new(),
        })
    }
}

/// Key columns whose distinct values are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// `concept_set_name`
    ConceptSetName,
    /// `codeset_id`
    CodesetId,
    /// `concept_id`
    ConceptId,
}

/// Distinct value counts for the key columns; `None` where not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColumnCounts {
    /// Distinct `concept_set_name` values.
    pub concept_set_name: Option<usize>,
    /// Distinct `codeset_id` values.
    pub codeset_id: Option<usize>,
    /// Distinct `concept_id` values.
    pub concept_id: Option<usize>,
}

impl ColumnCounts {
    fn set(&mut self, column: Column, value: Option<usize>) {
        match column {
            Column::ConceptSetName => self.concept_set_name = value,
            Column::CodesetId => self.codeset_id = value,
            Column::ConceptId => self.concept_id = value,
        }
    }
}

fn distinct<T: Eq + std::hash::Hash>(values: impl Iterator<Item = T>) -> usize {
    values.collect::<HashSet<_>>().len()
}

impl Tables {
    /// Number of rows in a table.
    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::Concept => self.concept.len(),
            TableName::ConceptRelationship => self.concept_relationship.len(),
            TableName::ConceptSetContainer => self.concept_set_container.len(),
            TableName::CodeSets => self.code_sets.len(),
            TableName::ConceptSetMembers => self.concept_set_members.len(),
            TableName::ConceptSetVersionItem => self.concept_set_version_item.len(),
            TableName::ConceptSetCountsClamped => self.concept_set_counts_clamped.len(),
            TableName::TermUsage => self.term_usage.len(),
            TableName::Researcher => self.researcher.len(),
            TableName::AllCsets => self.all_csets.len(),
            TableName::ConceptUsage => self.concept_usage.len(),
        }
    }

    /// Distinct values of `column` in `table`, or `None` if the table has no such column.
    pub fn distinct_count(&self, table: TableName, column: Column) -> Option<usize> {
        use Column as C;
        use TableName as T;

        let count = match (table, column) {
            (T::Concept, C::ConceptId) => distinct(self.concept.iter().map(|r| r.concept_id)),
            (T::ConceptRelationship, C::ConceptId) => distinct(
                self.concept_relationship
                    .iter()
                    .flat_map(|r| [r.concept_id_1, r.concept_id_2]),
            ),
            (T::ConceptSetContainer, C::ConceptSetName) => {
                distinct(self.concept_set_container.iter().map(|r| &r.concept_set_name))
            }
            (T::CodeSets, C::ConceptSetName) => distinct(self.code_sets.iter().map(|r| &r.concept_set_name)),
            (T::CodeSets, C::CodesetId) => distinct(self.code_sets.iter().map(|r| r.codeset_id)),
            (T::ConceptSetMembers, C::ConceptSetName) => {
                distinct(self.concept_set_members.iter().map(|r| &r.concept_set_name))
            }
            (T::ConceptSetMembers, C::CodesetId) => distinct(self.concept_set_members.iter().map(|r| r.codeset_id)),
            (T::ConceptSetMembers, C::ConceptId) => distinct(self.concept_set_members.iter().map(|r| r.concept_id)),
            (T::ConceptSetVersionItem, C::CodesetId) => {
                distinct(self.concept_set_version_item.iter().map(|r| r.codeset_id))
            }
            (T::ConceptSetVersionItem, C::ConceptId) => {
                distinct(self.concept_set_version_item.iter().map(|r| r.concept_id))
            }
            (T::ConceptSetCountsClamped, C::CodesetId) => {
                distinct(self.concept_set_counts_clamped.iter().map(|r| r.codeset_id))
            }
            (T::TermUsage, C::ConceptId) => distinct(self.term_usage.iter().map(|r| r.concept_id)),
            (T::AllCsets, C::ConceptSetName) => distinct(self.all_csets.iter().map(|r| &r.concept_set_name)),
            (T::AllCsets, C::CodesetId) => distinct(self.all_csets.iter().map(|r| r.codeset_id)),
            (T::ConceptUsage, C::ConceptId) => distinct(self.concept_usage.iter().map(|r| r.concept_id)),
            _ => return None,
        };

        Some(count)
    }

    fn counts(&self, table: TableName, columns: &[Column]) -> ColumnCounts {
        let mut counts = ColumnCounts::default();
        for &column in columns {
            counts.set(column, self.distinct_count(table, column));
        }
        counts
    }

    fn codeset_ids(&self) -> HashSet<CodesetId> {
        self.code_sets.iter().map(|r| r.codeset_id).collect()
    }

    fn member_concept_ids(&self) -> HashSet<ConceptId> {
        self.concept_set_members.iter().map(|r| r.concept_id).collect()
    }
}

/// One named step of the pipeline.
#[derive(Clone, Copy)]
pub struct CleaningStep {
    /// Diagnostic label.
    pub label: &'static str,
    /// Table the step rewrites.
    pub table: TableName,
    /// Columns whose distinct counts are recorded around the step.
    pub count_columns: &'static [Column],
    apply: fn(&mut Tables),
}

impl std::fmt::Debug for CleaningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleaningStep")
            .field("label", &self.label)
            .field("table", &self.table)
            .finish()
    }
}

impl CleaningStep {
    /// Runs the step and reports what it changed.
    pub fn run(&self, tables: &mut Tables) -> StepReport {
        let rows_before = tables.row_count(self.table);
        let before = tables.counts(self.table, self.count_columns);

        (self.apply)(tables);

        let rows_after = tables.row_count(self.table);
        let after = tables.counts(self.table, self.count_columns);
        let changed = rows_before != rows_after || before != after;

        if changed {
            tracing::info!(
                table = %self.table,
                rows_before,
                rows_after,
                ?before,
                ?after,
                "{}",
                self.label
            );
        } else {
            tracing::info!(table = %self.table, rows = rows_after, "{}. No change.", self.label);
        }

        StepReport {
            label: self.label,
            table: self.table,
            rows_before,
            rows_after,
            before,
            after,
            changed,
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step label.
    pub label: &'static str,
    /// Table the step rewrote.
    pub table: TableName,
    /// Rows before the step.
    pub rows_before: usize,
    /// Rows after the step.
    pub rows_after: usize,
    /// Distinct counts before the step.
    pub before: ColumnCounts,
    /// Distinct counts after the step.
    pub after: ColumnCounts,
    /// Whether the step changed the table.
    pub changed: bool,
}

/// Distinct counts observed on the raw tables before cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusEntry {
    /// What was counted.
    pub label: String,
    /// The counts.
    pub counts: ColumnCounts,
}

/// Diagnostics for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PipelineReport {
    /// Counts observed before any step ran.
    pub census: Vec<CensusEntry>,
    /// One report per step, in run order, across every pass.
    pub steps: Vec<StepReport>,
    /// Number of passes over the step sequence, the last of which changed nothing.
    pub passes: usize,
}

impl PipelineReport {
    /// Returns true if any step removed or rebuilt rows.
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|s| s.changed)
    }
}

/// An ordered sequence of cleaning steps.
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    steps: Vec<CleaningStep>,
}

impl Default for CleaningPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl CleaningPipeline {
    /// The standard step sequence.
    pub fn standard() -> Self {
        use Column::{CodesetId as Cs, ConceptId as Ci, ConceptSetName as Name};

        Self {
            steps: vec![
                step(
                    "concept_relationship restricted to subsumes, excluding self-loops",
                    TableName::ConceptRelationship,
                    &[Ci],
                    restrict_relationships,
                ),
                step(
                    "code_sets filtered to versions with concept_set_version_item rows",
                    TableName::CodeSets,
                    &[Cs],
                    drop_codesets_without_items,
                ),
                step(
                    "concept_set_container deduplicated by name, keeping most recent",
                    TableName::ConceptSetContainer,
                    &[Name],
                    dedupe_containers,
                ),
                step(
                    "concept_set_container filtered to exclude archived",
                    TableName::ConceptSetContainer,
                    &[Name],
                    drop_archived_containers,
                ),
                step(
                    "concept_set_members filtered to exclude archived",
                    TableName::ConceptSetMembers,
                    &[Cs, Ci],
                    drop_archived_members,
                ),
                step(
                    "concept_set_container filtered to have matching code_sets/versions",
                    TableName::ConceptSetContainer,
                    &[Name],
                    restrict_containers_to_codesets,
                ),
                step(
                    "code_sets filtered to have matching concept_set_container",
                    TableName::CodeSets,
                    &[Name, Cs],
                    restrict_codesets_to_containers,
                ),
                step(
                    "concept_set_members filtered to filtered code_sets",
                    TableName::ConceptSetMembers,
                    &[Cs, Ci],
                    restrict_members_to_codesets,
                ),
                step(
                    "concept_set_version_item filtered to member concepts",
                    TableName::ConceptSetVersionItem,
                    &[Cs, Ci],
                    restrict_items_to_member_concepts,
                ),
                step(
                    "concept filtered to member and related concepts",
                    TableName::Concept,
                    &[Ci],
                    restrict_concepts_to_findable,
                ),
                step(
                    "all_csets built from code_sets, containers, member and usage counts",
                    TableName::AllCsets,
                    &[Name, Cs],
                    build_all_csets,
                ),
                step(
                    "concept usage combined across domains",
                    TableName::ConceptUsage,
                    &[Ci],
                    build_concept_usage,
                ),
            ],
        }
    }

    /// Returns the steps in run order.
    pub fn steps(&self) -> &[CleaningStep] {
        &self.steps
    }

    /// Runs the step sequence over `tables` until a pass changes nothing.
    pub fn run(&self, tables: &mut Tables) -> PipelineReport {
        let census = census(tables);
        let mut steps = Vec::new();
        let mut passes = 0;

        // Filters only remove rows and builds are pure, so this terminates.
        loop {
            passes += 1;
            let before = steps.len();
            steps.extend(self.steps.iter().map(|step| step.run(tables)));
            if !steps[before..].iter().any(|s: &StepReport| s.changed) {
                break;
            }
        }

        tracing::debug!(passes, "Cleaning converged");
        PipelineReport { census, steps, passes }
    }
}

/// Cleans raw tables into a snapshot.
///
/// # Errors
/// Returns [`EngineError::SnapshotBuildFailure`] if a required table is absent.
pub fn clean(raw: RawTables) -> EngineResult<Snapshot> {
    let mut tables = Tables::try_from(raw)?;
    let report = CleaningPipeline::standard().run(&mut tables);
    Ok(Snapshot::from_tables(tables, report))
}

fn step(
    label: &'static str,
    table: TableName,
    count_columns: &'static [Column],
    apply: fn(&mut Tables),
) -> CleaningStep {
    CleaningStep {
        label,
        table,
        count_columns,
        apply,
    }
}

fn census(tables: &Tables) -> Vec<CensusEntry> {
    use Column::{CodesetId as Cs, ConceptId as Ci, ConceptSetName as Name};

    let mut entries = vec![
        entry("concept_set_container", tables.counts(TableName::ConceptSetContainer, &[Name])),
        entry("code_sets", tables.counts(TableName::CodeSets, &[Name, Cs])),
        entry("concept_set_members", tables.counts(TableName::ConceptSetMembers, &[Name, Cs, Ci])),
        entry("concept_set_version_item", tables.counts(TableName::ConceptSetVersionItem, &[Cs, Ci])),
    ];

    let container_names: HashSet<&str> = tables
        .concept_set_container
        .iter()
        .map(|r| r.concept_set_name.as_str())
        .collect();
    let codeset_names: HashSet<&str> = tables.code_sets.iter().map(|r| r.concept_set_name.as_str()).collect();
    let codesets = tables.codeset_ids();
    let member_codesets: HashSet<CodesetId> = tables.concept_set_members.iter().map(|r| r.codeset_id).collect();
    let item_codesets: HashSet<CodesetId> = tables.concept_set_version_item.iter().map(|r| r.codeset_id).collect();
    let member_concepts = tables.member_concept_ids();
    let item_concepts: HashSet<ConceptId> = tables.concept_set_version_item.iter().map(|r| r.concept_id).collect();

    entries.push(entry(
        "intersection(containers, codesets)",
        ColumnCounts {
            concept_set_name: Some(container_names.intersection(&codeset_names).count()),
            ..Default::default()
        },
    ));
    entries.push(entry(
        "intersection(codesets, members, version_items)",
        ColumnCounts {
            codeset_id: Some(
                codesets
                    .iter()
                    .filter(|id| member_codesets.contains(id) && item_codesets.contains(id))
                    .count(),
            ),
            ..Default::default()
        },
    ));
    entries.push(entry(
        "intersection(codesets, version_items)",
        ColumnCounts {
            codeset_id: Some(codesets.intersection(&item_codesets).count()),
            ..Default::default()
        },
    ));
    entries.push(entry(
        "intersection(members, version_items)",
        ColumnCounts {
            codeset_id: Some(member_codesets.intersection(&item_codesets).count()),
            concept_id: Some(member_concepts.intersection(&item_concepts).count()),
            ..Default::default()
        },
    ));

    for e in &entries {
        tracing::debug!(counts = ?e.counts, "{}", e.label);
    }
    entries
}

fn entry(label: &str, counts: ColumnCounts) -> CensusEntry {
    CensusEntry {
        label: label.to_string(),
        counts,
    }
}

// =============================================================================
// Cleaning steps
// =============================================================================

fn restrict_relationships(t: &mut Tables) {
    t.concept_relationship.retain(|r| r.is_subsumes() && !r.is_self_loop());
}

fn drop_codesets_without_items(t: &mut Tables) {
    let with_items: HashSet<CodesetId> = t.concept_set_version_item.iter().map(|r| r.codeset_id).collect();
    t.code_sets.retain(|r| with_items.contains(&r.codeset_id));
}

/// Keeps one container per name: the greatest `created_at`, first seen on ties.
fn dedupe_containers(t: &mut Tables) {
    let mut best: HashMap<&str, usize> = HashMap::new();
    for (i, container) in t.concept_set_container.iter().enumerate() {
        best.entry(container.concept_set_name.as_str())
            .and_modify(|kept| {
                if container.created_at > t.concept_set_container[*kept].created_at {
                    *kept = i;
                }
            })
            .or_insert(i);
    }

    let keep: HashSet<usize> = best.into_values().collect();
    let mut position = 0;
    t.concept_set_container.retain(|_| {
        let kept = keep.contains(&position);
        position += 1;
        kept
    });
}

fn drop_archived_containers(t: &mut Tables) {
    t.concept_set_container.retain(|r| !r.archived);
}

fn drop_archived_members(t: &mut Tables) {
    t.concept_set_members.retain(|r| !r.archived);
}

fn shared_names(t: &Tables) -> HashSet<String> {
    let codeset_names: HashSet<&str> = t.code_sets.iter().map(|r| r.concept_set_name.as_str()).collect();
    t.concept_set_container
        .iter()
        .map(|r| r.concept_set_name.as_str())
        .filter(|name| codeset_names.contains(name))
        .map(str::to_string)
        .collect()
}

fn restrict_containers_to_codesets(t: &mut Tables) {
    let names = shared_names(t);
    t.concept_set_container.retain(|r| names.contains(&r.concept_set_name));
}

fn restrict_codesets_to_containers(t: &mut Tables) {
    let names = shared_names(t);
    t.code_sets.retain(|r| names.contains(&r.concept_set_name));
}

fn restrict_members_to_codesets(t: &mut Tables) {
    let codesets = t.codeset_ids();
    t.concept_set_members.retain(|r| codesets.contains(&r.codeset_id));
}

fn restrict_items_to_member_concepts(t: &mut Tables) {
    let members = t.member_concept_ids();
    t.concept_set_version_item.retain(|r| members.contains(&r.concept_id));
}

fn restrict_concepts_to_findable(t: &mut Tables) {
    let mut findable = t.member_concept_ids();
    findable.extend(
        t.concept_relationship
            .iter()
            .flat_map(|r| [r.concept_id_1, r.concept_id_2]),
    );
    t.concept.retain(|r| findable.contains(&r.concept_id));
}

fn build_all_csets(t: &mut Tables) {
    let containers: HashMap<&str, &ConceptSetContainer> = t
        .concept_set_container
        .iter()
        .map(|c| (c.concept_set_name.as_str(), c))
        .collect();

    let mut members: HashMap<CodesetId, HashSet<ConceptId>> = HashMap::new();
    for m in &t.concept_set_members {
        members.entry(m.codeset_id).or_default().insert(m.concept_id);
    }

    let mut counts: HashMap<CodesetId, Vec<&CsetCounts>> = HashMap::new();
    for c in &t.concept_set_counts_clamped {
        counts.entry(c.codeset_id).or_default().push(c);
    }

    let mut all_csets: Vec<CsetSummary> = Vec::new();
    for codeset in &t.code_sets {
        let Some(container) = containers.get(codeset.concept_set_name.as_str()) else {
            continue;
        };
        let Some(concepts) = members.get(&codeset.codeset_id).map(HashSet::len) else {
            continue;
        };
        let usage_rows = counts.get(&codeset.codeset_id).map_or(&[][..], Vec::as_slice);
        if usage_rows.len() > 1 {
            // Inner join: one all_csets row per counts row.
            tracing::debug!(
                codeset_id = codeset.codeset_id,
                rows = usage_rows.len(),
                "Codeset has several concept_set_counts_clamped rows"
            );
        }
        for usage in usage_rows {
            all_csets.push(CsetSummary::join(codeset, container, concepts, usage));
        }
    }

    all_csets.sort_by_key(|r| r.codeset_id);
    all_csets.dedup();
    t.all_csets = all_csets;
}

fn build_concept_usage(t: &mut Tables) {
    let mut by_concept: HashMap<ConceptId, Vec<&TermUsage>> = HashMap::new();
    for usage in &t.term_usage {
        by_concept.entry(usage.concept_id).or_default().push(usage);
    }

    let mut concept_ids: Vec<ConceptId> = t.concept.iter().map(|c| c.concept_id).collect();
    concept_ids.sort_unstable();
    concept_ids.dedup();

    t.concept_usage = concept_ids
        .into_iter()
        .map(|id| match by_concept.get(&id) {
            Some(rows) => ConceptUsage::aggregate(id, rows.iter().copied()),
            None => ConceptUsage::none(id),
        })
        .collect();
}

//! Query facade.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use termhub_loader::termhub_types::{CodesetId, Concept, ConceptId, CsetSummary, Researcher};
use termhub_loader::{
    discover_tables, flatten, score, CsetMemberItem, EngineError, Hierarchy, PipelineReport,
    RawTables, RelatedCset, Snapshot, SnapshotRegistry, TableConfig,
};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Parses a pipe-delimited codeset id list such as `"1|2|3"`.
///
/// An empty string gives an empty list; empty segments are ignored.
///
/// # Errors
/// Returns [`ServiceError::InvalidCodesetIds`] if a segment is not an integer.
pub fn parse_codeset_ids(value: &str) -> ServiceResult<Vec<CodesetId>> {
    value
        .split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.parse().map_err(|_| ServiceError::InvalidCodesetIds {
                value: value.to_string(),
            })
        })
        .collect()
}

/// One entry of the codeset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsetListing {
    /// Codeset version id.
    pub codeset_id: CodesetId,
    /// Version title.
    pub concept_set_version_title: String,
    /// Distinct member concepts.
    pub concepts: usize,
}

/// Everything the hierarchy view needs for a selection.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyResponse {
    /// Codesets sharing a concept with the selection.
    pub related_csets: Vec<RelatedCset>,
    /// The selected codesets.
    pub selected_csets: Vec<RelatedCset>,
    /// Membership of the selected codesets.
    pub cset_members_items: Vec<CsetMemberItem>,
    /// Nested hierarchy of the selected concepts.
    pub hierarchy: Hierarchy,
    /// Concept details.
    pub concepts: Vec<Concept>,
    /// Researchers referenced by the selected codesets.
    pub researchers: Vec<Researcher>,
    /// Cleaning diagnostics for the snapshot that answered.
    pub data_counts: PipelineReport,
}

/// A codeset with its member concept details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsetDownload {
    /// The summary row.
    #[serde(flatten)]
    pub cset: CsetSummary,
    /// Number of member concepts with details.
    pub concept_count: usize,
    /// Member concept details, ordered by id.
    pub concepts: Vec<Concept>,
}

/// Read-side entry point over the current snapshot.
#[derive(Debug, Clone)]
pub struct TermhubService {
    registry: Arc<SnapshotRegistry>,
}

impl TermhubService {
    /// Creates a service over an existing registry.
    pub fn new(registry: Arc<SnapshotRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a service serving `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(Arc::new(SnapshotRegistry::new(snapshot)))
    }

    /// Loads, cleans and serves the dataset named by `config`.
    ///
    /// # Errors
    /// Returns a load error if the tables cannot be read, or an engine error
    /// if cleaning fails.
    pub fn load(config: &ServiceConfig) -> ServiceResult<Self> {
        let service = Self::from_snapshot(Snapshot::default());
        service.reload(&config.data_path, &config.tables)?;
        Ok(service)
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &Arc<SnapshotRegistry> {
        &self.registry
    }

    /// The snapshot currently served.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.registry.current()
    }

    /// Every codeset in the snapshot, ordered by id.
    pub fn all_csets(&self) -> Vec<CsetListing> {
        self.snapshot()
            .all_csets()
            .iter()
            .map(|row| CsetListing {
                codeset_id: row.codeset_id,
                concept_set_version_title: row.concept_set_version_title.clone(),
                concepts: row.concepts,
            })
            .collect()
    }

    /// Summary rows for the given codesets, ordered by id. Unknown ids are skipped.
    pub fn selected_csets(&self, codeset_ids: &[CodesetId]) -> Vec<CsetSummary> {
        let snapshot = self.snapshot();
        let ids: BTreeSet<CodesetId> = codeset_ids.iter().copied().collect();
        ids.into_iter()
            .filter_map(|id| snapshot.cset(id))
            .cloned()
            .collect()
    }

    /// Related codesets, membership and hierarchy for a selection.
    ///
    /// # Errors
    /// Propagates [`EngineError::EmptySelection`] and
    /// [`EngineError::ZeroMemberCodeset`].
    pub fn cr_hierarchy(&self, codeset_ids: &[CodesetId]) -> ServiceResult<HierarchyResponse> {
        let snapshot = self.snapshot();
        let result = score(codeset_ids.iter().copied(), &snapshot)?;

        Ok(HierarchyResponse {
            related_csets: result.related_csets,
            selected_csets: result.selected_csets,
            cset_members_items: result.cset_members_items,
            hierarchy: result.hierarchy,
            concepts: result.concepts,
            researchers: result.researchers,
            data_counts: snapshot.report().clone(),
        })
    }

    /// A codeset's summary and member concept details.
    ///
    /// # Errors
    /// Returns [`EngineError::MalformedInput`] if the codeset is unknown.
    pub fn cset_download(&self, codeset_id: CodesetId) -> ServiceResult<CsetDownload> {
        let snapshot = self.snapshot();
        let cset = snapshot
            .cset(codeset_id)
            .cloned()
            .ok_or(EngineError::MalformedInput { codeset_id })?;
        let concepts = snapshot.concepts_for(snapshot.member_concepts(codeset_id));

        Ok(CsetDownload {
            cset,
            concept_count: concepts.len(),
            concepts,
        })
    }

    /// Direct children of a concept, or `None` if it has no outgoing edges.
    pub fn children_of(&self, concept_id: ConceptId) -> Option<Vec<ConceptId>> {
        self.snapshot().index().children_of(concept_id).map(|kids| kids.to_vec())
    }

    /// Hierarchy under `roots` across the whole snapshot.
    pub fn flatten(&self, roots: &[ConceptId]) -> Hierarchy {
        let roots: BTreeSet<ConceptId> = roots.iter().copied().collect();
        flatten(&roots, self.snapshot().index())
    }

    /// Rebuilds the snapshot from raw tables.
    ///
    /// # Errors
    /// Returns the cleaning error; the current snapshot keeps serving.
    pub fn refresh(&self, raw: RawTables) -> ServiceResult<()> {
        self.registry.rebuild(raw)?;
        Ok(())
    }

    /// Reads the tables under `path` and rebuilds the snapshot from them.
    ///
    /// # Errors
    /// Returns a load error if discovery or parsing fails, or the cleaning
    /// error. The current snapshot keeps serving on failure.
    pub fn reload(&self, path: &Path, config: &TableConfig) -> ServiceResult<()> {
        tracing::info!("Loading tables from: {}", path.display());
        let files = discover_tables(path)?;

        #[cfg(feature = "parallel")]
        let raw = termhub_loader::load_tables_parallel(&files, config)?;
        #[cfg(not(feature = "parallel"))]
        let raw = termhub_loader::load_tables(&files, config)?;

        self.refresh(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termhub_loader::termhub_types::{
        Codeset, ConceptRelationshipRow, ConceptRow, ConceptSetContainer, ConceptSetMember,
        ConceptSetVersionItem, CsetCounts,
    };

    fn raw() -> RawTables {
        let container = |name: &str| ConceptSetContainer {
            concept_set_name: name.to_string(),
            created_at: "2022-01-01".to_string(),
            ..Default::default()
        };
        let codeset = |id, name: &str| Codeset {
            codeset_id: id,
            concept_set_name: name.to_string(),
            concept_set_version_title: format!("{name} v1"),
            ..Default::default()
        };
        let item = |codeset_id, concept_id| ConceptSetVersionItem {
            codeset_id,
            concept_id,
            include_descendants: true,
            include_mapped: false,
            is_excluded: false,
        };
        let counts = |codeset_id| CsetCounts {
            codeset_id,
            approx_distinct_person_count: 1,
            approx_total_record_count: 1,
        };

        RawTables {
            concept: Some((1..=4).map(|id| ConceptRow::new(id, format!("c{id}"))).collect()),
            concept_relationship: Some(vec![
                ConceptRelationshipRow::subsumes(1, 2),
                ConceptRelationshipRow::subsumes(2, 3),
                ConceptRelationshipRow::subsumes(1, 4),
            ]),
            concept_set_container: Some(vec![container("Hypertension"), container("Stroke")]),
            code_sets: Some(vec![codeset(10, "Hypertension"), codeset(20, "Stroke")]),
            concept_set_members: Some(vec![
                ConceptSetMember::new(10, 1, "Hypertension"),
                ConceptSetMember::new(10, 2, "Hypertension"),
                ConceptSetMember::new(20, 2, "Stroke"),
                ConceptSetMember::new(20, 3, "Stroke"),
            ]),
            concept_set_version_item: Some(vec![item(10, 1), item(20, 2)]),
            concept_set_counts_clamped: Some(vec![counts(10), counts(20)]),
            term_usage: Some(vec![]),
            researcher: None,
        }
    }

    fn service() -> TermhubService {
        let service = TermhubService::from_snapshot(Snapshot::default());
        service.refresh(raw()).unwrap();
        service
    }

    #[test]
    fn test_parse_codeset_ids() {
        assert_eq!(parse_codeset_ids("1|2|3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_codeset_ids("").unwrap(), Vec::<CodesetId>::new());
        assert_eq!(parse_codeset_ids(" 7 | 8 ").unwrap(), vec![7, 8]);
        assert!(matches!(
            parse_codeset_ids("1|x"),
            Err(ServiceError::InvalidCodesetIds { value }) if value == "1|x"
        ));
    }

    #[test]
    fn test_all_and_selected_csets() {
        let service = service();
        let listing = service.all_csets();
        assert_eq!(
            listing,
            vec![
                CsetListing {
                    codeset_id: 10,
                    concept_set_version_title: "Hypertension v1".to_string(),
                    concepts: 2,
                },
                CsetListing {
                    codeset_id: 20,
                    concept_set_version_title: "Stroke v1".to_string(),
                    concepts: 2,
                },
            ]
        );

        let selected = service.selected_csets(&[20, 999, 20]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].concept_set_name, "Stroke");
    }

    #[test]
    fn test_cr_hierarchy() {
        let service = service();
        let response = service.cr_hierarchy(&[10]).unwrap();

        assert_eq!(serde_json::to_string(&response.hierarchy).unwrap(), r#"{"1":{"2":null}}"#);
        assert_eq!(response.selected_csets.len(), 1);
        assert_eq!(response.related_csets.len(), 2);
        assert_eq!(response.cset_members_items.len(), 2);
        assert!(response.researchers.is_empty());
        assert!(!response.data_counts.steps.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["related_csets"][0]["codeset_id"], 10);
    }

    #[test]
    fn test_cr_hierarchy_empty_selection() {
        let service = service();
        let err = service.cr_hierarchy(&[]).unwrap_err();
        assert!(matches!(err, ServiceError::Engine(EngineError::EmptySelection)));
    }

    #[test]
    fn test_cset_download() {
        let service = service();
        let download = service.cset_download(20).unwrap();
        assert_eq!(download.concept_count, 2);
        let ids: Vec<_> = download.concepts.iter().map(|c| c.concept_id).collect();
        assert_eq!(ids, vec![2, 3]);

        let err = service.cset_download(404).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Engine(EngineError::MalformedInput { codeset_id: 404 })
        ));
    }

    #[test]
    fn test_children_and_flatten() {
        let service = service();
        assert_eq!(service.children_of(1), Some(vec![2, 4]));
        assert_eq!(service.children_of(3), None);

        let tree = service.flatten(&[1]);
        assert_eq!(
            serde_json::to_string(&tree).unwrap(),
            r#"{"1":{"2":{"3":null},"4":null}}"#
        );
    }

    #[test]
    fn test_failed_refresh_keeps_serving() {
        let service = service();
        let broken = RawTables {
            concept: None,
            ..raw()
        };
        assert!(service.refresh(broken).is_err());
        assert_eq!(service.all_csets().len(), 2);
    }

    #[test]
    fn test_reload_missing_directory() {
        let service = service();
        let err = service
            .reload(Path::new("/nonexistent/termhub"), &TableConfig::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Load(_)));
        assert_eq!(service.all_csets().len(), 2);
    }
}

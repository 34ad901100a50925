//! Dataset discovery and table loading.
//!
//! A dataset directory holds one CSV per table, named after the table.
//! Object tables such as `researcher` may instead live under
//! `objects/<name>/latest.csv`.

use std::path::{Path, PathBuf};

use termhub_types::{
    Codeset, ConceptRelationshipRow, ConceptRow, ConceptSetContainer, ConceptSetMember,
    ConceptSetVersionItem, CsetCounts, Researcher, TermUsage,
};

use crate::parser::{TableParser, TableRecord};
use crate::types::{LoadError, LoadResult, TableConfig, TableFiles, TableName};

/// Raw row-sets as read from source, one per table.
///
/// A table whose source was not found is `None`.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    /// `concept`
    pub concept: Option<Vec<ConceptRow>>,
    /// `concept_relationship`
    pub concept_relationship: Option<Vec<ConceptRelationshipRow>>,
    /// `concept_set_container`
    pub concept_set_container: Option<Vec<ConceptSetContainer>>,
    /// `code_sets`
    pub code_sets: Option<Vec<Codeset>>,
    /// `concept_set_members`
    pub concept_set_members: Option<Vec<ConceptSetMember>>,
    /// `concept_set_version_item`
    pub concept_set_version_item: Option<Vec<ConceptSetVersionItem>>,
    /// `concept_set_counts_clamped`
    pub concept_set_counts_clamped: Option<Vec<CsetCounts>>,
    /// `deidentified_term_usage_by_domain_clamped`
    pub term_usage: Option<Vec<TermUsage>>,
    /// `researcher`
    pub researcher: Option<Vec<Researcher>>,
}

impl RawTables {
    /// Returns the required tables that are absent.
    pub fn missing_tables(&self) -> Vec<TableName> {
        let present = [
            (TableName::Concept, self.concept.is_some()),
            (TableName::ConceptRelationship, self.concept_relationship.is_some()),
            (TableName::ConceptSetContainer, self.concept_set_container.is_some()),
            (TableName::CodeSets, self.code_sets.is_some()),
            (TableName::ConceptSetMembers, self.concept_set_members.is_some()),
            (TableName::ConceptSetVersionItem, self.concept_set_version_item.is_some()),
            (TableName::ConceptSetCountsClamped, self.concept_set_counts_clamped.is_some()),
            (TableName::TermUsage, self.term_usage.is_some()),
            (TableName::Researcher, self.researcher.is_some()),
        ];

        present
            .into_iter()
            .filter(|(table, found)| table.is_required() && !found)
            .map(|(table, _)| table)
            .collect()
    }
}

/// Discovers table files in a dataset directory.
pub fn discover_tables<P: AsRef<Path>>(path: P) -> LoadResult<TableFiles> {
    let path = path.as_ref();

    if !path.is_dir() {
        return Err(LoadError::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }

    let csv = |stem: &str| existing(path.join(format!("{stem}.csv")));

    let files = TableFiles {
        directory: path.to_path_buf(),
        concept: csv("concept"),
        concept_relationship: csv("concept_relationship_subsumes_only")
            .or_else(|| csv("concept_relationship")),
        concept_set_container: csv("concept_set_container"),
        code_sets: csv("code_sets"),
        concept_set_members: csv("concept_set_members"),
        concept_set_version_item: csv("concept_set_version_item"),
        concept_set_counts_clamped: csv("concept_set_counts_clamped"),
        term_usage: csv("deidentified_term_usage_by_domain_clamped"),
        researcher: csv("researcher")
            .or_else(|| existing(path.join("objects").join("researcher").join("latest.csv"))),
    };

    if !files.has_required_files() {
        return Err(LoadError::RequiredTableMissing {
            tables: files.missing_files().join(", "),
            directory: path.display().to_string(),
        });
    }

    Ok(files)
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Loads one table if its file was discovered.
pub fn load_table<T: TableRecord>(path: Option<&PathBuf>, config: &TableConfig) -> LoadResult<Option<Vec<T>>> {
    let Some(path) = path else {
        return Ok(None);
    };

    tracing::debug!("loading: {}", path.display());
    let rows = TableParser::<_, T>::from_path(path, config.clone())?.parse_all()?;
    tracing::info!(table = T::TABLE, rows = rows.len(), "loaded table");
    Ok(Some(rows))
}

/// Loads all discovered tables sequentially.
pub fn load_tables(files: &TableFiles, config: &TableConfig) -> LoadResult<RawTables> {
    Ok(RawTables {
        concept: load_table(files.concept.as_ref(), config)?,
        concept_relationship: load_table(files.concept_relationship.as_ref(), config)?,
        concept_set_container: load_table(files.concept_set_container.as_ref(), config)?,
        code_sets: load_table(files.code_sets.as_ref(), config)?,
        concept_set_members: load_table(files.concept_set_members.as_ref(), config)?,
        concept_set_version_item: load_table(files.concept_set_version_item.as_ref(), config)?,
        concept_set_counts_clamped: load_table(files.concept_set_counts_clamped.as_ref(), config)?,
        term_usage: load_table(files.term_usage.as_ref(), config)?,
        researcher: load_table(files.researcher.as_ref(), config)?,
    })
}

/// Loads all discovered tables, parsing each file on its own rayon task.
#[cfg(feature = "parallel")]
pub fn load_tables_parallel(files: &TableFiles, config: &TableConfig) -> LoadResult<RawTables> {
    let mut concept: LoadResult<Option<Vec<ConceptRow>>> = Ok(None);
    let mut concept_relationship: LoadResult<Option<Vec<ConceptRelationshipRow>>> = Ok(None);
    let mut concept_set_container: LoadResult<Option<Vec<ConceptSetContainer>>> = Ok(None);
    let mut code_sets: LoadResult<Option<Vec<Codeset>>> = Ok(None);
    let mut concept_set_members: LoadResult<Option<Vec<ConceptSetMember>>> = Ok(None);
    let mut concept_set_version_item: LoadResult<Option<Vec<ConceptSetVersionItem>>> = Ok(None);
    let mut concept_set_counts_clamped: LoadResult<Option<Vec<CsetCounts>>> = Ok(None);
    let mut term_usage: LoadResult<Option<Vec<TermUsage>>> = Ok(None);
    let mut researcher: LoadResult<Option<Vec<Researcher>>> = Ok(None);

    rayon::scope(|s| {
        s.spawn(|_| concept = load_table(files.concept.as_ref(), config));
        s.spawn(|_| concept_relationship = load_table(files.concept_relationship.as_ref(), config));
        s.spawn(|_| concept_set_container = load_table(files.concept_set_container.as_ref(), config));
        s.spawn(|_| code_sets = load_table(files.code_sets.as_ref(), config));
        s.spawn(|_| concept_set_members = load_table(files.concept_set_members.as_ref(), config));
        s.spawn(|_| concept_set_version_item = load_table(files.concept_set_version_item.as_ref(), config));
        s.spawn(|_| concept_set_counts_clamped = load_table(files.concept_set_counts_clamped.as_ref(), config));
        s.spawn(|_| term_usage = load_table(files.term_usage.as_ref(), config));
        s.spawn(|_| researcher = load_table(files.researcher.as_ref(), config));
    });

    Ok(RawTables {
        concept: concept?,
        concept_relationship: concept_relationship?,
        concept_set_container: concept_set_container?,
        code_sets: code_sets?,
        concept_set_members: concept_set_members?,
        concept_set_version_item: concept_set_version_item?,
        concept_set_counts_clamped: concept_set_counts_clamped?,
        term_usage: term_usage?,
        researcher: researcher?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_missing_directory() {
        let err = discover_tables("/definitely/not/a/termhub/dataset").unwrap_err();
        assert!(matches!(err, LoadError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_load_table_absent_file() {
        let rows: Option<Vec<ConceptRow>> = load_table(None, &TableConfig::default()).unwrap();
        assert!(rows.is_none());
    }

    #[test]
    fn test_raw_tables_missing() {
        let raw = RawTables {
            concept: Some(vec![]),
            ..Default::default()
        };
        let missing = raw.missing_tables();
        assert_eq!(missing.len(), 7);
        assert!(!missing.contains(&TableName::Concept));
        assert!(!missing.contains(&TableName::Researcher));
    }

    fn write_dataset(dir: &Path) {
        let tables = [
            ("concept", "concept_id,concept_name,domain_id\n1,Diabetes,Condition\n2,Type 2 diabetes,Condition\n"),
            (
                "concept_relationship",
                "concept_id_1,concept_id_2,relationship_id\n1,2,Subsumes\n2,2,Subsumes\n1,2,Maps to\n",
            ),
            ("concept_set_container", "concept_set_name,archived,created_at\nDiabetes,False,2022-01-01\n"),
            ("code_sets", "codeset_id,concept_set_name,version\n100,Diabetes,2.0\n"),
            ("concept_set_members", "codeset_id,concept_id,concept_set_name,archived\n100,1,Diabetes,False\n100,2,Diabetes,False\n"),
            (
                "concept_set_version_item",
                "codeset_id,concept_id,includeDescendants,includeMapped,isExcluded\n100,1,True,False,False\n",
            ),
            ("concept_set_counts_clamped", "codeset_id,approx_distinct_person_count,approx_total_record_count\n100,20,\n"),
            (
                "deidentified_term_usage_by_domain_clamped",
                "concept_id,domain,total_count,distinct_person_count\n2,condition_occurrence,9,3\n",
            ),
        ];
        for (name, contents) in tables {
            std::fs::write(dir.join(format!("{name}.csv")), contents).unwrap();
        }
    }

    #[test]
    fn test_discover_and_load_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let files = discover_tables(dir.path()).unwrap();
        assert!(files.researcher.is_none());

        let raw = load_tables(&files, &TableConfig::default()).unwrap();
        assert_eq!(raw.concept.as_ref().map(Vec::len), Some(2));
        // self-loop and non-subsumes rows filtered at read time
        assert_eq!(raw.concept_relationship.as_ref().map(Vec::len), Some(1));
        assert_eq!(raw.code_sets.as_ref().unwrap()[0].version, Some(2));
        assert!(raw.researcher.is_none());
        assert!(raw.missing_tables().is_empty());
    }

    #[test]
    fn test_discover_prefers_subsumes_only_export() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::write(dir.path().join("concept_relationship_subsumes_only.csv"), "concept_id_1,concept_id_2\n1,2\n").unwrap();

        let files = discover_tables(dir.path()).unwrap();
        let chosen = files.concept_relationship.unwrap();
        assert!(chosen.ends_with("concept_relationship_subsumes_only.csv"));
    }

    #[test]
    fn test_researcher_object_location() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let objects = dir.path().join("objects").join("researcher");
        std::fs::create_dir_all(&objects).unwrap();
        std::fs::write(objects.join("latest.csv"), "multipassId,name\nr1,Ada\n").unwrap();

        let files = discover_tables(dir.path()).unwrap();
        let raw = load_tables(&files, &TableConfig::default()).unwrap();
        assert_eq!(raw.researcher.unwrap()[0].name, "Ada");
    }

    #[test]
    fn test_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::remove_file(dir.path().join("code_sets.csv")).unwrap();

        let err = discover_tables(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::RequiredTableMissing { tables, .. } if tables.contains("code_sets")));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_load_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let files = discover_tables(dir.path()).unwrap();
        let config = TableConfig::default();

        let sequential = load_tables(&files, &config).unwrap();
        let parallel = load_tables_parallel(&files, &config).unwrap();
        assert_eq!(parallel.concept, sequential.concept);
        assert_eq!(parallel.concept_set_members, sequential.concept_set_members);
        assert_eq!(parallel.term_usage, sequential.term_usage);
    }

    #[test]
    fn test_loaded_dataset_cleans() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let files = discover_tables(dir.path()).unwrap();
        let snapshot = crate::pipeline::clean(load_tables(&files, &TableConfig::default()).unwrap()).unwrap();

        assert_eq!(snapshot.all_csets().len(), 1);
        assert_eq!(snapshot.all_csets()[0].concepts, 2);
        assert_eq!(snapshot.all_csets()[0].approx_total_record_count, 0);
        assert_eq!(snapshot.concept(2).unwrap().total_count, 9);
    }
}

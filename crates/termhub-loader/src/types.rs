//! Loader and engine types: errors, configuration and discovered files.

use std::fmt;
use std::path::PathBuf;

use termhub_types::{CodesetId, ConceptId};
use thiserror::Error;

/// Errors that can occur while reading raw tables.
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O error reading a table file.
    #[error("IO error reading table: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing required column in a table.
    #[error("Missing required column '{column}' in {table}")]
    MissingColumn {
        /// The table being read.
        table: &'static str,
        /// The name of the missing column.
        column: String,
    },

    /// Invalid integer value.
    #[error("Invalid integer value: {value}")]
    InvalidInteger {
        /// The invalid value.
        value: String,
    },

    /// Invalid boolean value.
    #[error("Invalid boolean value: {value}")]
    InvalidBoolean {
        /// The invalid value.
        value: String,
    },

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Directory not found.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Required table missing from a dataset directory.
    #[error("Required table not found: {tables} in {directory}")]
    RequiredTableMissing {
        /// Names of the missing tables.
        tables: String,
        /// The directory that was searched.
        directory: String,
    },
}

/// Result type for table loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised by the cleaning pipeline and the scoring engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A requested codeset does not exist in the snapshot.
    #[error("Unknown codeset id: {codeset_id}")]
    MalformedInput {
        /// The unknown codeset.
        codeset_id: CodesetId,
    },

    /// The selection resolved to no concepts, so recall is undefined.
    #[error("Selection contains no concepts")]
    EmptySelection,

    /// A related codeset has no members, so precision is undefined.
    #[error("Codeset {codeset_id} has no member concepts")]
    ZeroMemberCodeset {
        /// The empty codeset.
        codeset_id: CodesetId,
    },

    /// The relationship subgraph contains a cycle through this concept.
    #[error("Cycle detected at concept {concept_id}; branch truncated")]
    CycleDetected {
        /// The concept revisited on the current path.
        concept_id: ConceptId,
    },

    /// A cleaning step could not proceed.
    #[error("Snapshot build failed: {reason}")]
    SnapshotBuildFailure {
        /// What was wrong with the input.
        reason: String,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The raw and derived tables the pipeline works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    /// `concept`
    Concept,
    /// `concept_relationship`
    ConceptRelationship,
    /// `concept_set_container`
    ConceptSetContainer,
    /// `code_sets`
    CodeSets,
    /// `concept_set_members`
    ConceptSetMembers,
    /// `concept_set_version_item`
    ConceptSetVersionItem,
    /// `concept_set_counts_clamped`
    ConceptSetCountsClamped,
    /// `deidentified_term_usage_by_domain_clamped`
    #[serde(rename = "deidentified_term_usage_by_domain_clamped")]
    TermUsage,
    /// `researcher`
    Researcher,
    /// Derived `all_csets` view.
    AllCsets,
    /// Derived per-concept usage aggregate.
    ConceptUsage,
}

impl TableName {
    /// Tables read from source data.
    pub const SOURCES: [TableName; 9] = [
        Self::Concept,
        Self::ConceptRelationship,
        Self::ConceptSetContainer,
        Self::CodeSets,
        Self::ConceptSetMembers,
        Self::ConceptSetVersionItem,
        Self::ConceptSetCountsClamped,
        Self::TermUsage,
        Self::Researcher,
    ];

    /// Table name as used in file names and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::ConceptRelationship => "concept_relationship",
            Self::ConceptSetContainer => "concept_set_container",
            Self::CodeSets => "code_sets",
            Self::ConceptSetMembers => "concept_set_members",
            Self::ConceptSetVersionItem => "concept_set_version_item",
            Self::ConceptSetCountsClamped => "concept_set_counts_clamped",
            Self::TermUsage => "deidentified_term_usage_by_domain_clamped",
            Self::Researcher => "researcher",
            Self::AllCsets => "all_csets",
            Self::ConceptUsage => "concept_usage",
        }
    }

    /// Returns true if a snapshot cannot be built without this table.
    pub fn is_required(self) -> bool {
        !matches!(self, Self::Researcher | Self::AllCsets | Self::ConceptUsage)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for table parsing.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Field delimiter.
    pub delimiter: u8,
    /// Relationship filtering applied while reading `concept_relationship`.
    pub relationships: RelationshipConfig,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            relationships: RelationshipConfig::subsumes_only(),
        }
    }
}

/// Configuration specific to relationship parsing.
#[derive(Debug, Clone, Default)]
pub struct RelationshipConfig {
    /// Relationship ids to keep (empty = all kinds).
    pub relationship_ids: Vec<String>,
    /// Whether to drop rows whose endpoints are the same concept.
    pub exclude_self_loops: bool,
}

impl RelationshipConfig {
    /// Keeps only `Subsumes` rows and drops self-loops.
    pub fn subsumes_only() -> Self {
        Self {
            relationship_ids: vec![termhub_types::ConceptRelationshipRow::SUBSUMES.to_string()],
            exclude_self_loops: true,
        }
    }
}

/// Table files discovered in a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct TableFiles {
    /// Directory that was searched.
    pub directory: PathBuf,
    /// `concept.csv`
    pub concept: Option<PathBuf>,
    /// `concept_relationship.csv` or `concept_relationship_subsumes_only.csv`
    pub concept_relationship: Option<PathBuf>,
    /// `concept_set_container.csv`
    pub concept_set_container: Option<PathBuf>,
    /// `code_sets.csv`
    pub code_sets: Option<PathBuf>,
    /// `concept_set_members.csv`
    pub concept_set_members: Option<PathBuf>,
    /// `concept_set_version_item.csv`
    pub concept_set_version_item: Option<PathBuf>,
    /// `concept_set_counts_clamped.csv`
    pub concept_set_counts_clamped: Option<PathBuf>,
    /// `deidentified_term_usage_by_domain_clamped.csv`
    pub term_usage: Option<PathBuf>,
    /// `researcher.csv` or `objects/researcher/latest.csv`
    pub researcher: Option<PathBuf>,
}

impl TableFiles {
    /// Creates an empty file set rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Returns the discovered path for a source table.
    pub fn path(&self, table: TableName) -> Option<&PathBuf> {
        match table {
            TableName::Concept => self.concept.as_ref(),
            TableName::ConceptRelationship => self.concept_relationship.as_ref(),
            TableName::ConceptSetContainer => self.concept_set_container.as_ref(),
            TableName::CodeSets => self.code_sets.as_ref(),
            TableName::ConceptSetMembers => self.concept_set_members.as_ref(),
            TableName::ConceptSetVersionItem => self.concept_set_version_item.as_ref(),
            TableName::ConceptSetCountsClamped => self.concept_set_counts_clamped.as_ref(),
            TableName::TermUsage => self.term_usage.as_ref(),
            TableName::Researcher => self.researcher.as_ref(),
            TableName::AllCsets | TableName::ConceptUsage => None,
        }
    }

    /// Returns true if all required tables were found.
    pub fn has_required_files(&self) -> bool {
        self.missing_files().is_empty()
    }

    /// Returns the names of required tables that were not found.
    pub fn missing_files(&self) -> Vec<&'static str> {
        TableName::SOURCES
            .into_iter()
            .filter(|t| t.is_required() && self.path(*t).is_none())
            .map(TableName::as_str)
            .collect()
    }
}

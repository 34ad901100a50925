//! # termhub-loader
//!
//! Loads OMOP concept-set tables, cleans them into an immutable
//! [`Snapshot`] and scores codeset selections against it.
//!
//! ## Pipeline
//!
//! 1. [`discover_tables`] finds the source CSV files in a directory.
//! 2. [`load_tables`] (or [`load_tables_parallel`]) parses them into [`RawTables`].
//! 3. [`clean`] runs the [`CleaningPipeline`] and indexes the result.
//! 4. [`SnapshotRegistry`] serves the snapshot to concurrent readers.
//! 5. [`score`] analyses a selection of codesets.
//!
//! ## Features
//!
//! - `parallel` (default): load tables and score related codesets with rayon.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use termhub_loader::{clean, discover_tables, load_tables, score, TableConfig};
//!
//! let files = discover_tables("termhub-csets/datasets")?;
//! let raw = load_tables(&files, &TableConfig::default())?;
//! let snapshot = clean(raw)?;
//!
//! let result = score([1000027602], &snapshot)?;
//! println!("{} related codesets", result.related_csets.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod concept;
mod concept_set;
mod hierarchy;
mod index;
mod loader;
mod parser;
mod pipeline;
mod registry;
mod relationship;
mod scoring;
mod snapshot;
mod types;

#[cfg(test)]
mod test_fixtures;

pub use hierarchy::{flatten, Hierarchy, HierarchyNode, CYCLE_MARKER};
pub use index::RelationshipIndex;
#[cfg(feature = "parallel")]
pub use loader::load_tables_parallel;
pub use loader::{discover_tables, load_table, load_tables, RawTables};
pub use parser::{parse, ColumnIndex, TableParser, TableRecord};
pub use pipeline::{
    clean, CensusEntry, CleaningPipeline, CleaningStep, Column, ColumnCounts, PipelineReport,
    StepReport, Tables,
};
pub use registry::SnapshotRegistry;
pub use relationship::RelationshipFilter;
pub use scoring::{cset_members_items, score, CsetMemberItem, RelatedCset, SelectionResult};
pub use snapshot::Snapshot;
pub use types::{
    EngineError, EngineResult, LoadError, LoadResult, RelationshipConfig, TableConfig, TableFiles,
    TableName,
};

// Re-export termhub-types for convenience
pub use termhub_types;

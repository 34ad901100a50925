//! # termhub-types
//!
//! Type definitions for OMOP concepts, subsumption relationships and
//! concept sets.
//!
//! The crate covers both the raw rows read from tabular sources
//! ([`ConceptRow`], [`ConceptRelationshipRow`], [`ConceptSetMember`], ...)
//! and the derived shapes held in a cleaned snapshot ([`Concept`],
//! [`RelationshipEdge`], [`CsetSummary`]).
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use termhub_types::{ConceptRelationshipRow, ConceptSetVersionItem, ConceptId};
//!
//! let row = ConceptRelationshipRow::subsumes(4274025, 201826);
//! let edge = row.to_edge();
//! assert_eq!(edge.child_concept_id, 201826);
//!
//! let root: ConceptId = termhub_types::PLACEHOLDER_ROOT;
//! assert_eq!(root, -1);
//! ```

#![warn(missing_docs)]

mod concept;
mod concept_set;
mod ids;
mod relationship;
mod summary;

pub use concept::{Concept, ConceptRow, ConceptUsage, TermUsage};
pub use concept_set::{
    Codeset, ConceptSetContainer, ConceptSetMember, ConceptSetVersionItem, CsetCounts, ItemFlag,
    Researcher,
};
pub use ids::{CodesetId, ConceptId, PLACEHOLDER_ROOT};
pub use relationship::{ConceptRelationshipRow, RelationshipEdge};
pub use summary::CsetSummary;

//! Concept set types.
//!
//! A concept set *container* is a named collection; each *codeset* is one
//! version of a container. Membership comes in two forms: the materialized
//! `ConceptSetMember` rows and the `ConceptSetVersionItem` expression rows
//! that generated them.

use crate::{CodesetId, ConceptId};

/// A row of `concept_set_container`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptSetContainer {
    /// Container name; unique after cleaning.
    pub concept_set_name: String,
    /// Owning project.
    pub project_id: String,
    /// Researcher id of the assigned informatician.
    pub assigned_informatician: String,
    /// Researcher id of the assigned subject matter expert.
    pub assigned_sme: String,
    /// Workflow status.
    pub status: String,
    /// Workflow stage.
    pub stage: String,
    /// Stated intention of the concept set.
    pub intention: String,
    /// Researcher id of the N3C reviewer.
    pub n3c_reviewer: String,
    /// Alternate name.
    pub alias: String,
    /// Archived containers are dropped during cleaning.
    pub archived: bool,
    /// Researcher id of the creator.
    pub created_by: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// A row of `code_sets`: one version of a concept set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Codeset {
    /// Unique version identifier.
    pub codeset_id: CodesetId,
    /// Display title, usually `name (v3)`.
    pub concept_set_version_title: String,
    /// Container this version belongs to.
    pub concept_set_name: String,
    /// Version number.
    pub version: Option<i64>,
    /// Whether this is the latest version of its container.
    pub is_most_recent_version: bool,
    /// Whether this version is an unpublished draft.
    pub is_draft: bool,
    /// Stated intention of this version.
    pub intention: String,
    /// Known limitations.
    pub limitations: String,
    /// Known issues.
    pub issues: String,
    /// Message recorded with the update.
    pub update_message: String,
    /// Workflow status.
    pub status: String,
    /// Whether a review exists.
    pub has_review: bool,
    /// Researcher id of the reviewer.
    pub reviewed_by: String,
    /// Provenance note.
    pub provenance: String,
    /// Researcher id of the creator.
    pub created_by: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// A materialized membership row from `concept_set_members`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptSetMember {
    /// Codeset the concept belongs to.
    pub codeset_id: CodesetId,
    /// Member concept.
    pub concept_id: ConceptId,
    /// Container name, denormalized.
    pub concept_set_name: String,
    /// Archived memberships are dropped during cleaning.
    pub archived: bool,
}

impl ConceptSetMember {
    /// Creates an unarchived membership.
    pub fn new(codeset_id: CodesetId, concept_id: ConceptId, concept_set_name: impl Into<String>) -> Self {
        Self {
            codeset_id,
            concept_id,
            concept_set_name: concept_set_name.into(),
            archived: false,
        }
    }
}

/// Expression flag on a version item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemFlag {
    /// Membership includes all descendants of the concept.
    IncludeDescendants,
    /// Membership includes concepts mapped to the concept.
    IncludeMapped,
    /// The concept (and any expansion) is excluded.
    IsExcluded,
}

impl ItemFlag {
    /// All flags in display order.
    pub const ALL: [ItemFlag; 3] = [Self::IncludeDescendants, Self::IncludeMapped, Self::IsExcluded];

    /// Column name used in source data and in display strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncludeDescendants => "includeDescendants",
            Self::IncludeMapped => "includeMapped",
            Self::IsExcluded => "isExcluded",
        }
    }
}

/// A row of `concept_set_version_item`: the expression behind membership.
///
/// # Examples
///
/// ```
/// use termhub_types::ConceptSetVersionItem;
///
/// let item = ConceptSetVersionItem {
///     codeset_id: 100,
///     concept_id: 201826,
///     include_descendants: true,
///     include_mapped: false,
///     is_excluded: true,
/// };
/// assert_eq!(item.item_flags(), "includeDescendants, isExcluded");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptSetVersionItem {
    /// Codeset the expression belongs to.
    pub codeset_id: CodesetId,
    /// Concept the expression is anchored at.
    pub concept_id: ConceptId,
    /// `includeDescendants` flag.
    pub include_descendants: bool,
    /// `includeMapped` flag.
    pub include_mapped: bool,
    /// `isExcluded` flag.
    pub is_excluded: bool,
}

impl ConceptSetVersionItem {
    /// Returns true if the given flag is set.
    pub fn has_flag(&self, flag: ItemFlag) -> bool {
        match flag {
            ItemFlag::IncludeDescendants => self.include_descendants,
            ItemFlag::IncludeMapped => self.include_mapped,
            ItemFlag::IsExcluded => self.is_excluded,
        }
    }

    /// Returns the set flags.
    pub fn flags(&self) -> Vec<ItemFlag> {
        ItemFlag::ALL.into_iter().filter(|f| self.has_flag(*f)).collect()
    }

    /// Set flags joined for display, e.g. `"includeDescendants, isExcluded"`.
    pub fn item_flags(&self) -> String {
        self.flags()
            .into_iter()
            .map(ItemFlag::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A row of `concept_set_counts_clamped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsetCounts {
    /// Codeset the counts apply to.
    pub codeset_id: CodesetId,
    /// Approximate distinct persons with any member concept.
    pub approx_distinct_person_count: i64,
    /// Approximate records with any member concept.
    pub approx_total_record_count: i64,
}

/// A row of the `researcher` object table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Researcher {
    /// Identifier referenced by `created_by`, `assigned_sme`, etc.
    #[cfg_attr(feature = "serde", serde(rename = "multipassId"))]
    pub multipass_id: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    #[cfg_attr(feature = "serde", serde(rename = "emailAddress"))]
    pub email_address: String,
    /// Home institution.
    pub institution: String,
}

//! The `all_csets` view: one row per codeset.
//!
//! Joins a codeset with its container, its distinct member count and its
//! usage counts. Columns present on both codeset and container carry a
//! `_version` / `_container` suffix.

use crate::{CodesetId, Codeset, ConceptSetContainer, CsetCounts, Researcher};

/// One row of the `all_csets` view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsetSummary {
    /// Codeset identifier.
    pub codeset_id: CodesetId,
    /// Display title of the version.
    pub concept_set_version_title: String,
    /// Container name.
    pub concept_set_name: String,
    /// Version number.
    pub version: Option<i64>,
    /// Whether this is the latest version of its container.
    pub is_most_recent_version: bool,
    /// Whether this version is a draft.
    pub is_draft: bool,
    /// Intention recorded on the version.
    pub intention_version: String,
    /// Intention recorded on the container.
    pub intention_container: String,
    /// Known limitations.
    pub limitations: String,
    /// Known issues.
    pub issues: String,
    /// Update message of the version.
    pub update_message: String,
    /// Version status.
    pub status_version: String,
    /// Container status.
    pub status_container: String,
    /// Container stage.
    pub stage: String,
    /// Whether the version has a review.
    pub has_review: bool,
    /// Researcher id of the version reviewer.
    pub reviewed_by: String,
    /// Provenance note.
    pub provenance: String,
    /// Owning project.
    pub project_id: String,
    /// Researcher id of the assigned informatician.
    pub assigned_informatician: String,
    /// Researcher id of the assigned SME.
    pub assigned_sme: String,
    /// Researcher id of the N3C reviewer.
    pub n3c_reviewer: String,
    /// Container alias.
    pub alias: String,
    /// Container archived flag; always false after cleaning.
    pub archived: bool,
    /// Creator of the version.
    pub created_by_version: String,
    /// Creation time of the version.
    pub created_at_version: String,
    /// Creator of the container.
    pub created_by_container: String,
    /// Creation time of the container.
    pub created_at_container: String,
    /// Distinct member concepts.
    pub concepts: usize,
    /// Approximate distinct persons.
    pub approx_distinct_person_count: i64,
    /// Approximate records.
    pub approx_total_record_count: i64,
}

impl CsetSummary {
    /// Joins the parts of one `all_csets` row.
    pub fn join(
        codeset: &Codeset,
        container: &ConceptSetContainer,
        concepts: usize,
        counts: &CsetCounts,
    ) -> Self {
        Self {
            codeset_id: codeset.codeset_id,
            concept_set_version_title: codeset.concept_set_version_title.clone(),
            concept_set_name: codeset.concept_set_name.clone(),
            version: codeset.version,
            is_most_recent_version: codeset.is_most_recent_version,
            is_draft: codeset.is_draft,
            intention_version: codeset.intention.clone(),
            intention_container: container.intention.clone(),
            limitations: codeset.limitations.clone(),
            issues: codeset.issues.clone(),
            update_message: codeset.update_message.clone(),
            status_version: codeset.status.clone(),
            status_container: container.status.clone(),
            stage: container.stage.clone(),
            has_review: codeset.has_review,
            reviewed_by: codeset.reviewed_by.clone(),
            provenance: codeset.provenance.clone(),
            project_id: container.project_id.clone(),
            assigned_informatician: container.assigned_informatician.clone(),
            assigned_sme: container.assigned_sme.clone(),
            n3c_reviewer: container.n3c_reviewer.clone(),
            alias: container.alias.clone(),
            archived: container.archived,
            created_by_version: codeset.created_by.clone(),
            created_at_version: codeset.created_at.clone(),
            created_by_container: container.created_by.clone(),
            created_at_container: container.created_at.clone(),
            concepts,
            approx_distinct_person_count: counts.approx_distinct_person_count,
            approx_total_record_count: counts.approx_total_record_count,
        }
    }

    /// Non-empty researcher ids referenced by this row, in column order.
    pub fn researcher_ids(&self) -> Vec<&str> {
        [
            &self.created_by_container,
            &self.created_by_version,
            &self.assigned_sme,
            &self.reviewed_by,
            &self.n3c_reviewer,
            &self.assigned_informatician,
        ]
        .into_iter()
        .map(String::as_str)
        .filter(|id| !id.is_empty())
        .collect()
    }

    /// Returns true if the researcher is referenced by this row.
    pub fn references(&self, researcher: &Researcher) -> bool {
        self.researcher_ids().contains(&researcher.multipass_id.as_str())
    }
}

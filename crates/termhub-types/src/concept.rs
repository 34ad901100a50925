//! OMOP concept types.
//!
//! `ConceptRow` is a row of the raw `concept` table. `Concept` is the cleaned
//! form held in a snapshot: vocabulary columns are dropped and per-domain
//! usage is folded in.

use crate::ConceptId;

/// A row of the raw OMOP `concept` table.
///
/// # Examples
///
/// ```
/// use termhub_types::ConceptRow;
///
/// let row = ConceptRow::new(201826, "Type 2 diabetes mellitus");
/// assert!(!row.is_standard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptRow {
    /// Unique concept identifier.
    pub concept_id: ConceptId,
    /// Human readable name.
    pub concept_name: String,
    /// OMOP domain (Condition, Drug, ...).
    pub domain_id: String,
    /// Source vocabulary (SNOMED, ICD10CM, ...).
    pub vocabulary_id: String,
    /// Concept class within the vocabulary.
    pub concept_class_id: String,
    /// `S` for standard, `C` for classification, empty otherwise.
    pub standard_concept: String,
    /// Code within the source vocabulary.
    pub concept_code: String,
    /// Reason the concept was invalidated, if any.
    pub invalid_reason: String,
    /// Start of validity.
    pub valid_start_date: String,
    /// End of validity.
    pub valid_end_date: String,
}

impl ConceptRow {
    /// Creates a row with only id and name populated.
    pub fn new(concept_id: ConceptId, concept_name: impl Into<String>) -> Self {
        Self {
            concept_id,
            concept_name: concept_name.into(),
            ..Default::default()
        }
    }

    /// Returns true if this is a standard concept.
    pub fn is_standard(&self) -> bool {
        self.standard_concept == "S"
    }
}

/// A row of `deidentified_term_usage_by_domain_clamped`.
///
/// Usage is reported per concept per domain, so a concept can have several rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermUsage {
    /// Concept the usage applies to.
    pub concept_id: ConceptId,
    /// CDM table the usage was counted in (e.g. `condition_occurrence`).
    pub domain: String,
    /// Number of records.
    pub total_count: i64,
    /// Number of distinct persons.
    pub distinct_person_count: i64,
}

/// Usage aggregated across domains for one concept.
///
/// Record counts are summed. Person counts are not, since one person may
/// appear in several domains; they are kept as a comma-joined list instead.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptUsage {
    /// Concept the usage applies to.
    pub concept_id: ConceptId,
    /// Number of domains the concept was counted in.
    pub domain_cnt: u32,
    /// Comma-joined domain names.
    pub domain: String,
    /// Sum of record counts across domains.
    pub total_count: i64,
    /// Comma-joined per-domain distinct person counts.
    pub distinct_person_count: String,
}

impl ConceptUsage {
    /// Usage for a concept that never appears in the usage table.
    pub fn none(concept_id: ConceptId) -> Self {
        Self {
            concept_id,
            domain_cnt: 0,
            domain: String::new(),
            total_count: 0,
            distinct_person_count: "0".to_string(),
        }
    }

    /// Folds per-domain usage rows for a single concept.
    ///
    /// Rows for other concepts are ignored.
    pub fn aggregate<'a>(concept_id: ConceptId, rows: impl IntoIterator<Item = &'a TermUsage>) -> Self {
        let mut domains = Vec::new();
        let mut persons = Vec::new();
        let mut total_count = 0;

        for row in rows.into_iter().filter(|r| r.concept_id == concept_id) {
            domains.push(row.domain.as_str());
            persons.push(row.distinct_person_count.to_string());
            total_count += row.total_count;
        }

        if domains.is_empty() {
            return Self::none(concept_id);
        }

        Self {
            concept_id,
            domain_cnt: domains.len() as u32,
            domain: domains.join(","),
            total_count,
            distinct_person_count: persons.join(","),
        }
    }
}

/// A concept as held in a cleaned snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concept {
    /// Unique concept identifier.
    pub concept_id: ConceptId,
    /// Human readable name.
    pub concept_name: String,
    /// Number of domains with usage.
    pub domain_cnt: u32,
    /// Comma-joined domain names.
    pub domain: String,
    /// Records across all domains.
    pub total_count: i64,
    /// Comma-joined per-domain person counts.
    pub distinct_person_count: String,
}

impl Concept {
    /// Builds a cleaned concept from its raw row and aggregated usage.
    pub fn from_parts(row: &ConceptRow, usage: &ConceptUsage) -> Self {
        Self {
            concept_id: row.concept_id,
            concept_name: row.concept_name.clone(),
            domain_cnt: usage.domain_cnt,
            domain: usage.domain.clone(),
            total_count: usage.total_count,
            distinct_person_count: usage.distinct_person_count.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(concept_id: ConceptId, domain: &str, total: i64, persons: i64) -> TermUsage {
        TermUsage {
            concept_id,
            domain: domain.to_string(),
            total_count: total,
            distinct_person_count: persons,
        }
    }

    #[test]
    fn test_aggregate_sums_records_and_lists_persons() {
        let rows = vec![
            usage(9201, "visit_occurrence", 100, 40),
            usage(9201, "condition_occurrence", 20, 15),
            usage(9202, "visit_occurrence", 5, 5),
        ];

        let agg = ConceptUsage::aggregate(9201, &rows);
        assert_eq!(agg.domain_cnt, 2);
        assert_eq!(agg.total_count, 120);
        assert_eq!(agg.domain, "visit_occurrence,condition_occurrence");
        assert_eq!(agg.distinct_person_count, "40,15");
    }

    #[test]
    fn test_aggregate_without_usage() {
        let agg = ConceptUsage::aggregate(4, &[]);
        assert_eq!(agg, ConceptUsage::none(4));
        assert_eq!(agg.distinct_person_count, "0");
    }

    #[test]
    fn test_concept_from_parts_drops_vocabulary() {
        let row = ConceptRow {
            vocabulary_id: "SNOMED".to_string(),
            standard_concept: "S".to_string(),
            ..ConceptRow::new(201826, "Type 2 diabetes mellitus")
        };
        assert!(row.is_standard());

        let concept = Concept::from_parts(&row, &ConceptUsage::none(201826));
        assert_eq!(concept.concept_id, 201826);
        assert_eq!(concept.concept_name, "Type 2 diabetes mellitus");
        assert_eq!(concept.total_count, 0);
    }
}

//! Concept and term usage table parsers.

use csv::StringRecord;
use termhub_types::{ConceptRow, TermUsage};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::LoadResult;

impl TableRecord for ConceptRow {
    const TABLE: &'static str = "concept";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["concept_id", "concept_name"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        let field = |name| columns.get(record, name);
        Ok(ConceptRow {
            concept_id: parse::integer(field("concept_id"))?,
            concept_name: parse::text(field("concept_name")),
            domain_id: parse::text(field("domain_id")),
            vocabulary_id: parse::text(field("vocabulary_id")),
            concept_class_id: parse::text(field("concept_class_id")),
            standard_concept: parse::text(field("standard_concept")),
            concept_code: parse::text(field("concept_code")),
            invalid_reason: parse::text(field("invalid_reason")),
            valid_start_date: parse::text(field("valid_start_date")),
            valid_end_date: parse::text(field("valid_end_date")),
        })
    }
}

impl TableRecord for TermUsage {
    const TABLE: &'static str = "deidentified_term_usage_by_domain_clamped";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["concept_id", "domain", "total_count", "distinct_person_count"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        Ok(TermUsage {
            concept_id: parse::integer(columns.get(record, "concept_id"))?,
            domain: parse::text(columns.get(record, "domain")),
            total_count: parse::count(columns.get(record, "total_count"))?,
            distinct_person_count: parse::count(columns.get(record, "distinct_person_count"))?,
        })
    }
}

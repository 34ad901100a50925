//! Concept set table parsers: containers, versions, members, expression
//! items, usage counts and researchers.

use csv::StringRecord;
use termhub_types::{
    Codeset, ConceptSetContainer, ConceptSetMember, ConceptSetVersionItem, CsetCounts, Researcher,
};

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::LoadResult;

impl TableRecord for ConceptSetContainer {
    const TABLE: &'static str = "concept_set_container";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["concept_set_name", "archived", "created_at"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        let field = |name| columns.get(record, name);
        Ok(ConceptSetContainer {
            concept_set_name: parse::text(field("concept_set_name")),
            project_id: parse::text(field("project_id")),
            assigned_informatician: parse::text(field("assigned_informatician")),
            assigned_sme: parse::text(field("assigned_sme")),
            status: parse::text(field("status")),
            stage: parse::text(field("stage")),
            intention: parse::text(field("intention")),
            n3c_reviewer: parse::text(field("n3c_reviewer")),
            alias: parse::text(field("alias")),
            archived: parse::boolean(field("archived"))?,
            created_by: parse::text(field("created_by")),
            created_at: parse::text(field("created_at")),
        })
    }
}

impl TableRecord for Codeset {
    const TABLE: &'static str = "code_sets";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["codeset_id", "concept_set_name"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        let field = |name| columns.get(record, name);
        Ok(Codeset {
            codeset_id: parse::integer(field("codeset_id"))?,
            concept_set_version_title: parse::text(field("concept_set_version_title")),
            concept_set_name: parse::text(field("concept_set_name")),
            version: parse::optional_integer(field("version"))?,
            is_most_recent_version: parse::boolean(field("is_most_recent_version"))?,
            is_draft: parse::boolean(field("is_draft"))?,
            intention: parse::text(field("intention")),
            limitations: parse::text(field("limitations")),
            issues: parse::text(field("issues")),
            update_message: parse::text(field("update_message")),
            status: parse::text(field("status")),
            has_review: parse::boolean(field("has_review"))?,
            reviewed_by: parse::text(field("reviewed_by")),
            provenance: parse::text(field("provenance")),
            created_by: parse::text(field("created_by")),
            created_at: parse::text(field("created_at")),
        })
    }
}

impl TableRecord for ConceptSetMember {
    const TABLE: &'static str = "concept_set_members";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["codeset_id", "concept_id"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        Ok(ConceptSetMember {
            codeset_id: parse::integer(columns.get(record, "codeset_id"))?,
            concept_id: parse::integer(columns.get(record, "concept_id"))?,
            concept_set_name: parse::text(columns.get(record, "concept_set_name")),
            archived: parse::boolean(columns.get(record, "archived"))?,
        })
    }
}

impl TableRecord for ConceptSetVersionItem {
    const TABLE: &'static str = "concept_set_version_item";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["codeset_id", "concept_id"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        Ok(ConceptSetVersionItem {
            codeset_id: parse::integer(columns.get(record, "codeset_id"))?,
            concept_id: parse::integer(columns.get(record, "concept_id"))?,
            include_descendants: parse::boolean(columns.get(record, "includeDescendants"))?,
            include_mapped: parse::boolean(columns.get(record, "includeMapped"))?,
            is_excluded: parse::boolean(columns.get(record, "isExcluded"))?,
        })
    }
}

impl TableRecord for CsetCounts {
    const TABLE: &'static str = "concept_set_counts_clamped";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["codeset_id"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        Ok(CsetCounts {
            codeset_id: parse::integer(columns.get(record, "codeset_id"))?,
            approx_distinct_person_count: parse::count(columns.get(record, "approx_distinct_person_count"))?,
            approx_total_record_count: parse::count(columns.get(record, "approx_total_record_count"))?,
        })
    }
}

impl TableRecord for Researcher {
    const TABLE: &'static str = "researcher";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["multipassId"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        Ok(Researcher {
            multipass_id: parse::text(columns.get(record, "multipassId")),
            name: parse::text(columns.get(record, "name")),
            email_address: parse::text(columns.get(record, "emailAddress")),
            institution: parse::text(columns.get(record, "institution")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TableParser;
    use crate::types::{LoadError, TableConfig};

    fn parse_all<T: TableRecord>(data: &str) -> LoadResult<Vec<T>> {
        TableParser::<_, T>::from_reader(data.as_bytes(), TableConfig::default())?.parse_all()
    }

    #[test]
    fn test_parse_container() {
        let data = "\
concept_set_name,archived,created_at,created_by,assigned_sme
Diabetes,False,2022-01-01T00:00:00Z,r1,r2
Old,True,2021-01-01T00:00:00Z,r1,
";
        let rows: Vec<ConceptSetContainer> = parse_all(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].archived);
        assert!(rows[1].archived);
        assert_eq!(rows[0].assigned_sme, "r2");
        assert!(rows[0].stage.is_empty());
    }

    #[test]
    fn test_parse_codeset_with_float_version() {
        let data = "\
codeset_id,concept_set_name,concept_set_version_title,version,is_most_recent_version
100,Diabetes,Diabetes (v2),2.0,True
101,Diabetes,Diabetes (draft),,False
";
        let rows: Vec<Codeset> = parse_all(data).unwrap();
        assert_eq!(rows[0].version, Some(2));
        assert!(rows[0].is_most_recent_version);
        assert_eq!(rows[1].version, None);
    }

    #[test]
    fn test_parse_version_items_flags() {
        let data = "\
codeset_id,concept_id,includeDescendants,includeMapped,isExcluded
100,1,True,False,True
";
        let rows: Vec<ConceptSetVersionItem> = parse_all(data).unwrap();
        assert_eq!(rows[0].item_flags(), "includeDescendants, isExcluded");
    }

    #[test]
    fn test_parse_members_bad_boolean() {
        let data = "codeset_id,concept_id,archived\n100,1,maybe\n";
        let err = parse_all::<ConceptSetMember>(data).unwrap_err();
        assert!(matches!(err, LoadError::InvalidBoolean { .. }));
    }

    #[test]
    fn test_parse_counts_and_researchers() {
        let counts: Vec<CsetCounts> = parse_all(
            "codeset_id,approx_distinct_person_count,approx_total_record_count\n100,20,\n",
        )
        .unwrap();
        assert_eq!(counts[0].approx_distinct_person_count, 20);
        assert_eq!(counts[0].approx_total_record_count, 0);

        let researchers: Vec<Researcher> =
            parse_all("multipassId,name,emailAddress,institution\nr1,Ada,ada@example.org,JHU\n").unwrap();
        assert_eq!(researchers[0].multipass_id, "r1");
        assert_eq!(researchers[0].institution, "JHU");
    }
}

//! Concept relationship table parser.

use csv::StringRecord;
use termhub_types::ConceptRelationshipRow;

use crate::parser::{parse, ColumnIndex, TableRecord};
use crate::types::{LoadResult, RelationshipConfig, TableConfig};

impl TableRecord for ConceptRelationshipRow {
    const TABLE: &'static str = "concept_relationship";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["concept_id_1", "concept_id_2"];

    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self> {
        // Pre-restricted exports carry no relationship_id column.
        let relationship_id = if columns.contains("relationship_id") {
            parse::text(columns.get(record, "relationship_id"))
        } else {
            ConceptRelationshipRow::SUBSUMES.to_string()
        };

        Ok(ConceptRelationshipRow {
            concept_id_1: parse::integer(columns.get(record, "concept_id_1"))?,
            concept_id_2: parse::integer(columns.get(record, "concept_id_2"))?,
            relationship_id,
        })
    }

    fn passes_filter(&self, config: &TableConfig) -> bool {
        self.passes_relationship_filter(&config.relationships)
    }
}

/// Extended filter for relationship kinds and self-loops.
pub trait RelationshipFilter {
    /// Returns true if the relationship passes the filter.
    fn passes_relationship_filter(&self, config: &RelationshipConfig) -> bool;
}

impl RelationshipFilter for ConceptRelationshipRow {
    fn passes_relationship_filter(&self, config: &RelationshipConfig) -> bool {
        if config.exclude_self_loops && self.is_self_loop() {
            return false;
        }

        config.relationship_ids.is_empty() || config.relationship_ids.contains(&self.relationship_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TableParser;

    #[test]
    fn test_subsumes_only_filter() {
        let config = RelationshipConfig::subsumes_only();

        assert!(ConceptRelationshipRow::subsumes(1, 2).passes_relationship_filter(&config));
        assert!(!ConceptRelationshipRow::subsumes(3, 3).passes_relationship_filter(&config));

        let maps_to = ConceptRelationshipRow {
            relationship_id: "Maps to".to_string(),
            ..ConceptRelationshipRow::subsumes(1, 2)
        };
        assert!(!maps_to.passes_relationship_filter(&config));
        assert!(maps_to.passes_relationship_filter(&RelationshipConfig::default()));
    }

    #[test]
    fn test_parse_relationship_table() {
        let data = "\
concept_id_1,concept_id_2,relationship_id
1,2,Subsumes
2,2,Subsumes
1,3,Maps to
2,4,Subsumes
";
        let rows = TableParser::<_, ConceptRelationshipRow>::from_reader(data.as_bytes(), TableConfig::default())
            .unwrap()
            .parse_all()
            .unwrap();

        let edges: Vec<_> = rows.iter().map(|r| (r.concept_id_1, r.concept_id_2)).collect();
        assert_eq!(edges, vec![(1, 2), (2, 4)]);
    }

    #[test]
    fn test_subsumes_only_export_without_relationship_column() {
        let data = "concept_id_1,concept_id_2\n10,11\n";
        let rows = TableParser::<_, ConceptRelationshipRow>::from_reader(data.as_bytes(), TableConfig::default())
            .unwrap()
            .parse_all()
            .unwrap();

        assert_eq!(rows, vec![ConceptRelationshipRow::subsumes(10, 11)]);
    }
}

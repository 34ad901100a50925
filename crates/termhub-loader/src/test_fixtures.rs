//! Small in-memory dataset shared by the unit tests.

use termhub_types::{
    CodesetId, Codeset, ConceptId, ConceptRelationshipRow, ConceptRow, ConceptSetContainer,
    ConceptSetMember, ConceptSetVersionItem, CsetCounts, Researcher, TermUsage,
};

use crate::loader::RawTables;

pub fn container(name: &str, created_at: &str) -> ConceptSetContainer {
    ConceptSetContainer {
        concept_set_name: name.to_string(),
        created_at: created_at.to_string(),
        ..Default::default()
    }
}

pub fn codeset(codeset_id: CodesetId, name: &str) -> Codeset {
    Codeset {
        codeset_id,
        concept_set_name: name.to_string(),
        concept_set_version_title: format!("{name} (v1)"),
        version: Some(1),
        ..Default::default()
    }
}

pub fn member(codeset_id: CodesetId, concept_id: ConceptId, name: &str) -> ConceptSetMember {
    ConceptSetMember::new(codeset_id, concept_id, name)
}

pub fn item(codeset_id: CodesetId, concept_id: ConceptId) -> ConceptSetVersionItem {
    ConceptSetVersionItem {
        codeset_id,
        concept_id,
        include_descendants: false,
        include_mapped: false,
        is_excluded: false,
    }
}

pub fn counts(codeset_id: CodesetId, persons: i64) -> CsetCounts {
    CsetCounts {
        codeset_id,
        approx_distinct_person_count: persons,
        approx_total_record_count: persons * 10,
    }
}

fn usage(concept_id: ConceptId, domain: &str, total: i64, persons: i64) -> TermUsage {
    TermUsage {
        concept_id,
        domain: domain.to_string(),
        total_count: total,
        distinct_person_count: persons,
    }
}

fn researcher(id: &str, name: &str) -> Researcher {
    Researcher {
        multipass_id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Raw tables covering every cleaning rule.
///
/// After cleaning: codesets 100 (Diabetes: 1, 2, 3) and 200 (Asthma: 3, 4),
/// concepts 1 to 4, edges 1→2, 1→3, 2→4.
pub fn raw_tables() -> RawTables {
    let concept = [1, 2, 3, 4, 5, 6, 77, 99]
        .into_iter()
        .map(|id| ConceptRow::new(id, format!("concept {id}")))
        .collect();

    let mut maps_to = ConceptRelationshipRow::subsumes(3, 6);
    maps_to.relationship_id = "Maps to".to_string();

    let concept_relationship = vec![
        ConceptRelationshipRow::subsumes(1, 2),
        ConceptRelationshipRow::subsumes(1, 3),
        ConceptRelationshipRow::subsumes(2, 4),
        ConceptRelationshipRow::subsumes(2, 4),
        ConceptRelationshipRow::subsumes(5, 5),
        maps_to,
    ];

    let mut archived = container("Archived", "2022-01-01");
    archived.archived = true;
    let mut diabetes = container("Diabetes", "2021-06-01");
    diabetes.created_by = "r1".to_string();
    let asthma = ConceptSetContainer {
        assigned_sme: "r2".to_string(),
        ..container("Asthma", "2021-01-01")
    };

    let concept_set_container = vec![
        container("Diabetes", "2019-01-01"),
        diabetes,
        asthma,
        archived,
        container("NoVersions", "2020-01-01"),
    ];

    let code_sets = vec![
        codeset(100, "Diabetes"),
        codeset(200, "Asthma"),
        codeset(300, "Archived"),
        codeset(400, "NoVersions"),
        codeset(500, "Orphan"),
    ];

    let mut archived_member = member(200, 5, "Asthma");
    archived_member.archived = true;

    let concept_set_members = vec![
        member(100, 1, "Diabetes"),
        member(100, 2, "Diabetes"),
        member(100, 3, "Diabetes"),
        member(200, 3, "Asthma"),
        member(200, 4, "Asthma"),
        archived_member,
        member(300, 6, "Archived"),
        member(500, 6, "Orphan"),
    ];

    let mut descendants = item(100, 1);
    descendants.include_descendants = true;

    let concept_set_version_item = vec![
        descendants,
        item(100, 99),
        item(200, 3),
        item(200, 4),
        item(300, 6),
        item(500, 6),
    ];

    RawTables {
        concept: Some(concept),
        concept_relationship: Some(concept_relationship),
        concept_set_container: Some(concept_set_container),
        code_sets: Some(code_sets),
        concept_set_members: Some(concept_set_members),
        concept_set_version_item: Some(concept_set_version_item),
        concept_set_counts_clamped: Some(vec![counts(100, 30), counts(200, 20), counts(300, 5), counts(500, 5)]),
        term_usage: Some(vec![
            usage(1, "condition_occurrence", 10, 4),
            usage(1, "observation", 5, 2),
            usage(2, "condition_occurrence", 7, 3),
        ]),
        researcher: Some(vec![researcher("r1", "Ada"), researcher("r2", "Grace")]),
    }
}

/// Raw tables with one container, version item and counts row per codeset.
///
/// Every member is also an item, so cleaning keeps all codesets and edges.
pub fn dataset(codesets: &[(CodesetId, &[ConceptId])], edges: &[(ConceptId, ConceptId)]) -> RawTables {
    let mut concept_ids: Vec<ConceptId> = codesets
        .iter()
        .flat_map(|(_, members)| members.iter().copied())
        .chain(edges.iter().flat_map(|&(p, c)| [p, c]))
        .collect();
    concept_ids.sort_unstable();
    concept_ids.dedup();

    let name = |id: CodesetId| format!("cs{id}");

    RawTables {
        concept: Some(concept_ids.iter().map(|&id| ConceptRow::new(id, format!("concept {id}"))).collect()),
        concept_relationship: Some(
            edges
                .iter()
                .map(|&(p, c)| ConceptRelationshipRow::subsumes(p, c))
                .collect(),
        ),
        concept_set_container: Some(codesets.iter().map(|&(id, _)| container(&name(id), "2022-01-01")).collect()),
        code_sets: Some(codesets.iter().map(|&(id, _)| codeset(id, &name(id))).collect()),
        concept_set_members: Some(
            codesets
                .iter()
                .flat_map(|&(id, members)| members.iter().map(move |&c| member(id, c, &name(id))))
                .collect(),
        ),
        concept_set_version_item: Some(
            codesets
                .iter()
                .flat_map(|&(id, members)| members.iter().map(move |&c| item(id, c)))
                .collect(),
        ),
        concept_set_counts_clamped: Some(codesets.iter().map(|&(id, _)| counts(id, 1)).collect()),
        term_usage: Some(vec![]),
        researcher: None,
    }
}

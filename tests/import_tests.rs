//! Integration tests for the JSON import path: a program serialized as a
//! RootDoc plus a fact document must saturate to the same fixed point as a
//! programmatically built root.

mod common;

use common::*;
use fixlog::import::{self, FactsDoc, IndexDecl, RootDoc};
use fixlog::{Linker, Solver, Value};
use std::collections::HashSet;

#[test]
fn test_root_survives_a_json_round_trip() -> anyhow::Result<()> {
    let tc = transitive_closure();

    let doc = RootDoc {
        defs: tc.root.defs.values().cloned().collect(),
        enums: tc.root.enums.values().cloned().collect(),
        lattices: vec![],
        tables: tc.root.tables.values().cloned().collect(),
        indexes: tc
            .root
            .indexes
            .iter()
            .map(|(table, columns)| IndexDecl {
                table: table.clone(),
                columns: columns.clone(),
            })
            .collect(),
        strata: tc.root.strata.clone(),
        properties: vec![],
        reachable: vec![],
    };

    let json = serde_json::to_string(&doc)?;
    let root = import::root_from_json(&json)?;

    assert_eq!(root.tables.len(), tc.root.tables.len());
    assert_eq!(root.strata, tc.root.strata);
    assert_eq!(root.indexes_of(&tc.edge), tc.root.indexes_of(&tc.edge));
    Ok(())
}

#[test]
fn test_imported_program_and_facts_saturate_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let tc = transitive_closure();

    let root_json = serde_json::to_string(&RootDoc {
        tables: tc.root.tables.values().cloned().collect(),
        strata: tc.root.strata.clone(),
        ..RootDoc::default()
    })?;

    let facts_json = r#"
    {
        "relations": [
            {
                "table": { "id": 1, "text": "edge" },
                "rows": [
                    [ { "Int64": 1 }, { "Int64": 2 } ],
                    [ { "Int64": 2 }, { "Int64": 3 } ]
                ]
            }
        ]
    }
    "#;

    let root = import::root_from_json(&root_json)?;
    let facts = import::facts_from_json(facts_json)?;
    assert_eq!(facts.len(), 2);

    let linker = Linker::new();
    let saturation = Solver::new(&root, &linker).saturate(facts)?;

    let paths: HashSet<(i64, i64)> = saturation
        .stores
        .relations
        .scan(&tc.path)
        .iter()
        .map(|t| match (&t[0], &t[1]) {
            (Value::Int64(a), Value::Int64(b)) => (*a, *b),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(paths, HashSet::from([(1, 2), (2, 3), (1, 3)]));
    Ok(())
}

#[test]
fn test_fact_documents_accept_tags_and_tuples() {
    let json = r#"
    {
        "relations": [
            {
                "table": { "id": 7, "text": "obs" },
                "rows": [
                    [
                        { "Int64": 1 },
                        { "Tag": { "name": "Some", "payload": { "Tuple": [ "Unit", { "Str": "x" } ] } } }
                    ]
                ]
            }
        ]
    }
    "#;
    let facts = import::facts_from_json(json).expect("facts");
    assert_eq!(facts.len(), 1);
    match &facts[0] {
        fixlog::InitialFact::Relation { tuple, .. } => {
            assert_eq!(
                tuple[1],
                Value::tag("Some", Value::tuple(vec![Value::Unit, Value::string("x")]))
            );
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_empty_facts_document_is_valid() {
    let doc: FactsDoc = serde_json::from_str("{}").expect("parse");
    let facts: Vec<fixlog::InitialFact> = doc.into();
    assert!(facts.is_empty());
}

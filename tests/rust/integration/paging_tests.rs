//! Paging counts entities, not rows.

use std::sync::Arc;

use viewgraph::result_tree::{ResultStream, Row, VecRowSource};
use viewgraph::sparql_query_generator::{QueryBuildError, QueryStrategy, ViewQueryBuilder};
use viewgraph::term::Term;
use viewgraph::view_catalog::{PropertyEntry, ViewTree};

fn leaf(name: &str) -> PropertyEntry {
    PropertyEntry::new(name, format!("http://ex.org/{}", name)).unwrap()
}

fn report_view() -> Arc<ViewTree> {
    Arc::new(
        ViewTree::from_entries(vec![
            leaf("title"),
            leaf("reading").multivalued().with_nested(
                ViewTree::from_entries(vec![leaf("value")]).unwrap(),
            ),
        ])
        .unwrap(),
    )
}

/// 5 entities with 3 readings each, ordered by entity
fn result_rows() -> Vec<Row> {
    let mut rows = Vec::new();
    for entity in 0..5 {
        for reading in 0..3 {
            rows.push(
                Row::new()
                    .bind("id", Term::iri(format!("http://ex.org/r{}", entity)))
                    .bind("title", format!("report {}", entity).as_str())
                    .bind("reading", Term::iri(format!("http://ex.org/r{}/{}", entity, reading)))
                    .bind("reading_value", Term::integer(reading)),
            );
        }
    }
    rows
}

/// What the inner select of a nested-select query hands the outer pattern
fn page(rows: Vec<Row>, limit: usize, offset: usize) -> Vec<Row> {
    let mut ids: Vec<Term> = Vec::new();
    for row in &rows {
        let id = row.get("id").unwrap();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    let selected: Vec<Term> = ids.into_iter().skip(offset).take(limit).collect();
    rows.into_iter()
        .filter(|row| selected.contains(row.get("id").unwrap()))
        .collect()
}

#[test]
fn test_page_of_two_entities() {
    let rows = page(result_rows(), 2, 1);
    assert_eq!(rows.len(), 6);

    let trees = ResultStream::new(VecRowSource::new(rows), report_view())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[0].id(), Some(&Term::iri("http://ex.org/r1")));
    assert_eq!(trees[1].id(), Some(&Term::iri("http://ex.org/r2")));
    for tree in &trees {
        assert_eq!(tree.children("reading").len(), 3);
    }
}

#[test]
fn test_paging_happens_in_inner_select() {
    let query = ViewQueryBuilder::new(report_view(), QueryStrategy::NestedSelect)
        .limit(Some(2), Some(1))
        .build()
        .unwrap();

    let (inner, outer) = query.split_at(query.find("LIMIT").unwrap());
    assert!(inner.contains("SELECT DISTINCT ?id"));
    assert!(outer.starts_with("LIMIT 2\n"));
    assert!(outer.contains("OFFSET 1\n"));
    assert!(outer.contains("?reading <http://ex.org/value> ?reading_value"));
    assert!(outer.trim_end().ends_with("ORDER BY ?id"));
}

#[test]
fn test_flat_paging_rejected() {
    let result = ViewQueryBuilder::new(report_view(), QueryStrategy::Flat)
        .limit(Some(2), Some(1))
        .build();
    assert!(matches!(result, Err(QueryBuildError::NestedSelectRequired { .. })));
}

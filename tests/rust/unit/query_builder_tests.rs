//! Query compilation through the public builder API

use std::sync::Arc;

use viewgraph::sparql_query_generator::{LimitPolicy, QueryBuildError, QueryStrategy, RangeOp, ViewQueryBuilder};
use viewgraph::term::Term;
use viewgraph::view_catalog::{PropertyEntry, ViewTree};

fn leaf(name: &str) -> PropertyEntry {
    PropertyEntry::new(name, format!("http://ex.org/{}", name)).unwrap()
}

fn warning_view() -> Arc<ViewTree> {
    Arc::new(
        ViewTree::from_entries(vec![
            leaf("severity"),
            leaf("message").optional(),
            leaf("note").optional().multivalued(),
        ])
        .unwrap(),
    )
}

#[test]
fn test_flat_strategy_rejects_paged_multivalued_view() {
    let builder = ViewQueryBuilder::new(warning_view(), QueryStrategy::Flat).limit(Some(10), None);
    assert!(matches!(
        builder.build(),
        Err(QueryBuildError::NestedSelectRequired { .. })
    ));

    let offset_only = ViewQueryBuilder::new(warning_view(), QueryStrategy::Flat).limit(None, Some(5));
    assert!(matches!(
        offset_only.build(),
        Err(QueryBuildError::NestedSelectRequired { .. })
    ));

    let soft_limited = ViewQueryBuilder::new(warning_view(), QueryStrategy::Flat)
        .with_limits(LimitPolicy::new(Some(100), None));
    assert!(soft_limited.build().is_err());
}

#[test]
fn test_nested_select_pages_entities() {
    let query = ViewQueryBuilder::new(warning_view(), QueryStrategy::NestedSelect)
        .with_base_query("?id a <http://ex.org/Warning> .")
        .limit(Some(2), Some(1))
        .build()
        .unwrap();

    let inner_start = query.find("SELECT DISTINCT ?id").unwrap();
    let limit_at = query.find("LIMIT 2").unwrap();
    let view_pattern_at = query.rfind("OPTIONAL").unwrap();
    assert!(inner_start < limit_at);
    assert!(limit_at < view_pattern_at, "paging belongs to the inner select");
    assert!(query.contains("OFFSET 1"));
    assert_eq!(query.matches("LIMIT").count(), 1);
}

#[test]
fn test_hard_limit_caps_and_soft_limit_defaults() {
    let proto = ViewQueryBuilder::new(warning_view(), QueryStrategy::NestedSelect)
        .with_limits(LimitPolicy::new(Some(20), Some(100)));
    assert!(proto.build().unwrap().contains("LIMIT 20\n"));
    assert!(proto.limit(Some(7), None).build().unwrap().contains("LIMIT 7\n"));
    assert!(proto.limit(Some(1000), None).build().unwrap().contains("LIMIT 100\n"));
}

#[test]
fn test_filters_render_in_query() {
    let query = ViewQueryBuilder::new(warning_view(), QueryStrategy::NestedSelect)
        .filter("message", vec![Term::literal("a"), Term::literal("b")])
        .unwrap()
        .filter_range("severity", RangeOp::Ge, Term::integer(2))
        .unwrap()
        .filter_exists("note", true)
        .unwrap()
        .build()
        .unwrap();
    assert!(query.contains("FILTER(?message IN (\"a\", \"b\"))"));
    assert!(query.contains(&format!("FILTER(?severity >= {})", Term::integer(2))));
    assert!(query.contains("FILTER EXISTS { ?id <http://ex.org/note> ?note . }"));
}

#[test]
fn test_prototype_is_shared_unchanged() {
    let proto = Arc::new(ViewQueryBuilder::new(warning_view(), QueryStrategy::NestedSelect));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let proto = Arc::clone(&proto);
            std::thread::spawn(move || {
                proto
                    .filter("severity", Term::integer(i))
                    .unwrap()
                    .build()
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().contains("FILTER(?severity ="));
    }
    assert!(proto.shape().filters.is_empty());
}

use std::sync::Arc;

use mockall::mock;
use serde_json::json;
use viewgraph::result_tree::{ResultStream, Row, RowSource, RowSourceError, VecRowSource};
use viewgraph::term::Term;
use viewgraph::view_catalog::{PropertyEntry, ViewTree};

mock! {
    Source {}
    impl RowSource for Source {
        fn next_row(&mut self) -> Result<Option<Row>, RowSourceError>;
        fn close(&mut self);
    }
}

fn leaf(name: &str) -> PropertyEntry {
    PropertyEntry::new(name, format!("http://ex.org/{}", name)).unwrap()
}

fn station_view() -> Arc<ViewTree> {
    Arc::new(
        ViewTree::from_entries(vec![
            leaf("label"),
            leaf("town").optional(),
            leaf("measures").optional().multivalued().with_nested(
                ViewTree::from_entries(vec![leaf("parameter"), leaf("unit").optional()]).unwrap(),
            ),
        ])
        .unwrap(),
    )
}

fn station_rows() -> Vec<Row> {
    let s1 = Term::iri("http://ex.org/s1");
    let s2 = Term::iri("http://ex.org/s2");
    vec![
        Row::new()
            .bind("id", s1.clone())
            .bind("label", "Bourton")
            .bind("measures", Term::iri("http://ex.org/m1"))
            .bind("measures_parameter", "level")
            .bind("measures_unit", "m"),
        Row::new()
            .bind("id", s1.clone())
            .bind("label", "Bourton")
            .bind("measures", Term::iri("http://ex.org/m2"))
            .bind("measures_parameter", "flow"),
        Row::new()
            .bind("id", s2)
            .bind("label", "Ashford")
            .bind("town", "Ashford"),
    ]
}

#[test]
fn test_stations_coalesce_to_json() {
    let trees: Vec<_> = ResultStream::new(VecRowSource::new(station_rows()), station_view())
        .map(|tree| tree.unwrap().to_json())
        .collect();

    assert_eq!(
        trees,
        vec![
            json!({
                "@id": "http://ex.org/s1",
                "label": "Bourton",
                "measures": [
                    { "@id": "http://ex.org/m1", "parameter": "level", "unit": "m" },
                    { "@id": "http://ex.org/m2", "parameter": "flow" }
                ]
            }),
            json!({ "@id": "http://ex.org/s2", "label": "Ashford", "town": "Ashford" }),
        ]
    );
}

#[test]
fn test_abandoned_stream_closes_source_once() {
    let mut rows = station_rows().into_iter();
    let mut source = MockSource::new();
    source
        .expect_next_row()
        .returning(move || Ok(rows.next()));
    source.expect_close().times(1).return_const(());

    let mut stream = ResultStream::new(source, station_view());
    let first = stream.next().unwrap().unwrap();
    assert_eq!(first.children("measures").len(), 2);
    assert!(!stream.is_closed());
    drop(stream);
}

#[test]
fn test_boxed_source() {
    let source: Box<dyn RowSource> = Box::new(VecRowSource::new(station_rows()));
    let count = ResultStream::new(source, station_view()).filter(Result::is_ok).count();
    assert_eq!(count, 2);
}

//! Path resolution over nested views

use viewgraph::view_catalog::{PathLookup, PropertyEntry, ViewPath, ViewSpecError, ViewTree};

fn leaf(name: &str) -> PropertyEntry {
    PropertyEntry::new(name, format!("http://ex.org/{}", name)).unwrap()
}

fn nested(name: &str, children: Vec<PropertyEntry>) -> PropertyEntry {
    leaf(name).with_nested(ViewTree::from_entries(children).unwrap())
}

/// `{foo:{bar:{label}}, label}`
fn ambiguous_view() -> ViewTree {
    ViewTree::from_entries(vec![
        nested("foo", vec![nested("bar", vec![leaf("label")])]),
        leaf("label"),
    ])
    .unwrap()
}

#[test]
fn test_breadth_first_prefers_top_level_label() {
    let view = ambiguous_view();
    assert_eq!(view.path_to("label").unwrap(), ViewPath::new(["label"]));
    assert_eq!(
        view.path_to("foo.bar.label").unwrap(),
        ViewPath::new(["foo", "bar", "label"])
    );
}

#[test]
fn test_stricter_lookup_modes() {
    let view = ambiguous_view();
    assert!(matches!(
        view.path_to_with("label", PathLookup::Unambiguous),
        Err(ViewSpecError::AmbiguousName { .. })
    ));
    assert!(matches!(
        view.path_to_with("bar", PathLookup::Qualified),
        Err(ViewSpecError::PathNotFound { .. })
    ));
    assert_eq!(
        view.path_to_with("bar", PathLookup::BreadthFirst).unwrap(),
        ViewPath::new(["foo", "bar"])
    );
}

#[test]
fn test_lookup_by_property_iri() {
    let view = ambiguous_view();
    assert_eq!(
        view.path_to_uri("http://ex.org/label").unwrap(),
        ViewPath::new(["label"])
    );
    assert!(matches!(
        view.path_to_uri("http://ex.org/missing"),
        Err(ViewSpecError::UnknownProperty { .. })
    ));
}

#[test]
fn test_find_entry_past_leaf() {
    let view = ambiguous_view();
    assert!(view.find_entry(&ViewPath::new(["label", "deeper"])).is_none());
    assert!(view.find_entry(&ViewPath::new(["foo", "bar"])).unwrap().is_nested());
}

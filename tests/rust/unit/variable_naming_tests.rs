//! Path ↔ variable encoding through the public API

use test_case::test_case;
use viewgraph::utils::variable_naming::{decode_variable, encode_segments};
use viewgraph::view_catalog::ViewPath;

#[test_case(&["foo", "fu_bar"], "foo_fu__bar" ; "underscore inside a segment is doubled")]
#[test_case(&["label"], "label" ; "single segment")]
#[test_case(&["a", "b", "c"], "a_b_c" ; "three segments")]
#[test_case(&["a__b", "c"], "a____b_c" ; "double underscore")]
#[test_case(&["x_", "y"], "x___y" ; "trailing underscore")]
fn test_round_trip(segments: &[&str], variable: &str) {
    assert_eq!(encode_segments(segments), variable);
    assert_eq!(decode_variable(variable), segments);

    let path = ViewPath::new(segments.iter().copied());
    assert_eq!(path.as_variable_name("id"), variable);
    assert_eq!(ViewPath::from_variable_name(variable, "id"), path);
}

#[test]
fn test_root_path_is_root_variable() {
    assert_eq!(ViewPath::root().as_variable_name("id"), "id");
    assert_eq!(ViewPath::root().as_variable_name("item"), "item");
    assert!(ViewPath::from_variable_name("item", "item").is_root());
}

#[test]
fn test_dotted_form() {
    let path = ViewPath::parse_dotted("floodArea.county");
    assert_eq!(path.to_dotted(), "floodArea.county");
    assert_eq!(path.as_variable_name("id"), "floodArea_county");
}

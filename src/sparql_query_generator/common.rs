use std::collections::{BTreeMap, HashMap};

use super::pattern::path_pattern;
use super::query_shape::{FilterClause, QueryShape};
use super::to_sparql::{variable, ToSparql};
use crate::term::Term;
use crate::utils::sparql_escape::substitute_bindings;
use crate::view_catalog::{ViewSpecError, ViewTree};

/// `?v`, or `(term AS ?v)` when the variable is pre-bound
pub(super) fn projection_item(name: &str, bindings: &BTreeMap<String, Term>) -> String {
    match bindings.get(name) {
        Some(term) => format!("({} AS ?{})", term.to_sparql(), name),
        None => variable(name),
    }
}

pub(super) fn order_condition(name: &str, descending: bool) -> String {
    if descending {
        format!("DESC(?{})", name)
    } else {
        variable(name)
    }
}

pub(super) fn filter_expression(
    filter: &FilterClause,
    tree: &ViewTree,
    root_variable: &str,
) -> Result<String, ViewSpecError> {
    let var = variable(&filter.path().as_variable_name(root_variable));
    let text = match filter {
        FilterClause::Equals { values, .. } => match values.as_slice() {
            [single] => format!("FILTER({} = {})", var, single.to_sparql()),
            many => {
                let list: Vec<String> = many.iter().map(Term::to_sparql).collect();
                format!("FILTER({} IN ({}))", var, list.join(", "))
            }
        },
        FilterClause::Range { op, value, .. } => {
            format!("FILTER({} {} {})", var, op.symbol(), value.to_sparql())
        }
        FilterClause::Exists { path, must_exist } => {
            let chain: Vec<String> = path_pattern(tree, path, root_variable)?
                .iter()
                .map(|e| e.to_sparql().trim().to_string())
                .collect();
            let keyword = if *must_exist { "EXISTS" } else { "NOT EXISTS" };
            format!("FILTER {} {{ {} }}", keyword, chain.join(" "))
        }
    };
    Ok(text)
}

pub(super) fn solution_modifiers(shape: &QueryShape) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(limit) = shape.limit {
        out.push(format!("LIMIT {}", limit));
    }
    if let Some(offset) = shape.offset.filter(|o| *o > 0) {
        out.push(format!("OFFSET {}", offset));
    }
    out
}

/// Substitute pre-bindings after the first `{`, leaving the projection alone.
pub(super) fn substitute_where(query: &str, bindings: &BTreeMap<String, Term>) -> String {
    if bindings.is_empty() {
        return query.to_string();
    }
    let map: HashMap<String, Term> = bindings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    match query.find('{') {
        Some(pos) => {
            let (head, body) = query.split_at(pos);
            format!("{}{}", head, substitute_bindings(body, &map))
        }
        None => query.to_string(),
    }
}

pub(super) fn substitute_text(text: &str, bindings: &BTreeMap<String, Term>) -> String {
    if bindings.is_empty() {
        return text.to_string();
    }
    let map: HashMap<String, Term> = bindings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    substitute_bindings(text, &map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql_query_generator::query_shape::RangeOp;
    use crate::view_catalog::{PropertyEntry, ViewPath};

    fn tree() -> ViewTree {
        ViewTree::from_entries(vec![
            PropertyEntry::new("severity", "http://ex.org/severity").unwrap(),
            PropertyEntry::new("area", "http://ex.org/area").unwrap().optional().with_nested(
                ViewTree::from_entries(vec![PropertyEntry::new("county", "http://ex.org/county").unwrap()])
                    .unwrap(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_equals_single_and_set() {
        let one = FilterClause::Equals {
            path: ViewPath::new(["severity"]),
            values: vec![Term::integer(3)],
        };
        assert_eq!(
            filter_expression(&one, &tree(), "id").unwrap(),
            "FILTER(?severity = \"3\"^^<http://www.w3.org/2001/XMLSchema#integer>)"
        );

        let set = FilterClause::Equals {
            path: ViewPath::new(["severity"]),
            values: vec![Term::integer(1), Term::integer(2)],
        };
        assert_eq!(
            filter_expression(&set, &tree(), "id").unwrap(),
            format!("FILTER(?severity IN ({}, {}))", Term::integer(1), Term::integer(2))
        );
    }

    #[test]
    fn test_range_filter() {
        let range = FilterClause::Range {
            path: ViewPath::new(["severity"]),
            op: RangeOp::Le,
            value: Term::integer(2),
        };
        assert_eq!(
            filter_expression(&range, &tree(), "id").unwrap(),
            format!("FILTER(?severity <= {})", Term::integer(2))
        );
    }

    #[test]
    fn test_exists_filter_uses_path_chain() {
        let exists = FilterClause::Exists {
            path: ViewPath::new(["area", "county"]),
            must_exist: false,
        };
        assert_eq!(
            filter_expression(&exists, &tree(), "id").unwrap(),
            "FILTER NOT EXISTS { ?id <http://ex.org/area> ?area . ?area <http://ex.org/county> ?area_county . }"
        );
    }

    #[test]
    fn test_projection_item_for_bound_variable() {
        let mut bindings = BTreeMap::new();
        bindings.insert("id".to_string(), Term::iri("http://ex.org/w1"));
        assert_eq!(projection_item("id", &bindings), "(<http://ex.org/w1> AS ?id)");
        assert_eq!(projection_item("x", &bindings), "?x");
    }

    #[test]
    fn test_substitute_where_keeps_projection() {
        let mut bindings = BTreeMap::new();
        bindings.insert("id".to_string(), Term::iri("http://ex.org/w1"));
        assert_eq!(
            substitute_where("SELECT ?id WHERE { ?id <http://ex.org/p> ?p }", &bindings),
            "SELECT ?id WHERE { <http://ex.org/w1> <http://ex.org/p> ?p }"
        );
    }
}

//! Nested-select strategy: page over entities, then expand them.
//!
//! The inner query selects root ids only (plus declared extra projections and
//! aggregated sort keys), so LIMIT/OFFSET count entities. The outer query joins
//! the full view pattern against that id set and restores the order.
//!
//! ```text
//! SELECT ?id ...view vars... ?_sort0
//! WHERE {
//!   {
//!     SELECT ?id (MIN(?severity) AS ?_sort0)
//!     WHERE { base, mandatory skeleton, filter joins, OPTIONAL sort joins, filters }
//!     GROUP BY ?id
//!     ORDER BY ?_sort0 ?id
//!     LIMIT n OFFSET m
//!   }
//!   ...full view pattern...
//! }
//! ORDER BY ?_sort0 ?id
//! ```
//!
//! Sort keys aggregate with MIN (ascending) or MAX (descending) so an entity
//! with several values for a sort path still occupies one inner row.

use std::collections::HashSet;

use super::common::{
    filter_expression, order_condition, projection_item, solution_modifiers, substitute_text,
};
use super::errors::QueryBuildError;
use super::pattern::{compile_view, path_pattern, GraphPattern, PatternElement, PatternMode};
use super::query_shape::{FilterClause, QueryShape};
use super::to_sparql::ToSparql;
use crate::utils::variable_naming::sort_key_variable;
use crate::view_catalog::{ViewSpecError, ViewTree};

struct SortColumn {
    source: String,
    alias: String,
    descending: bool,
}

pub fn render(view: &ViewTree, shape: &QueryShape, root_variable: &str) -> Result<String, QueryBuildError> {
    let sort_columns: Vec<SortColumn> = shape
        .sort
        .iter()
        .map(|k| (k.path.as_variable_name(root_variable), k.descending))
        .filter(|(var, _)| !shape.is_bound(var))
        .enumerate()
        .map(|(i, (source, descending))| SortColumn {
            source,
            alias: sort_key_variable(i),
            descending,
        })
        .collect();

    let inner = render_inner(view, shape, root_variable, &sort_columns)?;

    let full = compile_view(view, root_variable, PatternMode::Full);
    let mut projection: Vec<String> = full
        .variables
        .iter()
        .chain(shape.projection.iter().filter(|v| !full.variables.contains(v)))
        .map(|v| {
            // the inner select already binds these
            if v == root_variable || shape.projection.contains(v) {
                format!("?{}", v)
            } else {
                projection_item(v, &shape.bindings)
            }
        })
        .collect();
    projection.extend(sort_columns.iter().map(|c| format!("?{}", c.alias)));

    let mut query = String::new();
    query.push_str(if shape.distinct { "SELECT DISTINCT " } else { "SELECT " });
    query.push_str(&projection.join(" "));
    query.push_str("\nWHERE {\n  {\n");
    for line in inner.lines() {
        query.push_str("    ");
        query.push_str(line);
        query.push('\n');
    }
    query.push_str("  }\n");
    query.push_str(&substitute_text(&full.to_sparql_body(1), &shape.bindings));
    query.push_str("}\n");
    if let Some(order) = order_by(&sort_columns, root_variable, shape) {
        query.push_str(&order);
        query.push('\n');
    }
    Ok(query)
}

fn render_inner(
    view: &ViewTree,
    shape: &QueryShape,
    root_variable: &str,
    sort_columns: &[SortColumn],
) -> Result<String, QueryBuildError> {
    let body = inner_pattern(view, shape, root_variable)?;

    let extras: Vec<&String> = shape.projection.iter().filter(|v| *v != root_variable).collect();
    let mut projection = vec![projection_item(root_variable, &shape.bindings)];
    projection.extend(extras.iter().map(|v| projection_item(v, &shape.bindings)));

    let mut query = String::new();
    if sort_columns.is_empty() {
        query.push_str("SELECT DISTINCT ");
        query.push_str(&projection.join(" "));
    } else {
        projection.extend(sort_columns.iter().map(|c| {
            let aggregate = if c.descending { "MAX" } else { "MIN" };
            format!("({}(?{}) AS ?{})", aggregate, c.source, c.alias)
        }));
        query.push_str("SELECT ");
        query.push_str(&projection.join(" "));
    }
    query.push_str("\nWHERE {\n");
    query.push_str(&substitute_text(&body.to_sparql_indented(1), &shape.bindings));
    query.push_str("}\n");

    if !sort_columns.is_empty() {
        let group: Vec<String> = std::iter::once(root_variable)
            .chain(extras.iter().map(|v| v.as_str()))
            .filter(|v| !shape.is_bound(v))
            .map(|v| format!("?{}", v))
            .collect();
        if !group.is_empty() {
            query.push_str(&format!("GROUP BY {}\n", group.join(" ")));
        }
    }
    if let Some(order) = order_by(sort_columns, root_variable, shape) {
        query.push_str(&order);
        query.push('\n');
    }
    for modifier in solution_modifiers(shape) {
        query.push_str(&modifier);
        query.push('\n');
    }
    Ok(query)
}

/// Early fragments, base pattern, mandatory skeleton, joins for filter and
/// sort paths, filter expressions, late fragments.
fn inner_pattern(view: &ViewTree, shape: &QueryShape, root_variable: &str) -> Result<GraphPattern, ViewSpecError> {
    let mut elements: Vec<PatternElement> = shape
        .early
        .iter()
        .chain(shape.base.iter())
        .map(|f| PatternElement::Raw(f.clone()))
        .collect();

    let skeleton = compile_view(view, root_variable, PatternMode::MandatoryOnly);
    let mut joined: HashSet<String> = skeleton.variables.iter().cloned().collect();
    elements.extend(skeleton.pattern.elements);

    for filter in &shape.filters {
        if let FilterClause::Exists { .. } = filter {
            continue;
        }
        for triple in path_pattern(view, filter.path(), root_variable)? {
            if let PatternElement::Block { pairs, .. } = &triple {
                if pairs.iter().all(|(_, object)| joined.contains(object)) {
                    continue;
                }
                joined.extend(pairs.iter().map(|(_, object)| object.clone()));
            }
            elements.push(triple);
        }
    }

    for key in &shape.sort {
        let var = key.path.as_variable_name(root_variable);
        if joined.contains(&var) || shape.is_bound(&var) {
            continue;
        }
        let chain = path_pattern(view, &key.path, root_variable)?;
        for triple in &chain {
            if let PatternElement::Block { pairs, .. } = triple {
                joined.extend(pairs.iter().map(|(_, object)| object.clone()));
            }
        }
        elements.push(PatternElement::Optional(chain));
    }

    for filter in &shape.filters {
        elements.push(PatternElement::Raw(filter_expression(filter, view, root_variable)?));
    }
    elements.extend(shape.late.iter().map(|f| PatternElement::Raw(f.clone())));

    Ok(GraphPattern::new(elements))
}

fn order_by(sort_columns: &[SortColumn], root_variable: &str, shape: &QueryShape) -> Option<String> {
    let mut conditions: Vec<String> = sort_columns
        .iter()
        .map(|c| order_condition(&c.alias, c.descending))
        .collect();
    if !shape.is_bound(root_variable) {
        conditions.push(format!("?{}", root_variable));
    }
    if conditions.is_empty() {
        None
    } else {
        Some(format!("ORDER BY {}", conditions.join(" ")))
    }
}

//! Flat strategy: one query, with filters, ordering and paging spliced in at
//! comment markers.
//!
//! Templates carry four markers, each on its own line or inline:
//!
//! ```text
//! SELECT ?id ?a ?b
//! WHERE {
//!   #$INJECT$        early fragments and the base pattern
//!   ...view pattern...
//!   #$FILTER$        filter expressions and late fragments
//! }
//! #$SORT$            ORDER BY, root variable last
//! #$MODIFIERS$       LIMIT / OFFSET
//! ```
//!
//! A marker with nothing to place is removed. A marker that is needed but
//! absent from a configured template is a `MissingMarker` error.

use super::common::{
    filter_expression, order_condition, projection_item, solution_modifiers, substitute_where,
};
use super::errors::QueryBuildError;
use super::pattern::{compile_view, is_single_valued_path, PatternMode};
use super::query_shape::QueryShape;
use crate::view_catalog::ViewTree;

pub const INJECT_MARKER: &str = "#$INJECT$";
pub const FILTER_MARKER: &str = "#$FILTER$";
pub const SORT_MARKER: &str = "#$SORT$";
pub const MODIFIERS_MARKER: &str = "#$MODIFIERS$";

/// Template generated from the view when the endpoint configures none
pub fn default_template(view: &ViewTree, shape: &QueryShape, root_variable: &str) -> String {
    let compiled = compile_view(view, root_variable, PatternMode::Full);
    let projection: Vec<String> = compiled
        .variables
        .iter()
        .chain(shape.projection.iter().filter(|v| !compiled.variables.contains(v)))
        .map(|v| projection_item(v, &shape.bindings))
        .collect();

    let mut query = String::new();
    query.push_str(if shape.distinct { "SELECT DISTINCT " } else { "SELECT " });
    query.push_str(&projection.join(" "));
    query.push_str("\nWHERE {\n  ");
    query.push_str(INJECT_MARKER);
    query.push('\n');
    query.push_str(&compiled.to_sparql_body(1));
    query.push_str("  ");
    query.push_str(FILTER_MARKER);
    query.push_str("\n}\n");
    query.push_str(SORT_MARKER);
    query.push('\n');
    query.push_str(MODIFIERS_MARKER);
    query.push('\n');
    query
}

pub fn render(
    view: &ViewTree,
    shape: &QueryShape,
    root_variable: &str,
    template: Option<&str>,
) -> Result<String, QueryBuildError> {
    let paged = shape.limit.is_some() || shape.offset.is_some_and(|o| o > 0);
    if paged && view.requires_nested_select() {
        return Err(QueryBuildError::nested_select_required(
            "view has multivalued or optional nested entries, so LIMIT/OFFSET would count rows instead of entities",
        ));
    }
    if let Some(key) = shape
        .sort
        .iter()
        .find(|k| !is_single_valued_path(view, &k.path))
    {
        return Err(QueryBuildError::nested_select_required(format!(
            "sorting on multivalued path `{}`",
            key.path
        )));
    }

    let template = match template {
        Some(t) => t.to_string(),
        None => default_template(view, shape, root_variable),
    };

    let inject: Vec<String> = shape.early.iter().chain(shape.base.iter()).cloned().collect();

    let mut filters = Vec::with_capacity(shape.filters.len() + shape.late.len());
    for filter in &shape.filters {
        filters.push(filter_expression(filter, view, root_variable)?);
    }
    filters.extend(shape.late.iter().cloned());

    let order: Vec<String> = shape
        .sort
        .iter()
        .map(|k| (k.path.as_variable_name(root_variable), k.descending))
        .chain(std::iter::once((root_variable.to_string(), false)))
        .filter(|(var, _)| !shape.is_bound(var))
        .map(|(var, desc)| order_condition(&var, desc))
        .collect();
    let sort = if order.is_empty() {
        Vec::new()
    } else {
        vec![format!("ORDER BY {}", order.join(" "))]
    };

    let mut query = splice(&template, INJECT_MARKER, &inject)?;
    query = splice(&query, FILTER_MARKER, &filters)?;
    query = splice(&query, SORT_MARKER, &sort)?;
    query = splice(&query, MODIFIERS_MARKER, &solution_modifiers(shape))?;

    Ok(substitute_where(&query, &shape.bindings))
}

/// Replace `marker` with `lines`, indenting continuation lines like the marker.
fn splice(text: &str, marker: &str, lines: &[String]) -> Result<String, QueryBuildError> {
    if !text.contains(marker) {
        if lines.is_empty() {
            return Ok(text.to_string());
        }
        return Err(QueryBuildError::MissingMarker {
            marker: marker.to_string(),
            content: lines.join(" "),
        });
    }

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !line.contains(marker) {
            out.push_str(line);
            continue;
        }
        if lines.is_empty() && line.trim() == marker {
            continue;
        }
        let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        let separator = format!("\n{}", indent);
        let content: Vec<&str> = lines.iter().flat_map(|l| l.lines()).map(str::trim).collect();
        out.push_str(&line.replace(marker, &content.join(&separator)));
    }
    Ok(out)
}

//! Request parameter → builder translation.
//!
//! | parameter          | builder call                          |
//! |--------------------|---------------------------------------|
//! | `name=v` (repeat)  | `filter(name, v)` / value set          |
//! | `min-name=v`       | `filter_range(name, >=, v)`            |
//! | `minEx-name=v`     | `filter_range(name, >, v)`             |
//! | `max-name=v`       | `filter_range(name, <=, v)`            |
//! | `maxEx-name=v`     | `filter_range(name, <, v)`             |
//! | `exists-name=bool` | `filter_exists(name, bool)`            |
//! | `_sort=a,-b`       | `sort(a, asc)`, `sort(b, desc)`        |
//! | `_limit`, `_offset`| `limit(count, offset)`                 |
//! | `_near=lat,lon,km` | `near(lat, lon, km)`                   |
//! | `_distinct=bool`   | `distinct(bool)`                       |
//!
//! `_view` is consumed by the endpoint before translation. Other
//! underscore-prefixed parameters belong to outer layers and are ignored.

use crate::sparql_query_generator::{FilterValue, QueryBuildError, RangeOp, ViewQueryBuilder};
use crate::term::{PrefixMap, Term};

pub const VIEW_PARAM: &str = "_view";

const RANGE_PREFIXES: [(&str, RangeOp); 4] = [
    ("minEx-", RangeOp::Gt),
    ("maxEx-", RangeOp::Lt),
    ("min-", RangeOp::Ge),
    ("max-", RangeOp::Le),
];

/// Apply request parameters to a prototype builder.
pub fn apply_params(
    prototype: &ViewQueryBuilder,
    params: &[(String, String)],
    prefixes: &PrefixMap,
) -> Result<ViewQueryBuilder, QueryBuildError> {
    let mut builder = prototype.clone();
    let mut limit = None;
    let mut offset = None;

    // equality filters grouped by name, first-occurrence order
    let mut equalities: Vec<(&str, Vec<&str>)> = Vec::new();

    for (name, value) in params {
        let (name, value) = (name.as_str(), value.as_str());
        match name {
            VIEW_PARAM => {}
            "_limit" => limit = Some(parse_count(name, value)?),
            "_offset" => offset = Some(parse_count(name, value)?),
            "_sort" => {
                for key in value.split(',').map(str::trim).filter(|k| !k.is_empty()) {
                    builder = match key.strip_prefix('-') {
                        Some(path) => builder.sort(path, true)?,
                        None => builder.sort(key.strip_prefix('+').unwrap_or(key), false)?,
                    };
                }
            }
            "_near" => {
                let (lat, lon, km) = parse_near(value)?;
                builder = builder.near(lat, lon, km);
            }
            "_distinct" => builder = builder.distinct(parse_bool(name, value)?),
            _ if name.starts_with('_') => {
                log::debug!("Ignoring reserved parameter `{}`", name);
            }
            _ => {
                if let Some(path) = name.strip_prefix("exists-") {
                    builder = builder.filter_exists(path, parse_bool(name, value)?)?;
                } else if let Some((op, path)) = range_param(name) {
                    let term = param_value(&builder, path, value, prefixes)?;
                    builder = builder.filter_range(path, op, term)?;
                } else {
                    match equalities.iter_mut().find(|(n, _)| *n == name) {
                        Some((_, values)) => values.push(value),
                        None => equalities.push((name, vec![value])),
                    }
                }
            }
        }
    }

    for (name, values) in equalities {
        let terms = values
            .iter()
            .map(|v| param_value(&builder, name, v, prefixes))
            .collect::<Result<Vec<Term>, _>>()?;
        let value = match <[Term; 1]>::try_from(terms) {
            Ok([single]) => FilterValue::One(single),
            Err(many) => FilterValue::Many(many),
        };
        builder = builder.filter(name, value)?;
    }

    if limit.is_some() || offset.is_some() {
        builder = builder.limit(limit.or(builder.shape().limit), offset);
    }
    Ok(builder)
}

fn range_param(name: &str) -> Option<(RangeOp, &str)> {
    RANGE_PREFIXES
        .iter()
        .find_map(|(prefix, op)| name.strip_prefix(prefix).map(|path| (*op, path)))
}

/// Interpret a raw value using the declared range of the entry it filters.
fn param_value(
    builder: &ViewQueryBuilder,
    name: &str,
    raw: &str,
    prefixes: &PrefixMap,
) -> Result<Term, QueryBuildError> {
    let path = builder.resolve_path(name)?;
    let entry = builder
        .view()
        .find_entry(&path)
        .ok_or_else(|| crate::view_catalog::ViewSpecError::path_not_found(name))?;
    entry
        .value_from_param(raw, prefixes)
        .map_err(|e| QueryBuildError::invalid_parameter(name, raw, e.to_string()))
}

fn parse_count(name: &str, value: &str) -> Result<u64, QueryBuildError> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryBuildError::invalid_parameter(name, value, "expected a non-negative integer"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, QueryBuildError> {
    match value.trim() {
        "true" | "yes" | "1" | "" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(QueryBuildError::invalid_parameter(name, value, "expected true or false")),
    }
}

fn parse_near(value: &str) -> Result<(f64, f64, f64), QueryBuildError> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| QueryBuildError::invalid_parameter("_near", value, "expected lat,lon,km"))?;
    if parts.iter().any(|p| !p.is_finite()) {
        return Err(QueryBuildError::invalid_parameter("_near", value, "coordinates and radius must be finite"));
    }
    match parts.as_slice() {
        [lat, lon, km] => Ok((*lat, *lon, *km)),
        _ => Err(QueryBuildError::invalid_parameter("_near", value, "expected lat,lon,km")),
    }
}

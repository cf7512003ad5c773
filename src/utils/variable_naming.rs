//! Centralized query-variable naming for view paths.
//!
//! **CRITICAL**: All variable names derived from view paths MUST go through
//! these functions. The query compiler emits them and the result coalescer
//! decodes them again, so the two sides only agree if they share one encoding.
//!
//! ## Naming Convention
//! Format: `{segment}_{segment}_...`
//! - A literal `_` inside a segment is doubled (`_` → `__`)
//! - Segments are joined with a single `_`
//! - Legal segments start with an ASCII letter, so a doubled underscore can
//!   always be told apart from a separator when decoding left to right
//!
//! Examples:
//! - `["floodArea", "county"]` → `"floodArea_county"`
//! - `["foo", "fu_bar"]` → `"foo_fu__bar"`
//! - `["a_", "b"]` → `"a___b"` (`a__` + `_` + `b`)
//!
//! Variables that start with an underscore (`_sort0`) never decode to a legal
//! path and are reserved for compiler-internal use.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SHORT_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
}

/// Check a short name against the legal alphabet `[A-Za-z][A-Za-z0-9_]*`.
pub fn is_legal_short_name(name: &str) -> bool {
    SHORT_NAME.is_match(name)
}

/// Encode path segments as a single variable name.
///
/// # Examples
/// ```
/// use viewgraph::utils::variable_naming::encode_segments;
///
/// assert_eq!(encode_segments(&["foo", "fu_bar"]), "foo_fu__bar");
/// assert_eq!(encode_segments(&["severity"]), "severity");
/// ```
pub fn encode_segments(segments: &[impl AsRef<str>]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().replace('_', "__"))
        .collect::<Vec<_>>()
        .join("_")
}

/// Decode a variable name back into path segments.
///
/// Reading left to right, `__` is a literal underscore and a single `_` is a
/// separator.
///
/// # Examples
/// ```
/// use viewgraph::utils::variable_naming::decode_variable;
///
/// assert_eq!(decode_variable("foo_fu__bar"), vec!["foo", "fu_bar"]);
/// assert_eq!(decode_variable("a___b"), vec!["a_", "b"]);
/// ```
pub fn decode_variable(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '_' {
            current.push(c);
            continue;
        }
        if chars.peek() == Some(&'_') {
            chars.next();
            current.push('_');
        } else {
            segments.push(std::mem::take(&mut current));
        }
    }
    segments.push(current);
    segments
}

/// Internal variable used to carry the aggregated key for the `index`-th sort
/// criterion out of an inner query.
pub fn sort_key_variable(index: usize) -> String {
    format!("_sort{}", index)
}

/// True for compiler-internal variables that never map to a view path.
pub fn is_internal_variable(name: &str) -> bool {
    name.starts_with('_')
}

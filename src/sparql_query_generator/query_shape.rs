//! Immutable description of one query request.
//!
//! A [`QueryShape`] is a plain value: every `with_*` method returns a modified
//! copy and leaves the receiver untouched, so a configured prototype can be
//! shared between threads and specialised per request.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::term::{PrefixMap, Term};
use crate::view_catalog::ViewPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl RangeOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RangeOp::Lt => "<",
            RangeOp::Le => "<=",
            RangeOp::Gt => ">",
            RangeOp::Ge => ">=",
        }
    }
}

/// One filter condition on a view path
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// One value renders as `=`, several as `IN (...)`
    Equals { path: ViewPath, values: Vec<Term> },
    Range { path: ViewPath, op: RangeOp, value: Term },
    Exists { path: ViewPath, must_exist: bool },
}

impl FilterClause {
    pub fn path(&self) -> &ViewPath {
        match self {
            FilterClause::Equals { path, .. }
            | FilterClause::Range { path, .. }
            | FilterClause::Exists { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: ViewPath,
    pub descending: bool,
}

/// Text rewrite applied to the rendered query, in registration order
#[derive(Clone)]
pub struct NamedTransform {
    pub name: String,
    apply: Arc<dyn Fn(String) -> String + Send + Sync>,
}

impl NamedTransform {
    pub fn new(name: impl Into<String>, apply: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        NamedTransform {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Prepend `PREFIX` declarations for every prefix the query text uses.
    pub fn prefix_declarations(prefixes: PrefixMap) -> Self {
        NamedTransform::new("prefixes", move |query| {
            let used: Vec<String> = prefixes
                .iter()
                .filter(|(prefix, _)| query.contains(&format!("{}:", prefix)))
                .map(|(prefix, namespace)| format!("PREFIX {}: <{}>\n", prefix, namespace))
                .collect();
            if used.is_empty() {
                query
            } else {
                format!("{}{}", used.concat(), query)
            }
        })
    }

    pub fn apply(&self, query: String) -> String {
        (self.apply)(query)
    }
}

impl fmt::Debug for NamedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedTransform").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryShape {
    /// Fragments joined before the base pattern
    pub early: Vec<String>,
    /// Endpoint base pattern selecting the candidate entities
    pub base: Option<String>,
    /// Fragments joined after the view pattern
    pub late: Vec<String>,
    pub bindings: BTreeMap<String, Term>,
    pub filters: Vec<FilterClause>,
    pub sort: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    /// Extra variables projected alongside the root id
    pub projection: Vec<String>,
    pub transforms: Vec<NamedTransform>,
}

impl QueryShape {
    pub fn new() -> Self {
        Self::default()
    }

    fn modified(&self, change: impl FnOnce(&mut QueryShape)) -> Self {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    pub fn with_base(&self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.modified(|s| s.base = Some(base))
    }

    pub fn with_early(&self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.modified(|s| s.early.push(fragment))
    }

    pub fn with_late(&self, fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        self.modified(|s| s.late.push(fragment))
    }

    pub fn with_binding(&self, variable: impl Into<String>, value: Term) -> Self {
        let variable = variable.into();
        self.modified(|s| {
            s.bindings.insert(variable, value);
        })
    }

    pub fn with_filter(&self, filter: FilterClause) -> Self {
        self.modified(|s| s.filters.push(filter))
    }

    pub fn with_sort(&self, key: SortKey) -> Self {
        self.modified(|s| s.sort.push(key))
    }

    pub fn with_limit(&self, limit: Option<u64>, offset: Option<u64>) -> Self {
        self.modified(|s| {
            s.limit = limit;
            s.offset = offset;
        })
    }

    pub fn with_distinct(&self, distinct: bool) -> Self {
        self.modified(|s| s.distinct = distinct)
    }

    pub fn with_projection(&self, variable: impl Into<String>) -> Self {
        let variable = variable.into();
        self.modified(|s| {
            if !s.projection.contains(&variable) {
                s.projection.push(variable);
            }
        })
    }

    pub fn with_transform(&self, transform: NamedTransform) -> Self {
        self.modified(|s| s.transforms.push(transform))
    }

    pub fn is_bound(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    /// Apply the transform chain to rendered query text.
    pub fn transform(&self, query: String) -> String {
        self.transforms.iter().fold(query, |q, t| {
            log::trace!("Applying query transform `{}`", t.name);
            t.apply(q)
        })
    }
}

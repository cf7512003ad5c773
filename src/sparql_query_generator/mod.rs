//! View → SPARQL compilation.
//!
//! [`pattern`] turns a view tree into a graph pattern; [`ViewQueryBuilder`]
//! accumulates a request's filters, ordering and paging in a [`QueryShape`] and
//! renders it with one of two [`QueryStrategy`] implementations.

mod builder;
mod common;
mod errors;
pub mod flat;
mod limits;
pub mod nested_select;
pub mod pattern;
mod query_shape;
mod to_sparql;

pub use builder::{FilterValue, QueryStrategy, ViewQueryBuilder};
pub use errors::QueryBuildError;
pub use limits::LimitPolicy;
pub use pattern::{compile_view, path_pattern, CompiledPattern, GraphPattern, PatternElement, PatternMode};
pub use query_shape::{FilterClause, NamedTransform, QueryShape, RangeOp, SortKey};
pub use to_sparql::ToSparql;

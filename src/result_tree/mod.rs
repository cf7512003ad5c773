//! Coalescing flat query rows into nested result trees.

mod coalescer;
mod errors;
mod row_source;
mod sparql_json;
mod tree;

pub use coalescer::ResultStream;
pub use errors::{CoalesceError, RowSourceError};
pub use row_source::{IterRowSource, Row, RowSource, VecRowSource};
pub use sparql_json::SparqlJsonRowSource;
pub use tree::{ResultTree, ResultValue};

//! Endpoints: a view bound to a base query, limits and a strategy, plus the
//! translation of request parameters into builder calls.

mod catalog;
#[allow(clippy::module_inception)]
mod endpoint;
mod request;

pub use catalog::EndpointCatalog;
pub use endpoint::Endpoint;
pub use request::{apply_params, VIEW_PARAM};

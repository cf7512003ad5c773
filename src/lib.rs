//! viewgraph - nested views over SPARQL endpoints
//!
//! This crate exposes graph data through declarative, nestable views:
//! - View trees and named view catalogs loaded from YAML/JSON
//! - Compilation of views and request parameters into SPARQL queries
//!   (flat and nested-select strategies)
//! - Streaming coalescing of flat result rows into one tree per entity

pub mod utils;

pub mod config;
pub mod endpoint;
pub mod result_tree;
pub mod sparql_query_generator;
pub mod term;
pub mod view_catalog;

//! Unit tests - public API behaviour that needs no SPARQL backend

mod query_builder_tests;
mod variable_naming_tests;
mod view_lookup_tests;

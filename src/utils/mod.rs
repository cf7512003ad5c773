pub mod sparql_escape;
pub mod variable_naming;

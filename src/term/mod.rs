//! RDF term values
//!
//! A [`Term`] is the atomic value exchanged with the SPARQL backend: an IRI, a
//! literal (optionally language-tagged or datatyped) or a blank node. Terms are
//! used in three places:
//!
//! - as constants in compiled queries (filter values, pre-bindings)
//! - as the bound values of rows produced by a row source
//! - as the terminal values of coalesced result trees
//!
//! The compact textual syntax accepted by [`parse_term`] is the one used in view
//! configuration documents and request parameters (`<iri>`, `prefix:local`,
//! `"lex"@en`, `"3"^^xsd:integer`, `_:b0`, bare numbers and booleans).

mod parser;
mod prefixes;

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

pub use parser::{parse_term, TermParseError};
pub use prefixes::PrefixMap;

use crate::utils::sparql_escape::escape_literal;

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// Characters that may not appear inside `<...>` in SPARQL
const IRI_FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

pub(crate) fn is_iri_char(c: char) -> bool {
    !(c.is_whitespace() || c.is_control() || IRI_FORBIDDEN.contains(&c))
}

/// True when `iri` can be written between angle brackets as is.
pub fn is_valid_iri(iri: &str) -> bool {
    iri.chars().all(is_iri_char)
}

pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A literal value with its lexical form and optional language or datatype.
///
/// A literal carries at most one of `language` and `datatype`; plain
/// `xsd:string` literals are normalized to `datatype: None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Literal(Literal),
    Blank(String),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// IRI from untrusted text, such as a request parameter.
    pub fn checked_iri(iri: impl Into<String>) -> Result<Self, TermParseError> {
        let iri = iri.into();
        if is_valid_iri(&iri) {
            Ok(Term::Iri(iri))
        } else {
            Err(TermParseError::InvalidIri { iri })
        }
    }

    /// Plain (untyped, untagged) literal
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        if datatype == XSD_STRING {
            return Term::literal(lexical);
        }
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: Some(datatype),
            language: None,
        })
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into().to_lowercase()),
        })
    }

    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), XSD_INTEGER)
    }

    pub fn boolean(value: bool) -> Self {
        Term::typed(value.to_string(), XSD_BOOLEAN)
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// IRI text, literal lexical form, or blank node label
    pub fn lexical_form(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Literal(lit) => &lit.lexical,
            Term::Blank(label) => label,
        }
    }

    /// Render this term in SPARQL query syntax.
    pub fn to_sparql(&self) -> String {
        match self {
            Term::Iri(iri) => format!("<{}>", iri),
            Term::Blank(label) => format!("_:{}", label),
            Term::Literal(lit) => {
                let quoted = format!("\"{}\"", escape_literal(&lit.lexical));
                match (&lit.language, &lit.datatype) {
                    (Some(lang), _) => format!("{}@{}", quoted, lang),
                    (None, Some(dt)) => format!("{}^^<{}>", quoted, dt),
                    (None, None) => quoted,
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::literal(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::integer(value)
    }
}

/// JSON rendering used by result trees.
///
/// IRIs and plain literals become strings, numeric and boolean literals become
/// JSON numbers/booleans when their lexical form parses, language-tagged
/// literals become `{"@value", "@language"}` objects and other typed literals
/// keep their lexical form.
impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Term::Iri(iri) => serializer.serialize_str(iri),
            Term::Blank(label) => serializer.serialize_str(&format!("_:{}", label)),
            Term::Literal(lit) => {
                if let Some(lang) = &lit.language {
                    let mut map = serializer.serialize_map(Some(2))?;
                    map.serialize_entry("@value", &lit.lexical)?;
                    map.serialize_entry("@language", lang)?;
                    return map.end();
                }
                match lit.datatype.as_deref() {
                    Some(XSD_BOOLEAN) => match lit.lexical.as_str() {
                        "true" | "1" => serializer.serialize_bool(true),
                        "false" | "0" => serializer.serialize_bool(false),
                        other => serializer.serialize_str(other),
                    },
                    Some(dt) if is_integer_datatype(dt) => match lit.lexical.parse::<i64>() {
                        Ok(n) => serializer.serialize_i64(n),
                        Err(_) => serializer.serialize_str(&lit.lexical),
                    },
                    Some(XSD_DECIMAL) | Some(XSD_DOUBLE) => match lit.lexical.parse::<f64>() {
                        Ok(n) if n.is_finite() => serializer.serialize_f64(n),
                        _ => serializer.serialize_str(&lit.lexical),
                    },
                    _ => serializer.serialize_str(&lit.lexical),
                }
            }
        }
    }
}

fn is_integer_datatype(datatype: &str) -> bool {
    match datatype.strip_prefix(XSD) {
        Some(local) => matches!(
            local,
            "integer"
                | "int"
                | "long"
                | "short"
                | "byte"
                | "nonNegativeInteger"
                | "positiveInteger"
                | "negativeInteger"
                | "nonPositiveInteger"
                | "unsignedInt"
                | "unsignedLong"
        ),
        None => false,
    }
}

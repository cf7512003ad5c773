//! Reader for the SPARQL 1.1 Query Results JSON format.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::errors::RowSourceError;
use super::row_source::{Row, RowSource, VecRowSource};
use crate::term::Term;

#[derive(Debug, Deserialize)]
struct ResultsDocument {
    head: Head,
    results: Results,
}

#[derive(Debug, Deserialize)]
struct Head {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Results {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl JsonTerm {
    fn into_term(self) -> Result<Term, RowSourceError> {
        match self.kind.as_str() {
            "uri" => Ok(Term::iri(self.value)),
            "bnode" => Ok(Term::blank(self.value)),
            "literal" | "typed-literal" => Ok(match (self.lang, self.datatype) {
                (Some(lang), _) => Term::lang(self.value, lang),
                (None, Some(datatype)) => Term::typed(self.value, datatype),
                (None, None) => Term::literal(self.value),
            }),
            other => Err(RowSourceError::Format(format!("unknown term type `{}`", other))),
        }
    }
}

/// Rows of a SPARQL JSON result document, in projection order
#[derive(Debug)]
pub struct SparqlJsonRowSource {
    rows: VecRowSource,
}

impl SparqlJsonRowSource {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RowSourceError> {
        let document: ResultsDocument = serde_json::from_reader(reader)
            .map_err(|e| RowSourceError::Format(e.to_string()))?;
        Self::from_document(document)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, RowSourceError> {
        let document: ResultsDocument =
            serde_json::from_str(json).map_err(|e| RowSourceError::Format(e.to_string()))?;
        Self::from_document(document)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RowSourceError> {
        let file = File::open(path.as_ref()).map_err(|e| {
            RowSourceError::Io(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    fn from_document(document: ResultsDocument) -> Result<Self, RowSourceError> {
        let vars = document.head.vars;
        let mut rows = Vec::with_capacity(document.results.bindings.len());
        for (index, mut solution) in document.results.bindings.into_iter().enumerate() {
            let mut row = Row::new();
            // projection order first, then anything the head did not list
            for var in &vars {
                if let Some(term) = solution.remove(var) {
                    row.insert(var.clone(), term.into_term().map_err(|e| {
                        RowSourceError::format_with_context(e.to_string(), format!("solution {}", index))
                    })?);
                }
            }
            let mut extra: Vec<(String, JsonTerm)> = solution.into_iter().collect();
            extra.sort_by(|a, b| a.0.cmp(&b.0));
            for (var, term) in extra {
                row.insert(var, term.into_term()?);
            }
            rows.push(row);
        }
        log::debug!("Read {} solutions over {} variables", rows.len(), vars.len());
        Ok(SparqlJsonRowSource {
            rows: VecRowSource::new(rows),
        })
    }
}

impl RowSource for SparqlJsonRowSource {
    fn next_row(&mut self) -> Result<Option<Row>, RowSourceError> {
        self.rows.next_row()
    }

    fn close(&mut self) {
        self.rows.close()
    }
}

//! Row sources feeding the coalescer.

use std::fmt;

use super::errors::RowSourceError;
use crate::term::Term;

/// One solution: variable name → bound term, in projection order.
/// An absent variable means "no value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    bindings: Vec<(String, Term)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `variable`, replacing an earlier binding of the same name.
    pub fn bind(mut self, variable: impl Into<String>, value: impl Into<Term>) -> Self {
        self.insert(variable, value);
        self
    }

    pub fn insert(&mut self, variable: impl Into<String>, value: impl Into<Term>) {
        let variable = variable.into();
        let value = value.into();
        match self.bindings.iter_mut().find(|(name, _)| *name == variable) {
            Some((_, existing)) => *existing = value,
            None => self.bindings.push((variable, value)),
        }
    }

    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Term>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Forward-only supplier of rows
///
/// `close` releases the underlying resources; it may be called more than once
/// and `next_row` is not called after it.
#[cfg_attr(test, mockall::automock)]
pub trait RowSource {
    fn next_row(&mut self) -> Result<Option<Row>, RowSourceError>;

    fn close(&mut self);
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn next_row(&mut self) -> Result<Option<Row>, RowSourceError> {
        (**self).next_row()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// In-memory rows
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    rows: std::vec::IntoIter<Row>,
    closed: bool,
}

impl VecRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        VecRowSource {
            rows: rows.into_iter(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<Row>, RowSourceError> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.next())
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows = Vec::new().into_iter();
    }
}

/// Adapter over any fallible row iterator
pub struct IterRowSource<I> {
    rows: Option<I>,
}

impl<I, E> IterRowSource<I>
where
    I: Iterator<Item = Result<Row, E>>,
    E: fmt::Display,
{
    pub fn new(rows: I) -> Self {
        IterRowSource { rows: Some(rows) }
    }
}

impl<I, E> RowSource for IterRowSource<I>
where
    I: Iterator<Item = Result<Row, E>>,
    E: fmt::Display,
{
    fn next_row(&mut self) -> Result<Option<Row>, RowSourceError> {
        match self.rows.as_mut().and_then(Iterator::next) {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(RowSourceError::Backend(e.to_string())),
            None => Ok(None),
        }
    }

    /// Drops the wrapped iterator.
    fn close(&mut self) {
        self.rows = None;
    }
}

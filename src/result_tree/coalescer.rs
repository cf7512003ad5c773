//! Streaming fold of flat rows into one tree per entity.
//!
//! CRITICAL: rows sharing a root binding must be contiguous in the input.
//! Both query strategies order by the root variable last to guarantee this;
//! a row source that interleaves entities yields one tree per run.

use std::sync::Arc;

use super::errors::CoalesceError;
use super::row_source::{Row, RowSource};
use super::tree::ResultTree;
use crate::term::Term;
use crate::utils::variable_naming::is_internal_variable;
use crate::view_catalog::{ViewPath, ViewTree, DEFAULT_ROOT_VARIABLE};

/// Lazy, forward-only sequence of result trees over a row source
pub struct ResultStream<S: RowSource> {
    source: S,
    view: Arc<ViewTree>,
    root_variable: String,
    /// View variables with their decoded paths, in clause order
    variables: Vec<(String, ViewPath)>,
    /// Lookahead row that ended the previous group
    pending: Option<Row>,
    closed: bool,
}

impl<S: RowSource> ResultStream<S> {
    pub fn new(source: S, view: Arc<ViewTree>) -> Self {
        Self::with_root_variable(source, view, DEFAULT_ROOT_VARIABLE)
    }

    pub fn with_root_variable(source: S, view: Arc<ViewTree>, root_variable: impl Into<String>) -> Self {
        let root_variable = root_variable.into();
        let variables = view
            .variables(&root_variable)
            .into_iter()
            .filter(|v| *v != root_variable)
            .map(|v| {
                let path = ViewPath::from_variable_name(&v, &root_variable);
                (v, path)
            })
            .collect();
        ResultStream {
            source,
            view,
            root_variable,
            variables,
            pending: None,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the row source. Idempotent; a partially read group is dropped.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending = None;
            self.source.close();
            log::debug!("Result stream closed");
        }
    }

    fn pull(&mut self) -> Result<Option<Row>, CoalesceError> {
        match self.source.next_row() {
            Ok(row) => Ok(row),
            Err(source) => {
                log::warn!("Row source failed, aborting result stream: {}", source);
                self.close();
                Err(CoalesceError::StreamAborted { source })
            }
        }
    }

    fn fold_row(&self, tree: &mut ResultTree, row: &Row) {
        for (variable, path) in &self.variables {
            if let Some(value) = row.get(variable) {
                self.insert(tree, &self.view, &ViewPath::root(), path.segments(), value, row);
            }
        }
    }

    fn insert(
        &self,
        node: &mut ResultTree,
        view: &ViewTree,
        prefix: &ViewPath,
        remaining: &[String],
        value: &Term,
        row: &Row,
    ) {
        let Some((name, rest)) = remaining.split_first() else {
            return;
        };
        let Some(entry) = view.get(name) else {
            return;
        };
        if entry.hide {
            return;
        }
        let path = prefix.child(name.clone());

        match (&entry.nested, rest.is_empty()) {
            (None, true) => {
                node.add_term(name, value.clone());
            }
            (Some(_), true) => {
                node.child_mut(name, Some(value.clone()), entry.suppress_id);
            }
            (Some(nested), false) => {
                let key = row.get(&path.as_variable_name(&self.root_variable)).cloned();
                let child = node.child_mut(name, key, entry.suppress_id);
                self.insert(child, nested, &path, rest, value, row);
            }
            (None, false) => {}
        }
    }

    /// Row without a root binding: every binding becomes a top-level key.
    fn degenerate(row: Row) -> ResultTree {
        let mut tree = ResultTree::new();
        for (variable, value) in row.iter() {
            if !is_internal_variable(variable) {
                tree.add_term(variable, value.clone());
            }
        }
        tree
    }
}

impl<S: RowSource> Iterator for ResultStream<S> {
    type Item = Result<ResultTree, CoalesceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }

        let first = match self.pending.take() {
            Some(row) => row,
            None => match self.pull() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.close();
                    return None;
                }
                Err(e) => return Some(Err(e)),
            },
        };

        let Some(id) = first.get(&self.root_variable).cloned() else {
            return Some(Ok(Self::degenerate(first)));
        };

        let mut tree = ResultTree::with_id(id.clone());
        self.fold_row(&mut tree, &first);
        let mut rows = 1usize;
        loop {
            match self.pull() {
                Ok(Some(row)) if row.get(&self.root_variable) == Some(&id) => {
                    self.fold_row(&mut tree, &row);
                    rows += 1;
                }
                Ok(Some(row)) => {
                    self.pending = Some(row);
                    break;
                }
                Ok(None) => {
                    self.close();
                    break;
                }
                Err(e) => return Some(Err(e)),
            }
        }
        log::trace!("Coalesced {} rows for {}", rows, id);
        Some(Ok(tree))
    }
}

impl<S: RowSource> Drop for ResultStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}

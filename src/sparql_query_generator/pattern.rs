//! View → graph pattern compilation
//!
//! For a tree rooted at subject variable `?s`:
//!
//! 1. all mandatory leaf entries become one predicate-object block
//!    (`?s <p1> ?a ; <p2> ?b .`)
//! 2. each mandatory nested entry emits its own triple, then the nested tree
//!    is compiled with the child variable as subject
//! 3. each optional entry (with its nested tree, if any) is wrapped in
//!    `OPTIONAL { }`
//!
//! Object variables are the variable-form encoding of the entry's path.

use super::to_sparql::ToSparql;
use crate::view_catalog::{ViewPath, ViewSpecError, ViewTree};

/// One element of a group graph pattern
#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    /// `?subject <p1> ?o1 ; <p2> ?o2 .`
    Block {
        subject: String,
        pairs: Vec<(String, String)>,
    },
    Optional(Vec<PatternElement>),
    /// Verbatim pattern text (base queries, constraints)
    Raw(String),
}

impl PatternElement {
    pub fn triple(subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        PatternElement::Block {
            subject: subject.into(),
            pairs: vec![(predicate.into(), object.into())],
        }
    }
}

/// Group graph pattern: a sequence of elements rendered inside `{ }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphPattern {
    pub elements: Vec<PatternElement>,
}

impl GraphPattern {
    pub fn new(elements: Vec<PatternElement>) -> Self {
        GraphPattern { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Compiled view: its pattern and every variable the pattern introduces
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPattern {
    pub pattern: GraphPattern,
    /// Root variable first, then object variables in clause order
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    /// Every entry; optional entries inside `OPTIONAL`
    Full,
    /// Mandatory entries only: the skeleton an entity must match to appear
    MandatoryOnly,
}

pub fn compile_view(tree: &ViewTree, root_variable: &str, mode: PatternMode) -> CompiledPattern {
    let mut elements = Vec::new();
    let mut variables = vec![root_variable.to_string()];
    compile_tree(
        tree,
        root_variable,
        &ViewPath::root(),
        root_variable,
        mode,
        &mut elements,
        &mut variables,
    );
    CompiledPattern {
        pattern: GraphPattern::new(elements),
        variables,
    }
}

fn compile_tree(
    tree: &ViewTree,
    subject: &str,
    prefix: &ViewPath,
    root_variable: &str,
    mode: PatternMode,
    elements: &mut Vec<PatternElement>,
    variables: &mut Vec<String>,
) {
    // 1. mandatory leaves share one block
    let mut pairs = Vec::new();
    for entry in tree.entries().filter(|e| !e.optional && !e.is_nested()) {
        let var = prefix.child(entry.name.clone()).as_variable_name(root_variable);
        variables.push(var.clone());
        pairs.push((entry.property.clone(), var));
    }
    if !pairs.is_empty() {
        elements.push(PatternElement::Block {
            subject: subject.to_string(),
            pairs,
        });
    }

    // 2. mandatory nested entries
    for entry in tree.entries().filter(|e| !e.optional) {
        let Some(nested) = &entry.nested else {
            continue;
        };
        let path = prefix.child(entry.name.clone());
        let var = path.as_variable_name(root_variable);
        variables.push(var.clone());
        elements.push(PatternElement::triple(subject, entry.property.clone(), var.clone()));
        compile_tree(nested, &var, &path, root_variable, mode, elements, variables);
    }

    if mode == PatternMode::MandatoryOnly {
        return;
    }

    // 3. optional entries, nested or not
    for entry in tree.entries().filter(|e| e.optional) {
        let path = prefix.child(entry.name.clone());
        let var = path.as_variable_name(root_variable);
        variables.push(var.clone());
        let mut inner = vec![PatternElement::triple(subject, entry.property.clone(), var.clone())];
        if let Some(nested) = &entry.nested {
            compile_tree(nested, &var, &path, root_variable, mode, &mut inner, variables);
        }
        elements.push(PatternElement::Optional(inner));
    }
}

/// Chain of triples from the root to the entry at `path`.
pub fn path_pattern(
    tree: &ViewTree,
    path: &ViewPath,
    root_variable: &str,
) -> Result<Vec<PatternElement>, ViewSpecError> {
    if tree.find_entry(path).is_none() {
        return Err(ViewSpecError::path_not_found(path.to_dotted()));
    }

    let mut elements = Vec::new();
    let mut subject = root_variable.to_string();
    let mut current = ViewPath::root();
    for segment in path.segments() {
        current = current.child(segment.clone());
        let entry = tree
            .find_entry(&current)
            .ok_or_else(|| ViewSpecError::path_not_found(path.to_dotted()))?;
        let object = current.as_variable_name(root_variable);
        elements.push(PatternElement::triple(subject, entry.property.clone(), object.clone()));
        subject = object;
    }
    Ok(elements)
}

/// True when no entry along `path` (including the entry itself) is multivalued,
/// so ordering by its variable keeps an entity's rows together.
pub fn is_single_valued_path(tree: &ViewTree, path: &ViewPath) -> bool {
    path.ancestors()
        .chain(std::iter::once(path.clone()))
        .all(|p| tree.find_entry(&p).is_some_and(|e| !e.multivalued))
}

impl CompiledPattern {
    pub fn to_sparql_body(&self, indent: usize) -> String {
        self.pattern.to_sparql_indented(indent)
    }
}

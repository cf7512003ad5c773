//! Recursive view trees.
//!
//! A [`ViewTree`] is an ordered list of [`PropertyEntry`] values; an entry may own
//! a nested tree describing the structure of the resource it points at. The
//! insertion order of entries drives both query-clause order and the key order
//! of coalesced results.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::errors::ViewSpecError;
use super::view_path::ViewPath;
use crate::term::{parse_term, PrefixMap, Term, TermParseError, XSD};
use crate::utils::variable_naming::is_legal_short_name;

/// How an unqualified short name (no dots) is resolved to a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathLookup {
    /// First match in breadth-first order, shallowest level first. Names that
    /// occur at several depths silently resolve to the shallowest one.
    #[default]
    BreadthFirst,
    /// Like `BreadthFirst`, but a name occurring at more than one position is
    /// rejected with `AmbiguousName`.
    Unambiguous,
    /// Unqualified names only resolve at the top level; nested entries must be
    /// addressed with a dotted path.
    Qualified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    /// Short name used as JSON key and as variable fragment
    pub name: String,
    /// Property IRI
    pub property: String,
    pub optional: bool,
    pub multivalued: bool,
    pub filterable: bool,
    /// Queried (and filterable) but never emitted in results
    pub hide: bool,
    /// Declared range: an XSD datatype or a class IRI
    pub range: Option<String>,
    pub nested: Option<ViewTree>,
    pub comment: Option<String>,
    /// Namespace used to turn bare request values into IRIs
    pub value_base: Option<String>,
    /// Nested identifiers group rows but are not exposed in results
    pub suppress_id: bool,
}

impl PropertyEntry {
    pub fn new(name: impl Into<String>, property: impl Into<String>) -> Result<Self, ViewSpecError> {
        let name = name.into();
        if !is_legal_short_name(&name) {
            return Err(ViewSpecError::malformed(format!(
                "short name `{}` must match [A-Za-z][A-Za-z0-9_]*",
                name
            )));
        }
        Ok(PropertyEntry {
            name,
            property: property.into(),
            optional: false,
            multivalued: false,
            filterable: true,
            hide: false,
            range: None,
            nested: None,
            comment: None,
            value_base: None,
            suppress_id: false,
        })
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn multivalued(mut self) -> Self {
        self.multivalued = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_nested(mut self, nested: ViewTree) -> Self {
        self.nested = Some(nested);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_value_base(mut self, base: impl Into<String>) -> Self {
        self.value_base = Some(base.into());
        self
    }

    pub fn suppressing_id(mut self) -> Self {
        self.suppress_id = true;
        self
    }

    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    /// Interpret a raw request value according to this entry's declared range.
    ///
    /// - XSD range: a literal of that datatype (the raw text is the lexical form)
    /// - `value_base` or a non-XSD range: an IRI, relative values resolved
    ///   against `value_base`
    /// - otherwise: the compact term syntax, falling back to a plain literal
    pub fn value_from_param(&self, raw: &str, prefixes: &PrefixMap) -> Result<Term, TermParseError> {
        if let Some(range) = &self.range {
            if let Some(local) = range.strip_prefix(XSD) {
                if local == "string" {
                    return Ok(Term::literal(raw));
                }
                return Ok(Term::typed(raw, range.clone()));
            }
        }

        if self.value_base.is_some() || self.range.is_some() {
            if let Some(iri) = prefixes.expand_or_absolute(raw) {
                return Term::checked_iri(iri);
            }
            if let Some(base) = &self.value_base {
                return Term::checked_iri(format!("{}{}", base, raw));
            }
        }

        match parse_term(raw, prefixes) {
            Ok(term) => Ok(term),
            Err(TermParseError::Syntax { .. }) => Ok(Term::literal(raw)),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewTree {
    entries: Vec<PropertyEntry>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree, rejecting duplicate sibling names and illegal short names.
    pub fn from_entries(entries: impl IntoIterator<Item = PropertyEntry>) -> Result<Self, ViewSpecError> {
        let mut tree = ViewTree::new();
        for entry in entries {
            tree.push(entry)?;
        }
        Ok(tree)
    }

    pub fn push(&mut self, entry: PropertyEntry) -> Result<(), ViewSpecError> {
        if !is_legal_short_name(&entry.name) {
            return Err(ViewSpecError::malformed(format!(
                "short name `{}` must match [A-Za-z][A-Za-z0-9_]*",
                entry.name
            )));
        }
        if self.get(&entry.name).is_some() {
            return Err(ViewSpecError::malformed(format!(
                "duplicate short name `{}`",
                entry.name
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Builder-style [`ViewTree::push`].
    pub fn with(mut self, entry: PropertyEntry) -> Result<Self, ViewSpecError> {
        self.push(entry)?;
        Ok(self)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PropertyEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a name to a path using breadth-first first-match lookup.
    pub fn path_to(&self, name: &str) -> Result<ViewPath, ViewSpecError> {
        self.path_to_with(name, PathLookup::BreadthFirst)
    }

    /// Resolve a dotted path or a short name.
    ///
    /// Dotted input is parsed as an explicit path and every segment is
    /// validated. A plain name is resolved according to `lookup`.
    pub fn path_to_with(&self, name: &str, lookup: PathLookup) -> Result<ViewPath, ViewSpecError> {
        if name.contains('.') {
            let path = ViewPath::parse_dotted(name);
            return match self.find_entry(&path) {
                Some(_) => Ok(path),
                None => Err(ViewSpecError::path_not_found(name)),
            };
        }

        match lookup {
            PathLookup::Qualified => self
                .get(name)
                .map(|_| ViewPath::new([name]))
                .ok_or_else(|| ViewSpecError::path_not_found(name)),
            PathLookup::BreadthFirst => self
                .breadth_first(move |e| e.name == name)
                .next()
                .map(|(path, _)| path)
                .ok_or_else(|| ViewSpecError::path_not_found(name)),
            PathLookup::Unambiguous => {
                let matches: Vec<ViewPath> =
                    self.breadth_first(move |e| e.name == name).map(|(p, _)| p).collect();
                match matches.len() {
                    0 => Err(ViewSpecError::path_not_found(name)),
                    1 => Ok(matches.into_iter().next().unwrap_or_default()),
                    _ => Err(ViewSpecError::AmbiguousName {
                        name: name.to_string(),
                        candidates: matches.iter().map(|p| p.to_dotted()).collect(),
                    }),
                }
            }
        }
    }

    /// Walk `path` through nested trees. `None` when a segment is missing or
    /// the path continues past a leaf. The root path has no entry.
    pub fn find_entry(&self, path: &ViewPath) -> Option<&PropertyEntry> {
        let (last, parents) = path.segments().split_last()?;
        let mut tree = self;
        for segment in parents {
            tree = tree.get(segment)?.nested.as_ref()?;
        }
        tree.get(last)
    }

    /// The tree that holds the children of `path` (the root tree for the root path).
    pub fn subtree(&self, path: &ViewPath) -> Option<&ViewTree> {
        if path.is_root() {
            return Some(self);
        }
        self.find_entry(path)?.nested.as_ref()
    }

    /// Breadth-first search by property IRI; the first match wins.
    pub fn find_entry_by_uri<'a>(&'a self, uri: &'a str) -> Option<(ViewPath, &'a PropertyEntry)> {
        self.breadth_first(move |e| e.property == uri).next()
    }

    /// Like [`ViewTree::find_entry_by_uri`], as a path or `UnknownProperty`.
    pub fn path_to_uri(&self, uri: &str) -> Result<ViewPath, ViewSpecError> {
        self.find_entry_by_uri(uri)
            .map(|(path, _)| path)
            .ok_or_else(|| ViewSpecError::UnknownProperty {
                uri: uri.to_string(),
            })
    }

    /// Entries matching `pred` in breadth-first order with their paths.
    fn breadth_first<'a, F>(&'a self, pred: F) -> impl Iterator<Item = (ViewPath, &'a PropertyEntry)> + 'a
    where
        F: Fn(&PropertyEntry) -> bool + 'a,
    {
        let mut queue: VecDeque<(ViewPath, &'a ViewTree)> = VecDeque::new();
        queue.push_back((ViewPath::root(), self));
        let mut pending: VecDeque<(ViewPath, &'a PropertyEntry)> = VecDeque::new();

        std::iter::from_fn(move || loop {
            if let Some(found) = pending.pop_front() {
                return Some(found);
            }
            let (prefix, tree) = queue.pop_front()?;
            for entry in &tree.entries {
                let path = prefix.child(entry.name.clone());
                if let Some(nested) = &entry.nested {
                    queue.push_back((path.clone(), nested));
                }
                if pred(entry) {
                    pending.push_back((path, entry));
                }
            }
        })
    }

    /// Copy of this tree reduced to `paths` and their ancestors.
    ///
    /// A listed path keeps its entry whole, including any nested tree.
    pub fn project(&self, paths: &[ViewPath]) -> Result<ViewTree, ViewSpecError> {
        for path in paths {
            if self.find_entry(path).is_none() {
                return Err(ViewSpecError::path_not_found(path.to_dotted()));
            }
        }
        Ok(self.project_under(&ViewPath::root(), paths))
    }

    fn project_under(&self, prefix: &ViewPath, paths: &[ViewPath]) -> ViewTree {
        let mut entries = Vec::new();
        for entry in &self.entries {
            let path = prefix.child(entry.name.clone());
            if paths.contains(&path) {
                entries.push(entry.clone());
            } else if let Some(nested) = &entry.nested {
                if paths.iter().any(|p| p.starts_with(&path)) {
                    let mut reduced = entry.clone();
                    reduced.nested = Some(nested.project_under(&path, paths));
                    entries.push(reduced);
                }
            }
        }
        ViewTree { entries }
    }

    /// True when paging over this view needs the nested-select strategy:
    /// some entry at any depth is multivalued, or some nested entry is optional.
    pub fn requires_nested_select(&self) -> bool {
        self.entries.iter().any(|e| {
            e.multivalued
                || (e.optional && e.is_nested())
                || e.nested.as_ref().is_some_and(|n| n.requires_nested_select())
        })
    }

    /// Every path in the tree, depth first in insertion order.
    pub fn all_paths(&self) -> Vec<ViewPath> {
        let mut out = Vec::new();
        self.collect_paths(&ViewPath::root(), &mut out);
        out
    }

    /// Variables the compiled pattern of this view introduces, root first,
    /// then in clause order (mandatory leaves, mandatory nested, optional).
    pub fn variables(&self, root_variable: &str) -> Vec<String> {
        let mut out = vec![root_variable.to_string()];
        self.collect_variables(&ViewPath::root(), root_variable, &mut out);
        out
    }

    fn collect_variables(&self, prefix: &ViewPath, root_variable: &str, out: &mut Vec<String>) {
        let mandatory = self.entries.iter().filter(|e| !e.optional);
        for entry in mandatory.clone().filter(|e| !e.is_nested()) {
            out.push(prefix.child(entry.name.clone()).as_variable_name(root_variable));
        }
        let nested_then_optional = mandatory
            .filter(|e| e.is_nested())
            .chain(self.entries.iter().filter(|e| e.optional));
        for entry in nested_then_optional {
            let path = prefix.child(entry.name.clone());
            out.push(path.as_variable_name(root_variable));
            if let Some(nested) = &entry.nested {
                nested.collect_variables(&path, root_variable, out);
            }
        }
    }

    fn collect_paths(&self, prefix: &ViewPath, out: &mut Vec<ViewPath>) {
        for entry in &self.entries {
            let path = prefix.child(entry.name.clone());
            out.push(path.clone());
            if let Some(nested) = &entry.nested {
                nested.collect_paths(&path, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::XSD_INTEGER;

    fn leaf(name: &str) -> PropertyEntry {
        PropertyEntry::new(name, format!("http://ex.org/{}", name)).unwrap()
    }

    fn nested(name: &str, children: Vec<PropertyEntry>) -> PropertyEntry {
        leaf(name).with_nested(ViewTree::from_entries(children).unwrap())
    }

    /// `{foo:{bar:{label}}, label}`
    fn ambiguous_tree() -> ViewTree {
        ViewTree::from_entries(vec![
            nested("foo", vec![nested("bar", vec![leaf("label")])]),
            leaf("label"),
        ])
        .unwrap()
    }

    #[test]
    fn test_path_to_prefers_shallowest_match() {
        let tree = ambiguous_tree();
        assert_eq!(tree.path_to("label").unwrap(), ViewPath::new(["label"]));
    }

    #[test]
    fn test_path_to_nested_unique_name() {
        let tree = ambiguous_tree();
        assert_eq!(tree.path_to("bar").unwrap(), ViewPath::new(["foo", "bar"]));
    }

    #[test]
    fn test_path_to_dotted() {
        let tree = ambiguous_tree();
        assert_eq!(
            tree.path_to("foo.bar.label").unwrap(),
            ViewPath::new(["foo", "bar", "label"])
        );
        assert!(matches!(
            tree.path_to("foo.label"),
            Err(ViewSpecError::PathNotFound { .. })
        ));
        assert!(matches!(
            tree.path_to("label.more"),
            Err(ViewSpecError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_path_to_missing() {
        assert_eq!(
            ambiguous_tree().path_to("nothing"),
            Err(ViewSpecError::path_not_found("nothing"))
        );
    }

    #[test]
    fn test_unambiguous_lookup_rejects_duplicates() {
        let tree = ambiguous_tree();
        let err = tree.path_to_with("label", PathLookup::Unambiguous).unwrap_err();
        assert_eq!(
            err,
            ViewSpecError::AmbiguousName {
                name: "label".into(),
                candidates: vec!["label".into(), "foo.bar.label".into()],
            }
        );
        assert_eq!(
            tree.path_to_with("bar", PathLookup::Unambiguous).unwrap(),
            ViewPath::new(["foo", "bar"])
        );
    }

    #[test]
    fn test_qualified_lookup_needs_dots_below_top_level() {
        let tree = ambiguous_tree();
        assert!(tree.path_to_with("bar", PathLookup::Qualified).is_err());
        assert_eq!(
            tree.path_to_with("foo.bar", PathLookup::Qualified).unwrap(),
            ViewPath::new(["foo", "bar"])
        );
    }

    #[test]
    fn test_breadth_order_within_level() {
        let tree = ViewTree::from_entries(vec![
            nested("a", vec![leaf("x")]),
            nested("b", vec![leaf("x")]),
        ])
        .unwrap();
        assert_eq!(tree.path_to("x").unwrap(), ViewPath::new(["a", "x"]));
    }

    #[test]
    fn test_find_entry() {
        let tree = ambiguous_tree();
        let entry = tree.find_entry(&ViewPath::new(["foo", "bar", "label"])).unwrap();
        assert_eq!(entry.name, "label");
        assert!(tree.find_entry(&ViewPath::root()).is_none());
        assert!(tree.find_entry(&ViewPath::new(["label", "x"])).is_none());
    }

    #[test]
    fn test_find_entry_by_uri() {
        let tree = ambiguous_tree();
        let (path, entry) = tree.find_entry_by_uri("http://ex.org/bar").unwrap();
        assert_eq!(path, ViewPath::new(["foo", "bar"]));
        assert_eq!(entry.name, "bar");
        assert_eq!(
            tree.find_entry_by_uri("http://ex.org/label").unwrap().0,
            ViewPath::new(["label"])
        );
        assert!(matches!(
            tree.path_to_uri("http://ex.org/none"),
            Err(ViewSpecError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_path_to_uri_with_owned_uri() {
        let tree = ambiguous_tree();
        let uri = format!("http://ex.org/{}", "bar");
        let name = tree.find_entry_by_uri(&uri).map(|(_, e)| e.name.clone());
        assert_eq!(name.as_deref(), Some("bar"));
        assert_eq!(tree.path_to_uri(&uri).unwrap(), ViewPath::new(["foo", "bar"]));
    }

    #[test]
    fn test_duplicate_and_illegal_names() {
        assert!(ViewTree::from_entries(vec![leaf("a"), leaf("a")]).is_err());
        assert!(PropertyEntry::new("bad-name", "http://ex.org/p").is_err());
        assert!(PropertyEntry::new("_x", "http://ex.org/p").is_err());
    }

    #[test]
    fn test_project() {
        let tree = ViewTree::from_entries(vec![
            leaf("severity"),
            leaf("message"),
            nested("floodArea", vec![leaf("notation"), leaf("county")]),
        ])
        .unwrap();

        let projected = tree
            .project(&[ViewPath::new(["severity"]), ViewPath::new(["floodArea", "county"])])
            .unwrap();
        assert_eq!(
            projected.all_paths(),
            vec![
                ViewPath::new(["severity"]),
                ViewPath::new(["floodArea"]),
                ViewPath::new(["floodArea", "county"]),
            ]
        );

        assert!(tree.project(&[ViewPath::new(["nope"])]).is_err());
    }

    #[test]
    fn test_requires_nested_select() {
        let flat = ViewTree::from_entries(vec![leaf("a"), leaf("b").optional()]).unwrap();
        assert!(!flat.requires_nested_select());

        let multi = ViewTree::from_entries(vec![leaf("a"), leaf("b").multivalued()]).unwrap();
        assert!(multi.requires_nested_select());

        let optional_nested =
            ViewTree::from_entries(vec![nested("n", vec![leaf("x")]).optional()]).unwrap();
        assert!(optional_nested.requires_nested_select());

        let deep_multi =
            ViewTree::from_entries(vec![nested("n", vec![leaf("x").multivalued()])]).unwrap();
        assert!(deep_multi.requires_nested_select());
    }

    #[test]
    fn test_variables_in_clause_order() {
        let tree = ViewTree::from_entries(vec![
            leaf("message").optional(),
            nested("area", vec![leaf("label")]),
            leaf("severity"),
        ])
        .unwrap();
        assert_eq!(
            tree.variables("id"),
            vec!["id", "severity", "area", "area_label", "message"]
        );
    }

    #[test]
    fn test_value_from_param() {
        let prefixes = PrefixMap::with_standard_prefixes();

        let typed = leaf("severity").with_range(XSD_INTEGER);
        assert_eq!(typed.value_from_param("3", &prefixes).unwrap(), Term::integer(3));

        let based = leaf("county").with_value_base("http://ex.org/county/");
        assert_eq!(
            based.value_from_param("Kent", &prefixes).unwrap(),
            Term::iri("http://ex.org/county/Kent")
        );
        assert_eq!(
            based.value_from_param("http://other.org/x", &prefixes).unwrap(),
            Term::iri("http://other.org/x")
        );

        assert!(matches!(
            based.value_from_param("Kent> || true", &prefixes),
            Err(TermParseError::InvalidIri { .. })
        ));
        assert!(matches!(
            based.value_from_param("<http://e/x> || true) #", &prefixes),
            Err(TermParseError::InvalidIri { .. })
        ));

        let plain = leaf("label");
        assert_eq!(plain.value_from_param("Kent", &prefixes).unwrap(), Term::literal("Kent"));
        assert_eq!(
            plain.value_from_param("<http://e/x> || true", &prefixes).unwrap(),
            Term::literal("<http://e/x> || true")
        );
        assert_eq!(plain.value_from_param("42", &prefixes).unwrap(), Term::integer(42));
    }
}

//! Coalesced result values.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::HashSet;

use crate::term::Term;

/// One member of a key's value set
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Term(Term),
    Tree(ResultTree),
}

impl ResultValue {
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            ResultValue::Term(term) => Some(term),
            ResultValue::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ResultTree> {
        match self {
            ResultValue::Tree(tree) => Some(tree),
            ResultValue::Term(_) => None,
        }
    }
}

/// Identifier plus an ordered mapping short name → value set.
///
/// Keys keep first-insertion order. Values are deduplicated on insert: a term
/// appears at most once per key, and nested trees are merged by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTree {
    id: Option<Term>,
    suppress_id: bool,
    entries: Vec<(String, Vec<ResultValue>)>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: Term) -> Self {
        ResultTree {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Exposed identifier; `None` for non-entity rows and suppressed ids.
    pub fn id(&self) -> Option<&Term> {
        if self.suppress_id {
            None
        } else {
            self.id.as_ref()
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[ResultValue]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    /// Terminal values under `key`
    pub fn terms(&self, key: &str) -> Vec<&Term> {
        self.get(key)
            .unwrap_or_default()
            .iter()
            .filter_map(ResultValue::as_term)
            .collect()
    }

    pub fn term_set(&self, key: &str) -> HashSet<&Term> {
        self.terms(key).into_iter().collect()
    }

    /// First nested tree under `key`
    pub fn child(&self, key: &str) -> Option<&ResultTree> {
        self.children(key).into_iter().next()
    }

    pub fn children(&self, key: &str) -> Vec<&ResultTree> {
        self.get(key)
            .unwrap_or_default()
            .iter()
            .filter_map(ResultValue::as_tree)
            .collect()
    }

    fn values_mut(&mut self, key: &str) -> &mut Vec<ResultValue> {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Add a terminal value; returns false when it was already present.
    pub fn add_term(&mut self, key: &str, term: Term) -> bool {
        let values = self.values_mut(key);
        if values.iter().any(|v| v.as_term() == Some(&term)) {
            return false;
        }
        values.push(ResultValue::Term(term));
        true
    }

    /// Locate or create the nested tree under `key` whose identifier is `id`.
    ///
    /// Children without an identifier share one tree.
    pub fn child_mut(&mut self, key: &str, id: Option<Term>, suppress_id: bool) -> &mut ResultTree {
        let values = self.values_mut(key);
        let index = values
            .iter()
            .position(|v| matches!(v, ResultValue::Tree(t) if t.id == id));
        let index = match index {
            Some(index) => index,
            None => {
                values.push(ResultValue::Tree(ResultTree {
                    id,
                    suppress_id,
                    entries: Vec::new(),
                }));
                values.len() - 1
            }
        };
        match &mut values[index] {
            ResultValue::Tree(tree) => tree,
            ResultValue::Term(_) => unreachable!("position matched a tree"),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

struct ValueSet<'a>(&'a [ResultValue]);

impl Serialize for ValueSet<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let [single] = self.0 {
            return single.serialize(serializer);
        }
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for ResultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultValue::Term(term) => term.serialize(serializer),
            ResultValue::Tree(tree) => tree.serialize(serializer),
        }
    }
}

impl Serialize for ResultTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let id = self.id();
        let mut map = serializer.serialize_map(Some(self.entries.len() + usize::from(id.is_some())))?;
        if let Some(id) = id {
            map.serialize_entry("@id", id)?;
        }
        for (key, values) in &self.entries {
            map.serialize_entry(key, &ValueSet(values))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_term_dedups() {
        let mut tree = ResultTree::new();
        assert!(tree.add_term("note", Term::literal("a")));
        assert!(!tree.add_term("note", Term::literal("a")));
        assert!(tree.add_term("note", Term::literal("b")));
        assert_eq!(tree.terms("note").len(), 2);
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut tree = ResultTree::new();
        tree.add_term("b", Term::literal("1"));
        tree.add_term("a", Term::literal("2"));
        tree.add_term("b", Term::literal("3"));
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_child_mut_merges_by_id() {
        let mut tree = ResultTree::new();
        let a = Some(Term::iri("http://ex.org/a"));
        tree.child_mut("area", a.clone(), false).add_term("label", Term::literal("x"));
        tree.child_mut("area", a, false).add_term("label", Term::literal("y"));
        tree.child_mut("area", Some(Term::iri("http://ex.org/b")), false);
        let children = tree.children("area");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].terms("label").len(), 2);
    }

    #[test]
    fn test_serialize_unwraps_singletons() {
        let mut tree = ResultTree::with_id(Term::iri("http://ex.org/w1"));
        tree.add_term("severity", Term::integer(3));
        tree.add_term("note", Term::literal("a"));
        tree.add_term("note", Term::literal("b"));
        tree.child_mut("area", Some(Term::iri("http://ex.org/a1")), false)
            .add_term("county", Term::literal("Kent"));
        tree.child_mut("hidden", Some(Term::iri("http://ex.org/h")), true)
            .add_term("label", Term::literal("h"));

        assert_eq!(
            tree.to_json(),
            json!({
                "@id": "http://ex.org/w1",
                "severity": 3,
                "note": ["a", "b"],
                "area": {"@id": "http://ex.org/a1", "county": "Kent"},
                "hidden": {"label": "h"}
            })
        );
    }

    #[test]
    fn test_suppressed_id_not_exposed() {
        let mut tree = ResultTree::new();
        let child = tree.child_mut("area", Some(Term::iri("http://ex.org/a")), true);
        assert_eq!(child.id(), None);
    }
}

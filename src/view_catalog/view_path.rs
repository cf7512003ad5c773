//! Paths from the root of a view tree to one of its entries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::utils::variable_naming::{decode_variable, encode_segments};

/// Default name of the variable bound to the root entity of every row.
pub const DEFAULT_ROOT_VARIABLE: &str = "id";

/// Ordered sequence of short names from the view root to an entry.
///
/// The empty path denotes the root itself. Two string forms exist: dotted
/// (`a.b.c`) for filter and sort parameters, and the variable form (`a_b_c`)
/// produced by [`ViewPath::as_variable_name`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewPath {
    segments: Vec<String>,
}

impl ViewPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        ViewPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the dotted form. The empty string is the root path.
    pub fn parse_dotted(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self::new(dotted.split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// This path extended by one segment.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        ViewPath { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(ViewPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Every proper prefix, from the first segment down to the parent.
    pub fn ancestors(&self) -> impl Iterator<Item = ViewPath> + '_ {
        (1..self.segments.len()).map(move |n| ViewPath {
            segments: self.segments[..n].to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &ViewPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Variable-form encoding; the root path maps to `root_variable`.
    pub fn as_variable_name(&self, root_variable: &str) -> String {
        if self.segments.is_empty() {
            root_variable.to_string()
        } else {
            encode_segments(&self.segments)
        }
    }

    /// Inverse of [`ViewPath::as_variable_name`].
    pub fn from_variable_name(name: &str, root_variable: &str) -> Self {
        if name == root_variable {
            return Self::root();
        }
        ViewPath {
            segments: decode_variable(name),
        }
    }
}

impl fmt::Display for ViewPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

impl From<&str> for ViewPath {
    fn from(dotted: &str) -> Self {
        ViewPath::parse_dotted(dotted)
    }
}

impl Serialize for ViewPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dotted())
    }
}

impl<'de> Deserialize<'de> for ViewPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dotted = String::deserialize(deserializer)?;
        Ok(ViewPath::parse_dotted(&dotted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name_round_trip() {
        let path = ViewPath::new(["foo", "fu_bar"]);
        let var = path.as_variable_name(DEFAULT_ROOT_VARIABLE);
        assert_eq!(var, "foo_fu__bar");
        assert_eq!(ViewPath::from_variable_name(&var, DEFAULT_ROOT_VARIABLE), path);
    }

    #[test]
    fn test_root_path_is_root_variable() {
        assert_eq!(ViewPath::root().as_variable_name("item"), "item");
        assert!(ViewPath::from_variable_name("item", "item").is_root());
    }

    #[test]
    fn test_dotted_forms() {
        let path = ViewPath::parse_dotted("floodArea.county");
        assert_eq!(path.segments(), &["floodArea".to_string(), "county".to_string()]);
        assert_eq!(path.to_string(), "floodArea.county");
        assert!(ViewPath::parse_dotted("").is_root());
    }

    #[test]
    fn test_navigation() {
        let path = ViewPath::new(["a", "b", "c"]);
        assert_eq!(path.parent(), Some(ViewPath::new(["a", "b"])));
        assert_eq!(
            path.ancestors().collect::<Vec<_>>(),
            vec![ViewPath::new(["a"]), ViewPath::new(["a", "b"])]
        );
        assert!(path.starts_with(&ViewPath::new(["a"])));
        assert!(!path.starts_with(&ViewPath::new(["b"])));
        assert_eq!(ViewPath::new(["a"]).child("b"), ViewPath::new(["a", "b"]));
        assert_eq!(ViewPath::root().parent(), None);
    }
}

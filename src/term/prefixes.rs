//! Namespace prefix table used to expand `prefix:local` names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const STANDARD_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("dct", "http://purl.org/dc/terms/"),
];

/// Prefix → namespace mapping.
///
/// Ordered so that rendered `PREFIX` declarations are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix map pre-populated with rdf, rdfs, owl, xsd, skos and dct.
    pub fn with_standard_prefixes() -> Self {
        let mut map = Self::new();
        for (prefix, ns) in STANDARD_PREFIXES {
            map.insert(*prefix, *ns);
        }
        map
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Merge `other` into this map; entries of `other` win.
    pub fn extend(&mut self, other: &PrefixMap) {
        for (prefix, ns) in &other.prefixes {
            self.prefixes.insert(prefix.clone(), ns.clone());
        }
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Expand `prefix:local` to a full IRI. Returns `None` for unknown prefixes
    /// and for strings without a colon.
    pub fn expand(&self, name: &str) -> Option<String> {
        let (prefix, local) = name.split_once(':')?;
        self.namespace(prefix).map(|ns| format!("{}{}", ns, local))
    }

    /// Expand a prefixed name, passing through anything that already looks like
    /// an absolute IRI (`scheme://...`, `urn:...`) or is wrapped in `<...>`.
    pub fn expand_or_absolute(&self, name: &str) -> Option<String> {
        if let Some(inner) = name.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            return Some(inner.to_string());
        }
        if let Some(expanded) = self.expand(name) {
            return Some(expanded);
        }
        if name.contains("://") || name.starts_with("urn:") {
            return Some(name.to_string());
        }
        None
    }

    /// `PREFIX` declarations for every entry, one per line.
    pub fn to_sparql_declarations(&self) -> String {
        self.prefixes
            .iter()
            .map(|(prefix, ns)| format!("PREFIX {}: <{}>\n", prefix, ns))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }
}

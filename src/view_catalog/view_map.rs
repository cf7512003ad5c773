//! Named, versioned views and the store that resolves them.
//!
//! Views form a DAG: a [`ViewMap`] either owns a tree directly, refers to
//! another named view, or projects another view onto a subset of its paths.
//! References are edges by name into the [`ViewStore`] arena, resolved lazily.
//! Each store entry caches its resolved tree together with the versions of
//! every view it was built from; a version mismatch on lookup triggers a
//! rebuild under the entry's lock, so at most one thread rebuilds a stale
//! entry at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::errors::ViewSpecError;
use super::view_path::ViewPath;
use super::view_tree::ViewTree;
use crate::term::PrefixMap;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewSource {
    Tree(Arc<ViewTree>),
    Reference(String),
    Projection { source: String, paths: Vec<ViewPath> },
}

impl ViewSource {
    /// Name of the view this source depends on, if any.
    pub fn dependency(&self) -> Option<&str> {
        match self {
            ViewSource::Tree(_) => None,
            ViewSource::Reference(name) => Some(name),
            ViewSource::Projection { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewMap {
    name: String,
    version: u64,
    source: ViewSource,
}

impl ViewMap {
    /// Each construction takes a fresh value from a process-wide monotonic counter.
    pub fn new(name: impl Into<String>, source: ViewSource) -> Self {
        ViewMap {
            name: name.into(),
            version: next_version(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn source(&self) -> &ViewSource {
        &self.source
    }
}

#[derive(Debug, Clone)]
struct ResolvedView {
    tree: Arc<ViewTree>,
    /// (view name, version) for this view and everything it was built from
    dependencies: Vec<(String, u64)>,
}

#[derive(Debug)]
struct StoreEntry {
    map: ViewMap,
    cache: Mutex<Option<ResolvedView>>,
}

/// Configuration store of named views.
///
/// Passed explicitly to whatever compiles queries; there is no global registry.
#[derive(Debug, Default)]
pub struct ViewStore {
    views: RwLock<HashMap<String, Arc<StoreEntry>>>,
    prefixes: PrefixMap,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefixes(prefixes: PrefixMap) -> Self {
        ViewStore {
            views: RwLock::new(HashMap::new()),
            prefixes,
        }
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// Register (or replace) a named view. Returns the new version.
    ///
    /// References may point at views that are registered later, but a source
    /// that would close a reference cycle is rejected.
    pub fn register(&self, name: impl Into<String>, source: ViewSource) -> Result<u64, ViewSpecError> {
        let name = name.into();
        let mut views = self.views.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = source.dependency().map(str::to_string);
        while let Some(current) = next {
            if current == name {
                return Err(ViewSpecError::CyclicReference { name });
            }
            next = views
                .get(&current)
                .and_then(|e| e.map.source().dependency().map(str::to_string));
        }

        let map = ViewMap::new(name.clone(), source);
        let version = map.version();
        log::debug!("Registered view '{}' at version {}", name, version);
        views.insert(
            name,
            Arc::new(StoreEntry {
                map,
                cache: Mutex::new(None),
            }),
        );
        Ok(version)
    }

    pub fn register_tree(&self, name: impl Into<String>, tree: ViewTree) -> Result<u64, ViewSpecError> {
        self.register(name, ViewSource::Tree(Arc::new(tree)))
    }

    pub fn version_of(&self, name: &str) -> Option<u64> {
        self.entry(name).map(|e| e.map.version())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let views = self.views.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = views.keys().cloned().collect();
        names.sort();
        names
    }

    /// The registered [`ViewMap`] for `name`.
    pub fn view_map(&self, name: &str) -> Option<ViewMap> {
        self.entry(name).map(|e| e.map.clone())
    }

    fn entry(&self, name: &str) -> Option<Arc<StoreEntry>> {
        let views = self.views.read().unwrap_or_else(PoisonError::into_inner);
        views.get(name).cloned()
    }

    /// Resolved tree for a named view, rebuilt when any view it depends on
    /// has been re-registered since the cached copy was built.
    pub fn resolve(&self, name: &str) -> Result<Arc<ViewTree>, ViewSpecError> {
        let mut visiting = Vec::new();
        self.resolve_inner(name, &mut visiting).map(|r| r.tree)
    }

    fn is_fresh(&self, resolved: &ResolvedView) -> bool {
        resolved
            .dependencies
            .iter()
            .all(|(name, version)| self.version_of(name) == Some(*version))
    }

    fn resolve_inner(&self, name: &str, visiting: &mut Vec<String>) -> Result<ResolvedView, ViewSpecError> {
        if visiting.iter().any(|v| v == name) {
            return Err(ViewSpecError::CyclicReference {
                name: name.to_string(),
            });
        }
        let entry = self.entry(name).ok_or_else(|| ViewSpecError::ViewNotFound {
            name: name.to_string(),
        })?;

        let mut cache = entry.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resolved) = cache.as_ref() {
            if self.is_fresh(resolved) {
                return Ok(resolved.clone());
            }
            log::debug!("Cached tree for view '{}' is stale, rebuilding", name);
        }

        visiting.push(name.to_string());
        let own = (name.to_string(), entry.map.version());
        let resolved = match entry.map.source() {
            ViewSource::Tree(tree) => ResolvedView {
                tree: tree.clone(),
                dependencies: vec![own],
            },
            ViewSource::Reference(target) => {
                let inner = self.resolve_inner(target, visiting)?;
                let mut dependencies = vec![own];
                dependencies.extend(inner.dependencies);
                ResolvedView {
                    tree: inner.tree,
                    dependencies,
                }
            }
            ViewSource::Projection { source, paths } => {
                let inner = self.resolve_inner(source, visiting)?;
                let tree = inner.tree.project(paths).map_err(|e| {
                    ViewSpecError::malformed_with_context(
                        e.to_string(),
                        format!("projection `{}` of view `{}`", name, source),
                    )
                })?;
                let mut dependencies = vec![own];
                dependencies.extend(inner.dependencies);
                ResolvedView {
                    tree: Arc::new(tree),
                    dependencies,
                }
            }
        };
        visiting.pop();

        *cache = Some(resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_catalog::view_tree::PropertyEntry;

    fn tree(names: &[&str]) -> ViewTree {
        ViewTree::from_entries(
            names
                .iter()
                .map(|n| PropertyEntry::new(*n, format!("http://ex.org/{}", n)).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_versions_are_monotonic() {
        let a = ViewMap::new("a", ViewSource::Reference("x".into()));
        let b = ViewMap::new("b", ViewSource::Reference("x".into()));
        assert!(b.version() > a.version());
    }

    #[test]
    fn test_resolve_direct_and_reference() {
        let store = ViewStore::new();
        store.register_tree("base", tree(&["a", "b"])).unwrap();
        store.register("alias", ViewSource::Reference("base".into())).unwrap();

        let base = store.resolve("base").unwrap();
        let alias = store.resolve("alias").unwrap();
        assert!(Arc::ptr_eq(&base, &alias));
    }

    #[test]
    fn test_resolve_is_cached() {
        let store = ViewStore::new();
        store.register_tree("base", tree(&["a", "b"])).unwrap();
        store
            .register(
                "small",
                ViewSource::Projection {
                    source: "base".into(),
                    paths: vec![ViewPath::new(["a"])],
                },
            )
            .unwrap();

        let first = store.resolve("small").unwrap();
        let second = store.resolve("small").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_reregistering_source_invalidates_dependants() {
        let store = ViewStore::new();
        store.register_tree("base", tree(&["a"])).unwrap();
        store.register("alias", ViewSource::Reference("base".into())).unwrap();
        assert_eq!(store.resolve("alias").unwrap().len(), 1);

        store.register_tree("base", tree(&["a", "b", "c"])).unwrap();
        assert_eq!(store.resolve("alias").unwrap().len(), 3);
    }

    #[test]
    fn test_missing_reference() {
        let store = ViewStore::new();
        store.register("alias", ViewSource::Reference("later".into())).unwrap();
        assert_eq!(
            store.resolve("alias").unwrap_err(),
            ViewSpecError::ViewNotFound {
                name: "later".into()
            }
        );

        store.register_tree("later", tree(&["x"])).unwrap();
        assert_eq!(store.resolve("alias").unwrap().len(), 1);
    }

    #[test]
    fn test_cycles_rejected() {
        let store = ViewStore::new();
        store.register("a", ViewSource::Reference("b".into())).unwrap();
        let err = store
            .register("b", ViewSource::Reference("a".into()))
            .unwrap_err();
        assert!(matches!(err, ViewSpecError::CyclicReference { .. }));
        assert!(store
            .register("c", ViewSource::Reference("c".into()))
            .is_err());
    }

    #[test]
    fn test_bad_projection_path() {
        let store = ViewStore::new();
        store.register_tree("base", tree(&["a"])).unwrap();
        store
            .register(
                "p",
                ViewSource::Projection {
                    source: "base".into(),
                    paths: vec![ViewPath::new(["zzz"])],
                },
            )
            .unwrap();
        assert!(matches!(
            store.resolve("p"),
            Err(ViewSpecError::MalformedViewSpec { .. })
        ));
    }

    #[test]
    fn test_concurrent_resolution_shares_one_tree() {
        let store = Arc::new(ViewStore::new());
        store.register_tree("base", tree(&["a", "b"])).unwrap();
        store.register("alias", ViewSource::Reference("base".into())).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.resolve("alias").unwrap())
            })
            .collect();
        let trees: Vec<Arc<ViewTree>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(trees.iter().all(|t| Arc::ptr_eq(t, &trees[0])));
    }
}

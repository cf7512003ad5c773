use std::collections::BTreeMap;
use std::sync::Arc;

use super::request::{apply_params, VIEW_PARAM};
use crate::config::CompilerConfig;
use crate::result_tree::{ResultStream, RowSource};
use crate::sparql_query_generator::flat::{INJECT_MARKER, MODIFIERS_MARKER, SORT_MARKER};
use crate::sparql_query_generator::{
    LimitPolicy, NamedTransform, QueryBuildError, QueryStrategy, ViewQueryBuilder,
};
use crate::view_catalog::config::build_tree;
use crate::view_catalog::{
    EndpointDefinition, PathLookup, ViewRef, ViewSource, ViewSpecError, ViewStore, ViewTree,
};

/// A configured query endpoint: views, base pattern, limits and strategy.
///
/// Views are looked up in the shared [`ViewStore`] on every request, so a
/// re-registered view is picked up without rebuilding the endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    comment: Option<String>,
    store: Arc<ViewStore>,
    /// Store name of the default view
    default_view: String,
    /// Request-visible name → store name
    views: BTreeMap<String, String>,
    base_query: Option<String>,
    template: Option<String>,
    limits: LimitPolicy,
    strategy: Option<QueryStrategy>,
    path_lookup: PathLookup,
    root_variable: String,
}

impl Endpoint {
    /// Build an endpoint, registering its inline views in `store`.
    ///
    /// Every view is resolved once so configuration errors surface here
    /// rather than on the first request.
    pub fn from_definition(
        definition: &EndpointDefinition,
        store: Arc<ViewStore>,
        config: &CompilerConfig,
    ) -> Result<Self, ViewSpecError> {
        let context = format!("endpoint `{}`", definition.name);

        let mut views = BTreeMap::new();
        for (alias, view) in &definition.views {
            let store_name = register_view(&store, &definition.name, alias, view)?;
            views.insert(alias.clone(), store_name);
        }
        let default_view = match &definition.view {
            Some(view) => register_view(&store, &definition.name, "default", view)?,
            None => views
                .values()
                .next()
                .cloned()
                .ok_or_else(|| ViewSpecError::malformed_with_context("endpoint has no view", context.clone()))?,
        };

        if definition.query.is_some() && definition.strategy == Some(QueryStrategy::NestedSelect) {
            return Err(ViewSpecError::malformed_with_context(
                "a `query` template requires the flat strategy",
                context,
            ));
        }

        let limits = LimitPolicy::new(definition.soft_limit, definition.limit).or(config.limit_policy());
        if let Some(template) = &definition.query {
            check_template(template, definition.base_query.is_some(), limits, &context)?;
        }
        // a template is only used by the flat strategy
        let strategy = match &definition.query {
            Some(_) => Some(definition.strategy.unwrap_or(QueryStrategy::Flat)),
            None => definition.strategy.or(config.default_strategy),
        };

        let endpoint = Endpoint {
            name: definition.name.clone(),
            comment: definition.comment.clone(),
            store,
            default_view,
            views,
            base_query: definition.base_query.clone(),
            template: definition.query.clone(),
            limits,
            strategy,
            path_lookup: definition.path_lookup.unwrap_or(config.path_lookup),
            root_variable: config.root_variable.clone(),
        };

        for store_name in std::iter::once(&endpoint.default_view).chain(endpoint.views.values()) {
            let tree = endpoint.store.resolve(store_name)?;
            endpoint.check_root_variable(&tree)?;
        }
        log::debug!(
            "Endpoint '{}' ready: default view '{}', {} alternative view(s)",
            endpoint.name,
            endpoint.default_view,
            endpoint.views.len()
        );
        Ok(endpoint)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn limits(&self) -> LimitPolicy {
        self.limits
    }

    fn check_root_variable(&self, tree: &ViewTree) -> Result<(), ViewSpecError> {
        if tree.get(&self.root_variable).is_some() {
            return Err(ViewSpecError::malformed_with_context(
                format!("top-level short name `{}` collides with the root variable", self.root_variable),
                format!("endpoint `{}`", self.name),
            ));
        }
        Ok(())
    }

    /// Resolved tree for `view` (`None` = default view)
    pub fn view(&self, view: Option<&str>) -> Result<Arc<ViewTree>, ViewSpecError> {
        let store_name = match view {
            None => &self.default_view,
            Some(alias) => self.views.get(alias).ok_or_else(|| ViewSpecError::ViewNotFound {
                name: alias.to_string(),
            })?,
        };
        self.store.resolve(store_name)
    }

    /// Builder carrying this endpoint's settings for `view`, before any
    /// request parameters.
    pub fn prototype(&self, view: Option<&str>) -> Result<ViewQueryBuilder, ViewSpecError> {
        let tree = self.view(view)?;
        let strategy = self.strategy.unwrap_or_else(|| QueryStrategy::for_view(&tree));
        let mut builder = ViewQueryBuilder::new(tree, strategy)
            .with_root_variable(self.root_variable.clone())
            .with_limits(self.limits)
            .with_path_lookup(self.path_lookup)
            .with_named_transform(NamedTransform::prefix_declarations(self.store.prefixes().clone()));
        if let Some(base) = &self.base_query {
            builder = builder.with_base_query(base.clone());
        }
        if let Some(template) = &self.template {
            builder = builder.with_template(template.clone());
        }
        Ok(builder)
    }

    /// Translate request parameters into a builder.
    pub fn request(&self, params: &[(String, String)]) -> Result<ViewQueryBuilder, QueryBuildError> {
        let view = params
            .iter()
            .rev()
            .find(|(name, _)| name == VIEW_PARAM)
            .map(|(_, value)| value.as_str());
        let prototype = self.prototype(view)?;
        apply_params(&prototype, params, self.store.prefixes())
    }

    /// Request parameters → query text
    pub fn compile(&self, params: &[(String, String)]) -> Result<String, QueryBuildError> {
        self.request(params)?.build()
    }

    /// Coalesce rows produced by a query compiled for `view`.
    pub fn coalesce<S: RowSource>(&self, view: Option<&str>, source: S) -> Result<ResultStream<S>, ViewSpecError> {
        Ok(ResultStream::with_root_variable(
            source,
            self.view(view)?,
            self.root_variable.clone(),
        ))
    }
}

/// Markers every request fills: the root ordering, the base pattern when one
/// is configured, and the page size when the limits always yield one.
fn check_template(
    template: &str,
    has_base_query: bool,
    limits: LimitPolicy,
    context: &str,
) -> Result<(), ViewSpecError> {
    let required = [
        (SORT_MARKER, true),
        (INJECT_MARKER, has_base_query),
        (MODIFIERS_MARKER, limits.effective_limit(None).is_some()),
    ];
    for (marker, needed) in required {
        if needed && !template.contains(marker) {
            return Err(ViewSpecError::malformed_with_context(
                format!("`query` template lacks the `{}` marker", marker),
                context,
            ));
        }
    }
    Ok(())
}

/// Register an endpoint view in the store; named references are used as is.
fn register_view(store: &ViewStore, endpoint: &str, alias: &str, view: &ViewRef) -> Result<String, ViewSpecError> {
    match view {
        ViewRef::Named(name) => {
            if !store.contains(name) {
                return Err(ViewSpecError::ViewNotFound { name: name.clone() });
            }
            Ok(name.clone())
        }
        ViewRef::Inline(props) => {
            let store_name = format!("{}#{}", endpoint, alias);
            let context = format!("endpoint `{}` view `{}`", endpoint, alias);
            let tree = build_tree(props, store.prefixes(), &context)?;
            store.register(store_name.clone(), ViewSource::Tree(Arc::new(tree)))?;
            Ok(store_name)
        }
    }
}

//! Copy-on-write query builder over one view.
//!
//! A [`ViewQueryBuilder`] pairs a resolved view with a [`QueryShape`] and the
//! endpoint's rendering settings. Endpoints keep a configured prototype and
//! derive a fresh builder per request; every method returns a new value.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::QueryBuildError;
use super::flat;
use super::limits::LimitPolicy;
use super::nested_select;
use super::query_shape::{FilterClause, NamedTransform, QueryShape, RangeOp, SortKey};
use crate::term::Term;
use crate::view_catalog::{PathLookup, ViewPath, ViewSpecError, ViewTree, DEFAULT_ROOT_VARIABLE};

const NEARBY: &str = "http://jena.apache.org/spatial#nearby";

/// How filters, sorting and paging are placed in the generated query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryStrategy {
    /// Everything spliced into one query body
    Flat,
    /// Paging applied to an inner query over entity ids
    #[serde(alias = "nested")]
    NestedSelect,
}

impl QueryStrategy {
    /// Flat unless paging the view needs an inner select
    pub fn for_view(view: &ViewTree) -> Self {
        if view.requires_nested_select() {
            QueryStrategy::NestedSelect
        } else {
            QueryStrategy::Flat
        }
    }
}

/// One value or a value set for an equality filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    One(Term),
    Many(Vec<Term>),
}

impl From<Term> for FilterValue {
    fn from(term: Term) -> Self {
        FilterValue::One(term)
    }
}

impl From<Vec<Term>> for FilterValue {
    fn from(terms: Vec<Term>) -> Self {
        FilterValue::Many(terms)
    }
}

#[derive(Debug, Clone)]
pub struct ViewQueryBuilder {
    view: Arc<ViewTree>,
    shape: QueryShape,
    strategy: QueryStrategy,
    limits: LimitPolicy,
    root_variable: String,
    path_lookup: PathLookup,
    template: Option<Arc<str>>,
}

impl ViewQueryBuilder {
    pub fn new(view: Arc<ViewTree>, strategy: QueryStrategy) -> Self {
        ViewQueryBuilder {
            view,
            shape: QueryShape::new(),
            strategy,
            limits: LimitPolicy::default(),
            root_variable: DEFAULT_ROOT_VARIABLE.to_string(),
            path_lookup: PathLookup::default(),
            template: None,
        }
    }

    fn with_shape(&self, shape: QueryShape) -> Self {
        ViewQueryBuilder {
            shape,
            ..self.clone()
        }
    }

    // ---- endpoint configuration ----

    pub fn with_root_variable(&self, root_variable: impl Into<String>) -> Self {
        ViewQueryBuilder {
            root_variable: root_variable.into(),
            ..self.clone()
        }
    }

    pub fn with_limits(&self, limits: LimitPolicy) -> Self {
        ViewQueryBuilder {
            limits,
            ..self.clone()
        }
    }

    pub fn with_path_lookup(&self, path_lookup: PathLookup) -> Self {
        ViewQueryBuilder {
            path_lookup,
            ..self.clone()
        }
    }

    /// Flat query template carrying the splice markers
    pub fn with_template(&self, template: impl Into<String>) -> Self {
        ViewQueryBuilder {
            template: Some(Arc::from(template.into())),
            ..self.clone()
        }
    }

    pub fn with_base_query(&self, base: impl Into<String>) -> Self {
        self.with_shape(self.shape.with_base(base))
    }

    // ---- accessors ----

    pub fn view(&self) -> &Arc<ViewTree> {
        &self.view
    }

    pub fn shape(&self) -> &QueryShape {
        &self.shape
    }

    pub fn strategy(&self) -> QueryStrategy {
        self.strategy
    }

    pub fn limits(&self) -> LimitPolicy {
        self.limits
    }

    pub fn root_variable(&self) -> &str {
        &self.root_variable
    }

    pub fn path_lookup(&self) -> PathLookup {
        self.path_lookup
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn effective_limit(&self) -> Option<u64> {
        self.limits.effective_limit(self.shape.limit)
    }

    /// Resolve a short name or dotted path against the view.
    pub fn resolve_path(&self, name: &str) -> Result<ViewPath, ViewSpecError> {
        self.view.path_to_with(name, self.path_lookup)
    }

    fn filterable_path(&self, name: &str) -> Result<ViewPath, ViewSpecError> {
        let path = self.resolve_path(name)?;
        match self.view.find_entry(&path) {
            Some(entry) if entry.filterable => Ok(path),
            Some(_) => Err(ViewSpecError::NotFilterable {
                path: path.to_dotted(),
            }),
            None => Err(ViewSpecError::path_not_found(name)),
        }
    }

    // ---- request operations ----

    pub fn filter(&self, path: &str, value: impl Into<FilterValue>) -> Result<Self, ViewSpecError> {
        let path = self.filterable_path(path)?;
        let values = match value.into() {
            FilterValue::One(term) => vec![term],
            FilterValue::Many(terms) => terms,
        };
        Ok(self.with_shape(self.shape.with_filter(FilterClause::Equals { path, values })))
    }

    pub fn filter_range(&self, path: &str, op: RangeOp, value: Term) -> Result<Self, ViewSpecError> {
        let path = self.filterable_path(path)?;
        Ok(self.with_shape(self.shape.with_filter(FilterClause::Range { path, op, value })))
    }

    pub fn filter_exists(&self, path: &str, must_exist: bool) -> Result<Self, ViewSpecError> {
        let path = self.filterable_path(path)?;
        Ok(self.with_shape(self.shape.with_filter(FilterClause::Exists { path, must_exist })))
    }

    pub fn sort(&self, path: &str, descending: bool) -> Result<Self, ViewSpecError> {
        let path = self.resolve_path(path)?;
        Ok(self.with_shape(self.shape.with_sort(SortKey { path, descending })))
    }

    /// Requested page; `None` keeps the endpoint's soft limit and offset 0.
    pub fn limit(&self, count: Option<u64>, offset: Option<u64>) -> Self {
        self.with_shape(self.shape.with_limit(count, offset))
    }

    pub fn bind(&self, variable: impl Into<String>, value: Term) -> Self {
        self.with_shape(self.shape.with_binding(variable, value))
    }

    /// Pattern fragment joined ahead of the base pattern
    pub fn with_constraint(&self, fragment: impl Into<String>) -> Self {
        self.with_shape(self.shape.with_early(fragment))
    }

    /// Pattern fragment joined after the view pattern
    pub fn with_late_constraint(&self, fragment: impl Into<String>) -> Self {
        self.with_shape(self.shape.with_late(fragment))
    }

    /// Spatial-index constraint: root entities within `radius_km` of a point.
    pub fn near(&self, lat: f64, lon: f64, radius_km: f64) -> Self {
        self.with_constraint(format!(
            "?{} <{}> ({} {} {} 'km') .",
            self.root_variable, NEARBY, lat, lon, radius_km
        ))
    }

    pub fn with_projection(&self, variable: impl Into<String>) -> Self {
        self.with_shape(self.shape.with_projection(variable))
    }

    pub fn distinct(&self, distinct: bool) -> Self {
        self.with_shape(self.shape.with_distinct(distinct))
    }

    pub fn with_transform(
        &self,
        name: impl Into<String>,
        apply: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.with_shape(self.shape.with_transform(NamedTransform::new(name, apply)))
    }

    pub fn with_named_transform(&self, transform: NamedTransform) -> Self {
        self.with_shape(self.shape.with_transform(transform))
    }

    /// Render the query text for the current shape.
    pub fn build(&self) -> Result<String, QueryBuildError> {
        if self.view.get(&self.root_variable).is_some() {
            return Err(ViewSpecError::malformed(format!(
                "top-level short name `{}` collides with the root variable",
                self.root_variable
            ))
            .into());
        }

        let shape = self
            .shape
            .with_limit(self.effective_limit(), self.shape.offset);

        let query = match self.strategy {
            QueryStrategy::Flat => flat::render(&self.view, &shape, &self.root_variable, self.template())?,
            QueryStrategy::NestedSelect => nested_select::render(&self.view, &shape, &self.root_variable)?,
        };
        let query = shape.transform(query);
        log::debug!("Compiled {:?} query:\n{}", self.strategy, query);
        Ok(query)
    }
}

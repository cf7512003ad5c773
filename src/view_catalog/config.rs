use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::errors::ViewSpecError;
use super::view_map::{ViewSource, ViewStore};
use super::view_path::ViewPath;
use super::view_tree::{PathLookup, PropertyEntry, ViewTree};
use crate::sparql_query_generator::QueryStrategy;
use crate::term::PrefixMap;

/// View and endpoint configuration management.
///
/// Views and endpoints are defined in YAML (or JSON) with the following structure:
///
/// ```yaml
/// name: flood-monitoring        # Configuration name
/// prefixes:                     # Namespace prefixes used by prop/type values
///   rt: http://environment.data.gov.uk/flood-monitoring/def/core/
/// views:                        # Named views
///   warning:                    # Inline list of properties
///     - prop: rt:severityLevel
///       name: severity
///       type: xsd:integer
///     - { prop: rt:message, optional: true }
///     - prop: rt:floodArea
///       optional: true
///       nested:
///         - rt:notation         # Bare string: prop only, name from local name
///         - { prop: rt:county, optional: true }
///   compact:
///     projection: warning       # Reduced copy of another view
///     paths: [severity, floodArea.county]
///   current:
///     ref: warning              # Alias of another view
/// endpoints:
///   - name: warnings
///     view: warning             # Named view or inline property list
///     baseQuery: "?id a rt:FloodWarning ."
///     softLimit: 100
///     limit: 1000
///     strategy: nested          # flat | nested (chosen from the view when absent)
/// ```
///
/// # Usage
///
/// ```ignore
/// let doc = ViewConfigDocument::from_yaml_file("views.yaml")?;
/// let store = doc.build_store()?;
/// let tree = store.resolve("warning")?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfigDocument {
    /// Optional configuration name
    #[serde(default)]
    pub name: Option<String>,
    /// Prefixes in addition to rdf, rdfs, owl, xsd, skos and dct
    #[serde(default)]
    pub prefixes: PrefixMap,
    #[serde(default)]
    pub views: BTreeMap<String, ViewDefinition>,
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
}

/// A named view: an inline property list, a reference or a projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewDefinition {
    Inline(Vec<PropertyDefinition>),
    Reference {
        #[serde(rename = "ref")]
        reference: String,
    },
    Projection {
        projection: String,
        paths: Vec<ViewPath>,
    },
}

/// Endpoint `view` value: a view name or an inline property list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewRef {
    Named(String),
    Inline(Vec<PropertyDefinition>),
}

/// Property entry in a view definition; a bare string is shorthand for `{ prop: ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyDefinition {
    Short(String),
    Full(Box<PropertySpec>),
}

impl PropertyDefinition {
    /// Decode one raw entry. Mappings go straight to [`PropertySpec`] so a
    /// missing or mistyped field is named in the error.
    fn from_value(value: &serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        match value {
            serde_yaml::Value::Mapping(_) => serde_yaml::from_value::<PropertySpec>(value.clone())
                .map(|spec| PropertyDefinition::Full(Box::new(spec))),
            _ => serde_yaml::from_value(value.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    /// Property IRI, full or prefixed
    pub prop: String,
    /// Short name; defaults to the local name of `prop`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub multi: bool,
    #[serde(default = "default_filterable")]
    pub filterable: bool,
    /// Declared value type (datatype or class), full or prefixed
    #[serde(default, alias = "type")]
    pub range: Option<String>,
    /// Must be an array of property definitions when present
    #[serde(default)]
    pub nested: Option<NestedDefinition>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub value_base: Option<String>,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, rename = "suppressID")]
    pub suppress_id: bool,
}

fn default_filterable() -> bool {
    true
}

/// `nested` block. Children stay raw until the tree is built so that a bad
/// child is reported with its position, and only a non-array value is
/// reported as a malformed `nested`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedDefinition {
    List(Vec<serde_yaml::Value>),
    Invalid(serde_yaml::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDefinition {
    pub name: String,
    /// Default view
    #[serde(default)]
    pub view: Option<ViewRef>,
    /// Alternative views selectable per request (`_view=name`)
    #[serde(default)]
    pub views: BTreeMap<String, ViewRef>,
    /// Graph pattern selecting the root entities, bound to `?id`
    #[serde(default)]
    pub base_query: Option<String>,
    /// Full query template with `#$INJECT$`, `#$FILTER$`, `#$SORT$` and
    /// `#$MODIFIERS$` markers (flat strategy only, which it selects by
    /// default). `#$SORT$` is always required since results are ordered by
    /// the root variable; `#$INJECT$` is required with a `baseQuery` and
    /// `#$MODIFIERS$` whenever a limit applies. Checked at load.
    #[serde(default)]
    pub query: Option<String>,
    /// Hard limit: ceiling on the number of results per request
    #[serde(default)]
    pub limit: Option<u64>,
    /// Limit applied when the request gives none
    #[serde(default)]
    pub soft_limit: Option<u64>,
    #[serde(default)]
    pub strategy: Option<QueryStrategy>,
    #[serde(default)]
    pub path_lookup: Option<PathLookup>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ViewConfigDocument {
    /// Load configuration from a YAML (or JSON, which is valid YAML) file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ViewSpecError> {
        let contents = fs::read_to_string(path).map_err(|e| ViewSpecError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ViewSpecError> {
        serde_yaml::from_str(yaml).map_err(|e| ViewSpecError::ConfigParseError {
            error: e.to_string(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ViewSpecError> {
        serde_json::from_str(json).map_err(|e| ViewSpecError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Standard prefixes overlaid with the document's own.
    pub fn prefix_map(&self) -> PrefixMap {
        let mut prefixes = PrefixMap::with_standard_prefixes();
        prefixes.extend(&self.prefixes);
        prefixes
    }

    /// Structural validation: endpoint names are unique and every endpoint has a view.
    pub fn validate(&self) -> Result<(), ViewSpecError> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(&endpoint.name) {
                return Err(ViewSpecError::malformed(format!(
                    "duplicate endpoint name `{}`",
                    endpoint.name
                )));
            }
            if endpoint.view.is_none() && endpoint.views.is_empty() {
                return Err(ViewSpecError::malformed_with_context(
                    "endpoint has no `view` or `views`",
                    format!("endpoint `{}`", endpoint.name),
                ));
            }
        }
        Ok(())
    }

    /// Register every named view in a fresh store.
    pub fn build_store(&self) -> Result<ViewStore, ViewSpecError> {
        self.validate()?;
        let prefixes = self.prefix_map();
        let store = ViewStore::with_prefixes(prefixes.clone());
        for (name, definition) in &self.views {
            let source = definition.to_source(&prefixes, name)?;
            store.register(name.clone(), source)?;
        }
        Ok(store)
    }
}

impl ViewDefinition {
    pub fn to_source(&self, prefixes: &PrefixMap, view_name: &str) -> Result<ViewSource, ViewSpecError> {
        match self {
            ViewDefinition::Inline(props) => Ok(ViewSource::Tree(std::sync::Arc::new(build_tree(
                props,
                prefixes,
                &format!("view `{}`", view_name),
            )?))),
            ViewDefinition::Reference { reference } => Ok(ViewSource::Reference(reference.clone())),
            ViewDefinition::Projection { projection, paths } => Ok(ViewSource::Projection {
                source: projection.clone(),
                paths: paths.clone(),
            }),
        }
    }
}

/// Convert a property list into a view tree, expanding prefixed names.
pub fn build_tree(
    props: &[PropertyDefinition],
    prefixes: &PrefixMap,
    context: &str,
) -> Result<ViewTree, ViewSpecError> {
    let mut tree = ViewTree::new();
    for (idx, prop) in props.iter().enumerate() {
        let entry_context = format!("{}, entry {}", context, idx + 1);
        let entry = prop.to_entry(prefixes, &entry_context)?;
        tree.push(entry)
            .map_err(|e| ViewSpecError::malformed_with_context(e.to_string(), entry_context))?;
    }
    Ok(tree)
}

impl PropertyDefinition {
    pub fn to_entry(&self, prefixes: &PrefixMap, context: &str) -> Result<PropertyEntry, ViewSpecError> {
        let spec = match self {
            PropertyDefinition::Short(prop) => {
                return PropertyEntry::new(local_name(prop), expand_iri(prop, prefixes, context)?)
                    .map_err(|e| ViewSpecError::malformed_with_context(e.to_string(), context));
            }
            PropertyDefinition::Full(spec) => spec,
        };

        let name = spec.name.clone().unwrap_or_else(|| local_name(&spec.prop).to_string());
        let mut entry = PropertyEntry::new(name, expand_iri(&spec.prop, prefixes, context)?)
            .map_err(|e| ViewSpecError::malformed_with_context(e.to_string(), context))?;
        entry.optional = spec.optional;
        entry.multivalued = spec.multi;
        entry.filterable = spec.filterable;
        entry.hide = spec.hide;
        entry.suppress_id = spec.suppress_id;
        entry.comment = spec.comment.clone();
        entry.range = spec
            .range
            .as_ref()
            .map(|r| prefixes.expand_or_absolute(r).unwrap_or_else(|| r.clone()));
        entry.value_base = spec
            .value_base
            .as_ref()
            .map(|b| prefixes.expand_or_absolute(b).unwrap_or_else(|| b.clone()));

        match &spec.nested {
            None => {}
            Some(NestedDefinition::List(children)) => {
                let nested_context = format!("{}, nested in `{}`", context, entry.name);
                let children = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        PropertyDefinition::from_value(child).map_err(|e| {
                            ViewSpecError::malformed_with_context(
                                format!("nested entry {}: {}", i + 1, e),
                                nested_context.clone(),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                entry.nested = Some(build_tree(&children, prefixes, &nested_context)?);
            }
            Some(NestedDefinition::Invalid(_)) => {
                return Err(ViewSpecError::malformed_with_context(
                    "`nested` must be an array of property definitions",
                    format!("{}, property `{}`", context, entry.name),
                ));
            }
        }
        Ok(entry)
    }
}

fn expand_iri(prop: &str, prefixes: &PrefixMap, context: &str) -> Result<String, ViewSpecError> {
    prefixes.expand_or_absolute(prop).ok_or_else(|| {
        ViewSpecError::malformed_with_context(
            format!("cannot expand `{}` to an IRI (unknown prefix?)", prop),
            context,
        )
    })
}

/// Local part of an IRI or prefixed name: text after the last `#`, `/` or `:`.
fn local_name(prop: &str) -> &str {
    let trimmed = prop.trim_start_matches('<').trim_end_matches('>');
    match trimmed.rfind(['#', '/', ':']) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::sparql_query_generator::{LimitPolicy, QueryStrategy};
use crate::utils::variable_naming::is_legal_short_name;
use crate::view_catalog::{PathLookup, DEFAULT_ROOT_VARIABLE};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Compiler-wide defaults applied to every endpoint that does not set its own
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "validate_limits"))]
pub struct CompilerConfig {
    /// Page size when a request names none
    #[validate(range(min = 1, message = "Soft limit must be at least 1"))]
    pub default_soft_limit: Option<u64>,

    /// Upper bound no request can exceed
    #[validate(range(min = 1, message = "Hard limit must be at least 1"))]
    pub hard_limit: Option<u64>,

    /// Variable carrying the entity identifier
    #[validate(
        length(min = 1, max = 64, message = "Root variable must be 1-64 characters"),
        custom(function = "validate_root_variable")
    )]
    pub root_variable: String,

    pub path_lookup: PathLookup,

    /// `None` picks the strategy from each endpoint's view
    pub default_strategy: Option<QueryStrategy>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_soft_limit: Some(100),
            hard_limit: Some(10_000),
            root_variable: DEFAULT_ROOT_VARIABLE.to_string(),
            path_lookup: PathLookup::BreadthFirst,
            default_strategy: None,
        }
    }
}

fn validate_root_variable(name: &str) -> Result<(), ValidationError> {
    if is_legal_short_name(name) {
        Ok(())
    } else {
        let mut err = ValidationError::new("root_variable");
        err.message = Some("Root variable must match [A-Za-z][A-Za-z0-9_]*".into());
        Err(err)
    }
}

fn validate_limits(config: &CompilerConfig) -> Result<(), ValidationError> {
    match (config.default_soft_limit, config.hard_limit) {
        (Some(soft), Some(hard)) if soft > hard => {
            let mut err = ValidationError::new("limits");
            err.message = Some(format!("Soft limit {} exceeds hard limit {}", soft, hard).into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl CompilerConfig {
    /// Create configuration from `VIEWGRAPH_*` environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            default_soft_limit: parse_optional_env_var("VIEWGRAPH_SOFT_LIMIT")?
                .or(defaults.default_soft_limit),
            hard_limit: parse_optional_env_var("VIEWGRAPH_HARD_LIMIT")?.or(defaults.hard_limit),
            root_variable: env::var("VIEWGRAPH_ROOT_VARIABLE")
                .unwrap_or_else(|_| DEFAULT_ROOT_VARIABLE.to_string()),
            path_lookup: parse_env_enum("VIEWGRAPH_PATH_LOOKUP")?.unwrap_or_default(),
            default_strategy: match env::var("VIEWGRAPH_STRATEGY").ok().as_deref() {
                None | Some("auto") => None,
                Some(_) => parse_env_enum("VIEWGRAPH_STRATEGY")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn merge(mut self, overrides: CliOverrides) -> Result<Self, ConfigError> {
        if let Some(soft) = overrides.soft_limit {
            self.default_soft_limit = Some(soft);
        }
        if let Some(hard) = overrides.hard_limit {
            self.hard_limit = Some(hard);
        }
        if let Some(root) = overrides.root_variable {
            self.root_variable = root;
        }
        if let Some(strategy) = overrides.strategy {
            self.default_strategy = Some(strategy);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn limit_policy(&self) -> LimitPolicy {
        LimitPolicy::new(self.default_soft_limit, self.hard_limit)
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub soft_limit: Option<u64>,
    pub hard_limit: Option<u64>,
    pub root_variable: Option<String>,
    pub strategy: Option<QueryStrategy>,
}

/// Parse an optional environment variable
fn parse_optional_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e| ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse an environment variable holding a serde enum name (`flat`, `qualified`, ...)
fn parse_env_enum<T: DeserializeOwned>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => serde_yaml::from_str(&value).map(Some).map_err(|e| ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

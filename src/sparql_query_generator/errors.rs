use thiserror::Error;

use crate::view_catalog::ViewSpecError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryBuildError {
    #[error("Nested-select strategy required but endpoint is configured for flat queries: {reason}")]
    NestedSelectRequired { reason: String },
    #[error("Query template has no `{marker}` marker (needed to place {content})")]
    MissingMarker { marker: String, content: String },
    #[error("Invalid value `{value}` for parameter `{name}`: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    View(#[from] ViewSpecError),
}

/// Helper for creating errors with context
impl QueryBuildError {
    pub fn nested_select_required(reason: impl Into<String>) -> Self {
        QueryBuildError::NestedSelectRequired {
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QueryBuildError::InvalidParameter {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True when the request, not the endpoint configuration, is at fault.
    pub fn is_request_error(&self) -> bool {
        match self {
            QueryBuildError::InvalidParameter { .. } => true,
            QueryBuildError::View(e) => e.is_request_error(),
            _ => false,
        }
    }
}

//! # View Specification Error Types
//!
//! ## Error Categories
//!
//! - **Load-time errors**: malformed view trees, unreadable or unparseable
//!   configuration, dangling or cyclic view references. These abort endpoint
//!   registration.
//! - **Request-time errors**: filter/sort/projection parameters that name a
//!   path or property the active view does not have. These are recoverable and
//!   the request layer turns them into "bad parameter" responses
//!   (see [`ViewSpecError::is_request_error`]).
//!
//! ## Usage Patterns
//!
//! ```ignore
//! // ✅ GOOD: says what was wrong and where it was found
//! ViewSpecError::malformed_with_context(
//!     "short name `has-dash` contains illegal characters",
//!     "view `warning`, entry 3",
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ViewSpecError {
    #[error("Malformed view specification: {message}")]
    MalformedViewSpec { message: String },
    #[error("No view entry at path `{path}`")]
    PathNotFound { path: String },
    #[error("No view entry for property <{uri}>")]
    UnknownProperty { uri: String },
    #[error("Short name `{name}` is ambiguous, it matches: {}", .candidates.join(", "))]
    AmbiguousName {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Property `{path}` is not filterable")]
    NotFilterable { path: String },
    #[error("No view named `{name}`")]
    ViewNotFound { name: String },
    #[error("View `{name}` is part of a reference cycle")]
    CyclicReference { name: String },
    #[error("Failed to read configuration file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse configuration: {error}")]
    ConfigParseError { error: String },
}

impl ViewSpecError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ViewSpecError::MalformedViewSpec {
            message: message.into(),
        }
    }

    /// Create a MalformedViewSpec error with context information
    ///
    /// # Example
    /// ```ignore
    /// ViewSpecError::malformed_with_context(
    ///     "`nested` must be an array",
    ///     "view `warning`, property `floodArea`",
    /// )
    /// ```
    pub fn malformed_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        ViewSpecError::MalformedViewSpec {
            message: format!("{}\n  Context: {}", message.into(), context.into()),
        }
    }

    pub fn path_not_found(path: impl Into<String>) -> Self {
        ViewSpecError::PathNotFound { path: path.into() }
    }

    /// True for errors caused by request parameters rather than configuration.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ViewSpecError::PathNotFound { .. }
                | ViewSpecError::UnknownProperty { .. }
                | ViewSpecError::AmbiguousName { .. }
                | ViewSpecError::NotFilterable { .. }
        )
    }
}

use thiserror::Error;

/// Failure reported by a row source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowSourceError {
    #[error("Row source I/O error: {0}")]
    Io(String),
    #[error("Malformed result set: {0}")]
    Format(String),
    #[error("Query backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoalesceError {
    /// The row source failed mid-stream. The source has been closed and the
    /// stream yields nothing further; trees already emitted stay valid.
    #[error("Result stream aborted: {source}")]
    StreamAborted {
        #[source]
        source: RowSourceError,
    },
}

impl From<RowSourceError> for CoalesceError {
    fn from(source: RowSourceError) -> Self {
        CoalesceError::StreamAborted { source }
    }
}

impl RowSourceError {
    pub fn format_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        RowSourceError::Format(format!("{}\n  Context: {}", message.into(), context.into()))
    }
}

use crate::spreadsheet::BackendError;
use std::fmt::Display;
use thiserror::Error;

/// Kind of source entity that a resolution step looked for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Workbook,
    Sheet,
    Table,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Workbook => "Workbook",
            SourceKind::Sheet => "Sheet",
            SourceKind::Table => "Table",
        };
        write!(f, "{name}")
    }
}

/// Main error type of the query engine.
/// Aggregates backend failures with the engine's own resolution and data-shape errors.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("{0}")]
    WithContext(String),

    /// A workbook, sheet or table required to exist is absent.
    #[error("{kind} '{name}' not found")]
    SourceNotFound { kind: SourceKind, name: String },

    /// Fuzzy matching found no candidate, or several equally good ones.
    #[error("Cannot resolve '{name}' to a single file: {reason}")]
    AmbiguousSource { name: String, reason: String },

    /// A transform referenced a column or row that does not exist in the buffer.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A split/extract/replace pattern is invalid for its use.
    #[error("Invalid pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },

    #[error("Spreadsheet backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("No source workbook selected for query '{0}'")]
    MissingSource(String),

    #[error("Query '{0}' has no data")]
    NothingToCommit(String),

    #[error("Query '{0}' failed earlier and cannot be committed")]
    SessionFailed(String),

    #[error("{0}")]
    Backend(BackendError),
}

impl QueryError {
    pub(crate) fn not_found(kind: SourceKind, name: impl Into<String>) -> Self {
        QueryError::SourceNotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        QueryError::SchemaMismatch(message.into())
    }
}

impl From<BackendError> for QueryError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::FileNotFound(path) => QueryError::SourceNotFound {
                kind: SourceKind::Workbook,
                name: path.display().to_string(),
            },
            BackendError::Unavailable(message) => QueryError::BackendUnavailable(message),
            error => QueryError::Backend(error),
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, QueryError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| QueryError::WithContext(format!("{}: {}", message, e)))
    }
}

//! Error types
//!
//! Loading a document fails with [`ParseError`]; navigating a context fails
//! with [`QueryError`]. [`Error`] wraps both for callers that mix the two,
//! plus a failure to spawn the auto-updater thread.

use std::path::PathBuf;

use thiserror::Error;

/// A document could not be loaded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("document is not valid UTF-8 (first invalid byte at {offset})")]
    InvalidUtf8 { offset: usize },

    #[error("document of {len} bytes exceeds the 4 GiB index limit")]
    TooLarge { len: usize },
}

impl ParseError {
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A query against a context failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid XPath `{xpath}`: {message}")]
    InvalidSyntax { xpath: String, message: String },

    #[error("unsupported XPath expression `{xpath}`: {message}")]
    UnsupportedExpression { xpath: String, message: String },

    #[error("failed to evaluate `{xpath}`: {message}")]
    EvaluationFailed { xpath: String, message: String },

    #[error("`{xpath}` matched {count} nodes where at most one was expected")]
    AmbiguousSelect { xpath: String, count: usize },

    #[error("{operation} is not supported on a value context")]
    UnsupportedOperation { operation: &'static str },
}

impl QueryError {
    /// Number of matches for an ambiguous select, if that is what this is.
    pub fn ambiguous_count(&self) -> Option<usize> {
        match self {
            Self::AmbiguousSelect { count, .. } => Some(*count),
            _ => None,
        }
    }
}

/// Either kind of failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to start the auto-updater thread: {0}")]
    AutoUpdate(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_count() {
        let err = QueryError::AmbiguousSelect {
            xpath: "/a/b".into(),
            count: 2,
        };
        assert_eq!(err.ambiguous_count(), Some(2));
        assert_eq!(
            err.to_string(),
            "`/a/b` matched 2 nodes where at most one was expected"
        );

        let other = QueryError::UnsupportedOperation { operation: "select" };
        assert_eq!(other.ambiguous_count(), None);
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = ParseError::io(
            "/tmp/missing.xml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.xml"));
    }

    #[test]
    fn test_error_from_query() {
        let err: Error = QueryError::UnsupportedOperation { operation: "select" }.into();
        assert!(matches!(err, Error::Query(_)));
    }
}

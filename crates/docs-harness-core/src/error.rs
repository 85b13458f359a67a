//! Error types for the core pipeline.
//!
//! Only normalization can fail on well-formed input categories; every
//! other stage is total. Ineligible files and empty queries are ordinary
//! values (see [`Resolution`](crate::identity::Resolution) and
//! [`TokenizedQuery::is_empty`](crate::tokenize::TokenizedQuery::is_empty)),
//! not errors.

/// Malformed input that prevents a single file from being normalized.
///
/// Callers ingesting a batch report this per file and move on.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("invalid front matter: {0}")]
    FrontMatter(String),
    #[error("unclosed component <{name}> opened on line {line}")]
    UnclosedComponent { name: String, line: usize },
    #[error("unexpected closing tag </{name}> on line {line}")]
    UnexpectedClosingTag { name: String, line: usize },
    #[error("unbalanced expression opened on line {line}")]
    UnbalancedExpression { line: usize },
    #[error("file is not valid UTF-8")]
    NotUtf8,
}

/// Failure while ingesting one file into a [`Store`](crate::store::Store).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

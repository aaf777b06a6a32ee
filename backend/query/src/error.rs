use thiserror::Error;

/// The query string could not be parsed. `position` is a byte offset into the
/// lowercased query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query syntax error at position {position}: {message}")]
pub struct QuerySyntaxError {
    pub message: String,
    pub position: usize,
}

impl QuerySyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

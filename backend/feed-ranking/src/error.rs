use thiserror::Error;

/// Errors raised by the feed ranking core.
///
/// Only hard failures live here. Unknown view names, sort keys and filter
/// modes are logged and ignored instead of surfacing as errors.
#[derive(Debug, Error)]
pub enum FeedRankingError {
    /// A filter-settings mutation was rejected; nothing was applied.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedRankingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedRankingError>;

use crate::github::QueryCounter;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("{query} failed with status {status}: {body} (queries: {counts})")]
    Transport {
        query: &'static str,
        status: u16,
        body: String,
        counts: QueryCounter,
    },
    #[error("{query} was throttled: too many requests in a short time (queries: {counts})")]
    Throttled {
        query: &'static str,
        body: String,
        counts: QueryCounter,
    },
    #[error("{query} returned no data: {message}")]
    Query { query: &'static str, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Template error: {0}")]
    Template(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl StatsError {
    /// Errors that end the run. Everything else is absorbed by the caller and
    /// degrades the affected value to zero.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StatsError::Transport { .. } | StatsError::Throttled { .. } | StatsError::Http(_) | StatsError::Io(_)
        )
    }

    pub fn is_throttle(&self) -> bool {
        matches!(self, StatsError::Throttled { .. })
    }
}

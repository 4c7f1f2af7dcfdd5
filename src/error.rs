// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Failures surfaced by the announcement lifecycle.
///
/// "Nothing to post" is not an error: selection returns `None` / an empty list.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A content fetcher failed; the store and refresh timestamp are untouched.
    #[error("fetching announcement content failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    #[error("reading `{key}` from the status cache failed: {source:#}")]
    PersistenceRead {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("writing `{key}` to the status cache failed: {source:#}")]
    PersistenceWrite {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("cached value under `{key}` has an unexpected shape: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TrackerError {
    /// True for errors that mean "no fresh content this cycle" rather than a broken store.
    pub fn is_fetch(&self) -> bool {
        matches!(self, TrackerError::Fetch(_))
    }
}

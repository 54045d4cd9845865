use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by index building, crawling, querying and serialization.
///
/// Per-item failures (one unreadable file, one failed fetch) are logged and
/// skipped by the traversals; only operation-level failures reach callers.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unable to traverse {path}: {source}")]
    Traverse {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to read query file {path}: {source}")]
    QueryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write output: {0}")]
    Write(#[source] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("task pool has been shut down")]
    PoolClosed,

    #[error("unable to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;

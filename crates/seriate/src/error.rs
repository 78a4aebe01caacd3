//! Error types for seriate.
//!
//! Per-request transport failures never appear here; they are folded into
//! degraded [`Response`](crate::Response) values. Only structural problems
//! (bad configuration, a failing cache backend, a worker that vanished)
//! surface as [`Error`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to build HTTP transport: {0}")]
    Transport(String),

    #[error("cache backend error: {0}")]
    Cache(#[from] CacheError),

    #[error("response {index} was lost before delivery")]
    Lost { index: usize },
}

/// Failure reported by a [`Cache`](crate::Cache) backend.
///
/// Backends wrap whatever their storage layer produces; the pipeline treats
/// any cache failure as fatal to the affected request only.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CacheError(Box<dyn std::error::Error + Send + Sync>);

impl CacheError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

impl From<sled::Error> for CacheError {
    fn from(error: sled::Error) -> Self {
        Self::new(error)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error)
    }
}

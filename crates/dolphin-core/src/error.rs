//! Error types surfaced by the viewer engine.

use crate::coalescer::FetchRange;
use crate::store::StoreError;
use thiserror::Error;

/// A coalesced range failed to load. Ranges filled earlier in the same call
/// stay cached.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source}")]
pub struct FetchError {
    pub range: FetchRange,
    #[source]
    pub source: StoreError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Open(StoreError),

    #[error("{0}")]
    Status(StoreError),
}

pub type ViewerResult<T> = Result<T, ViewerError>;

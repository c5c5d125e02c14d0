//! Bibliography sources with a trait-based plugin architecture.
//!
//! Every provider implements [`Source`]: it is identified by a
//! [`SourceTag`] and turns search terms into scored [`SearchResult`]s.
//! Sources are collected in a [`SourceRegistry`], which queries them
//! concurrently.
//!
//! Available sources:
//!
//! - [`LocalFileSource`] - fuzzy search over a BibTeX file on disk
//! - [`DblpSource`] - the DBLP publication search API
//! - [`CachedSource`] - wraps another source with the on-disk result cache
//! - [`MockSource`] - canned results for tests

mod cached;
mod dblp;
mod local;
mod registry;

pub mod mock;

pub use cached::CachedSource;
pub use dblp::DblpSource;
pub use local::LocalFileSource;
pub use mock::MockSource;
pub use registry::SourceRegistry;

use crate::models::{SearchResult, SourceTag};
use crate::utils::FetchError;
use async_trait::async_trait;

/// The interface every bibliography provider implements.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Return a distinct [`SourceTag`] from `tag`
/// 3. Register it with [`SourceRegistry::register`]
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Tag attached to every result of this source
    fn tag(&self) -> SourceTag;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for records matching all of `terms`
    async fn search(&self, terms: &[String]) -> Result<Vec<SearchResult>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The provider could not be reached
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with an error
    #[error("Network error: {0}")]
    Network(String),

    /// The response could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<FetchError> for SourceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Request(e) => SourceError::Unavailable(e.to_string()),
            status @ FetchError::Status { .. } => SourceError::Network(status.to_string()),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

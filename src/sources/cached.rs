//! Caching wrapper around another source.

use async_trait::async_trait;

use crate::models::{SearchResult, SourceTag};
use crate::sources::{Source, SourceError};
use crate::utils::{CacheResult, CacheService};

/// Serves repeated queries of the inner source from the search cache
///
/// Cache hits are re-tagged [`SourceTag::Cache`] so consolidation can rank
/// them on their own; fresh results keep the inner source's tag.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    cache: CacheService,
}

impl<S: Source> CachedSource<S> {
    pub fn new(inner: S, cache: CacheService) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn retag(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .map(|mut result| {
            result.sources = [SourceTag::Cache].into_iter().collect();
            result
        })
        .collect()
}

#[async_trait]
impl<S: Source> Source for CachedSource<S> {
    fn tag(&self) -> SourceTag {
        self.inner.tag()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, terms: &[String]) -> Result<Vec<SearchResult>, SourceError> {
        let tag = self.inner.tag();
        match self.cache.get_search(tag.id(), terms) {
            CacheResult::Hit(results) => return Ok(retag(results)),
            CacheResult::Expired | CacheResult::Miss => {}
        }

        let results = self.inner.search(terms).await?;
        self.cache.set_search(tag.id(), terms, &results);
        Ok(results)
    }
}

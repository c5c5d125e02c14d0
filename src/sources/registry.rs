//! Registry for managing bibliography sources.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{CachedSource, DblpSource, LocalFileSource, Source};
use crate::config::Config;
use crate::models::{SearchResult, SourceTag};
use crate::utils::CacheService;

/// Registry for all configured sources
///
/// Sources are keyed by tag; registering a second source with the same tag
/// replaces the first.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceTag, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the sources described by `config`
    ///
    /// The local source is added when a BibTeX file is configured; DBLP is
    /// always added, behind the search cache when caching is enabled.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        if let Some(path) = &config.local.bib_file {
            registry.register(Arc::new(LocalFileSource::new(path.clone())));
        }

        let dblp = DblpSource::from_config(config.dblp.clone());
        if config.cache.enabled {
            let cache = CacheService::from_config(config.cache.clone());
            if let Err(e) = cache.initialize() {
                tracing::warn!("Search cache unavailable: {}", e);
            }
            registry.register(Arc::new(CachedSource::new(dblp, cache)));
        } else {
            registry.register(Arc::new(dblp));
        }

        registry
    }

    /// Register a new source
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.tag(), source);
    }

    /// Tags of all registered sources, sorted
    pub fn tags(&self) -> Vec<SourceTag> {
        let mut tags: Vec<SourceTag> = self.sources.keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Query every source concurrently
    ///
    /// A source that fails or exceeds `timeout` contributes an empty list;
    /// the failure is logged and never aborts the search.
    pub async fn search_all(
        &self,
        terms: &[String],
        timeout: Duration,
    ) -> HashMap<SourceTag, Vec<SearchResult>> {
        let searches = self.sources.iter().map(|(tag, source)| async move {
            let results = match tokio::time::timeout(timeout, source.search(terms)).await {
                Ok(Ok(results)) => results,
                Ok(Err(e)) => {
                    tracing::warn!("{} search failed: {}", source.name(), e);
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!("{} search timed out after {:?}", source.name(), timeout);
                    Vec::new()
                }
            };
            (tag.clone(), results)
        });

        join_all(searches).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RecordBuilder};
    use crate::sources::MockSource;

    fn result(title: &str, tag: SourceTag) -> SearchResult {
        let record = RecordBuilder::new(Category::Misc).title(title).build();
        SearchResult::new(record, tag, 1.0)
    }

    #[test]
    fn test_registry_basic() {
        let mut registry = SourceRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(MockSource::new(SourceTag::Local)));
        registry.register(Arc::new(MockSource::new(SourceTag::Dblp)));
        registry.register(Arc::new(MockSource::new(SourceTag::Dblp)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.tags(), vec![SourceTag::Local, SourceTag::Dblp]);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.cache.enabled = false;
        let registry = SourceRegistry::from_config(&config);
        assert_eq!(registry.tags(), vec![SourceTag::Dblp]);

        config.local.bib_file = Some("refs.bib".into());
        let registry = SourceRegistry::from_config(&config);
        assert_eq!(registry.tags(), vec![SourceTag::Local, SourceTag::Dblp]);
    }

    #[tokio::test]
    async fn test_search_all_isolates_failures() {
        let local = MockSource::new(SourceTag::Local);
        local.set_results(vec![result("Found", SourceTag::Local)]);

        let dblp = MockSource::new(SourceTag::Dblp);
        dblp.set_error("connection refused");

        let slow = MockSource::new(SourceTag::Other("slow".to_string()));
        slow.set_results(vec![result("Late", SourceTag::Other("slow".to_string()))]);
        slow.set_delay(Duration::from_secs(5));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(local));
        registry.register(Arc::new(dblp));
        registry.register(Arc::new(slow));

        let results = registry
            .search_all(&["found".to_string()], Duration::from_millis(100))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[&SourceTag::Local].len(), 1);
        assert!(results[&SourceTag::Dblp].is_empty());
        assert!(results[&SourceTag::Other("slow".to_string())].is_empty());
    }
}

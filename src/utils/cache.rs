//! Local cache for search results.
//!
//! Results of each `(source, terms)` query are stored as one JSON file so
//! that repeated searches do not hit the network.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/bib-master/
//!   searches/
//!     <md5>.json
//! ```
//!
//! Each file holds the cached results plus metadata.

use crate::config::{CacheConfig, Config};
use crate::models::SearchResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    /// When the item was cached (Unix timestamp)
    cached_at: u64,

    /// When the item expires (Unix timestamp)
    expires_at: u64,

    /// Source ID that provided the results
    source: String,

    /// Search terms as typed
    query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSearch {
    metadata: CacheMetadata,
    results: Vec<SearchResult>,
}

/// Result of a cache lookup
#[derive(Debug)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

/// Cache service for search results
#[derive(Debug, Clone)]
pub struct CacheService {
    base_dir: PathBuf,
    search_dir: PathBuf,
    config: CacheConfig,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CacheService {
    /// Create a new cache service with default config
    pub fn new() -> Self {
        Self::from_config(Config::default().cache)
    }

    /// Create a new cache service with the given config
    pub fn from_config(config: CacheConfig) -> Self {
        let base_dir = config
            .directory
            .clone()
            .unwrap_or_else(crate::config::default_cache_dir);
        let search_dir = base_dir.join("searches");

        Self {
            base_dir,
            search_dir,
            config,
        }
    }

    /// Initialize the cache directories
    pub fn initialize(&self) -> std::io::Result<()> {
        if self.config.enabled {
            fs::create_dir_all(&self.search_dir)?;
            tracing::info!("Cache initialized at: {}", self.base_dir.display());
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Cache key for a query: md5 of the source id and the joined terms
    pub fn search_key(source: &str, terms: &[String]) -> String {
        let input = format!("{}|{}", source, terms.join(" "));
        format!("{:x}", md5::compute(input.as_bytes()))
    }

    fn search_path(&self, key: &str) -> PathBuf {
        self.search_dir.join(format!("{key}.json"))
    }

    /// Read the cached results of a query
    pub fn get_search(&self, source: &str, terms: &[String]) -> CacheResult<Vec<SearchResult>> {
        if !self.is_enabled() {
            return CacheResult::Miss;
        }

        let key = Self::search_key(source, terms);
        match read_cache_file::<CachedSearch>(&self.search_path(&key)) {
            Ok(cached) if now_secs() >= cached.metadata.expires_at => {
                tracing::debug!("Cache expired for search: {}", key);
                CacheResult::Expired
            }
            Ok(cached) => {
                tracing::debug!("Cache HIT for search: {}", key);
                CacheResult::Hit(cached.results)
            }
            Err(_) => {
                tracing::debug!("Cache MISS for search: {}", key);
                CacheResult::Miss
            }
        }
    }

    /// Store the results of a query; failures are logged, never returned
    pub fn set_search(&self, source: &str, terms: &[String], results: &[SearchResult]) {
        if !self.is_enabled() {
            return;
        }

        let key = Self::search_key(source, terms);
        let now = now_secs();
        let cached = CachedSearch {
            metadata: CacheMetadata {
                cached_at: now,
                expires_at: now + self.config.ttl_seconds,
                source: source.to_string(),
                query: terms.join(" "),
            },
            results: results.to_vec(),
        };

        let written = fs::create_dir_all(&self.search_dir)
            .and_then(|_| write_cache_file(&self.search_path(&key), &cached));
        match written {
            Ok(()) => tracing::debug!("Cached search result: {}", key),
            Err(e) => tracing::warn!("Failed to cache search result: {}", e),
        }
    }

    /// Clear all cached data
    pub fn clear_all(&self) -> std::io::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let _ = fs::remove_dir_all(&self.base_dir);
        self.initialize()?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.is_enabled() {
            return CacheStats::disabled();
        }

        let search_count = self.search_dir.read_dir().map(|e| e.count()).unwrap_or(0);
        let size_kb = dir_size(&self.search_dir) / 1024;

        CacheStats {
            enabled: true,
            cache_dir: self.base_dir.clone(),
            search_count,
            size_kb,
            ttl: Duration::from_secs(self.config.ttl_seconds),
        }
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

fn read_cache_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, std::io::Error> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

fn write_cache_file<T: Serialize>(path: &Path, data: &T) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(data)?;
    fs::write(path, content)
}

fn dir_size(path: &Path) -> u64 {
    path.read_dir()
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| entry.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Statistics about the cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub enabled: bool,
    pub cache_dir: PathBuf,

    /// Number of cached queries
    pub search_count: usize,

    /// Size of the search cache in KB
    pub size_kb: u64,

    pub ttl: Duration,
}

impl CacheStats {
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            search_count: 0,
            size_kb: 0,
            ttl: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RecordBuilder, SourceTag};
    use tempfile::TempDir;

    fn test_cache_config(dir: &Path) -> CacheConfig {
        CacheConfig {
            enabled: true,
            directory: Some(dir.to_path_buf()),
            ttl_seconds: 60,
        }
    }

    fn terms(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn results() -> Vec<SearchResult> {
        let record = RecordBuilder::new(Category::Article)
            .authors(["Ann Smith"])
            .title("Types")
            .year("2012")
            .build();
        vec![SearchResult::new(record, SourceTag::Dblp, 0.8)]
    }

    #[test]
    fn test_cache_search() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::from_config(test_cache_config(temp_dir.path()));
        cache.initialize().unwrap();

        cache.set_search("dblp", &terms("types proofs"), &results());

        match cache.get_search("dblp", &terms("types proofs")) {
            CacheResult::Hit(cached) => assert_eq!(cached, results()),
            other => panic!("Expected cache hit, got {:?}", other),
        }

        assert!(matches!(
            cache.get_search("dblp", &terms("different query")),
            CacheResult::Miss
        ));
        assert!(matches!(
            cache.get_search("local", &terms("types proofs")),
            CacheResult::Miss
        ));

        assert_eq!(cache.stats().search_count, 1);
        cache.clear_all().unwrap();
        assert_eq!(cache.stats().search_count, 0);
    }

    #[test]
    fn test_cache_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            enabled: false,
            ..test_cache_config(temp_dir.path())
        };
        let cache = CacheService::from_config(config);

        cache.set_search("dblp", &terms("q"), &results());

        assert!(matches!(cache.get_search("dblp", &terms("q")), CacheResult::Miss));
        assert!(!cache.stats().enabled);
    }

    #[test]
    fn test_cache_expiration() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            ttl_seconds: 0,
            ..test_cache_config(temp_dir.path())
        };
        let cache = CacheService::from_config(config);
        cache.initialize().unwrap();

        cache.set_search("dblp", &terms("q"), &results());

        assert!(matches!(cache.get_search("dblp", &terms("q")), CacheResult::Expired));
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheService::from_config(test_cache_config(temp_dir.path()));
        cache.initialize().unwrap();

        let key = CacheService::search_key("dblp", &terms("q"));
        fs::write(cache.search_path(&key), "not json").unwrap();

        assert!(matches!(cache.get_search("dblp", &terms("q")), CacheResult::Miss));
    }
}

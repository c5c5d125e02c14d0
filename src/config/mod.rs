//! Configuration management.
//!
//! Settings come from a TOML file layered under `BIB_MASTER_*` environment
//! variables (nested keys use `__`, e.g. `BIB_MASTER_DBLP__MAX_RESULTS=50`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [dblp]
//! base_url = "https://dblp.org"
//! max_results = 30
//! timeout_secs = 10
//!
//! [local]
//! bib_file = "~/papers/refs.bib"
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 86400
//!
//! [search]
//! priority = ["local", "cache", "dblp"]
//! timeout_secs = 15
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::SourceTag;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BIB_MASTER";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dblp: DblpConfig,
    pub local: LocalConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

/// DBLP API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DblpConfig {
    /// Base URL; the search endpoint is `<base_url>/search/publ/api`
    pub base_url: String,

    /// Maximum number of hits requested per query
    pub max_results: usize,

    pub timeout_secs: u64,
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dblp.org".to_string(),
            max_results: 30,
            timeout_secs: 10,
        }
    }
}

/// Local BibTeX file settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// File searched by the local source; no local source when unset
    pub bib_file: Option<PathBuf>,
}

/// Search cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache location, defaults to [`default_cache_dir`]
    pub directory: Option<PathBuf>,

    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_seconds: 86_400, // one day
        }
    }
}

/// Search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Source precedence when merging equivalent results
    pub priority: Vec<SourceTag>,

    /// Upper bound on the time a single source may take
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            priority: vec![SourceTag::Local, SourceTag::Cache, SourceTag::Dblp],
            timeout_secs: 15,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `RUST_LOG` nor `-v`/`-q` is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from `path`, or from the first file found by
/// [`find_config_file`], with environment variables on top
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::info!("Using configuration file {}", found.display());
                builder = builder.add_source(config::File::from(found));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("search.priority")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// `./bib-master.toml`, then `<config dir>/bib-master/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bib-master.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bib-master").join("config.toml"))
        .filter(|path| path.is_file())
}

/// `<cache dir>/bib-master`, or `./.bib-master-cache` without a cache dir
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("bib-master"))
        .unwrap_or_else(|| PathBuf::from(".bib-master-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dblp.base_url, "https://dblp.org");
        assert!(config.cache.enabled);
        assert_eq!(config.search.priority[0], SourceTag::Local);
        assert_eq!(config.local.bib_file, None);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[dblp]
max_results = 5

[local]
bib_file = "/tmp/refs.bib"

[cache]
enabled = false

[search]
priority = ["dblp", "local"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.dblp.max_results, 5);
        assert_eq!(config.dblp.base_url, "https://dblp.org");
        assert_eq!(config.local.bib_file, Some(PathBuf::from("/tmp/refs.bib")));
        assert!(!config.cache.enabled);
        assert_eq!(config.search.priority, vec![SourceTag::Dblp, SourceTag::Local]);
        assert_eq!(config.search.timeout_secs, 15);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/bib-master.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.local.bib_file = Some(PathBuf::from("refs.bib"));

        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

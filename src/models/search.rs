//! Search results and the tags identifying where they came from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::record::Record;

/// The provider that contributed a search result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// The locally managed BibTeX file
    Local,
    /// Results replayed from the on-disk search cache
    Cache,
    /// The DBLP metadata API
    Dblp,
    #[serde(untagged)]
    Other(String),
}

impl SourceTag {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceTag::Local => "Local file",
            SourceTag::Cache => "Cache",
            SourceTag::Dblp => "DBLP",
            SourceTag::Other(s) => s,
        }
    }

    /// Returns the source identifier (used in configuration and output)
    pub fn id(&self) -> &str {
        match self {
            SourceTag::Local => "local",
            SourceTag::Cache => "cache",
            SourceTag::Dblp => "dblp",
            SourceTag::Other(s) => s,
        }
    }

    /// Parse an identifier; unknown ids become `Other`
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_lowercase().as_str() {
            "local" => SourceTag::Local,
            "cache" => SourceTag::Cache,
            "dblp" => SourceTag::Dblp,
            other => SourceTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A record found by one or more sources, with a relevance score in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: Record,
    pub sources: BTreeSet<SourceTag>,
    pub score: f64,
}

impl SearchResult {
    /// Create a result contributed by a single source
    pub fn new(record: Record, source: SourceTag, score: f64) -> Self {
        Self {
            record,
            sources: BTreeSet::from([source]),
            score: clamp_score(score),
        }
    }

    /// Merge an equivalent result into this one
    ///
    /// The record of `self` is kept, sources are united and the higher
    /// score wins.
    pub fn merge(mut self, other: SearchResult) -> SearchResult {
        self.sources.extend(other.sources);
        self.score = self.score.max(other.score);
        self
    }

    pub fn has_source(&self, tag: &SourceTag) -> bool {
        self.sources.contains(tag)
    }

    /// Comma separated source ids, for display
    pub fn source_list(&self) -> String {
        self.sources
            .iter()
            .map(SourceTag::id)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

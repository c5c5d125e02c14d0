//! Search over a local BibTeX file.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::bibtex::RecordStream;
use crate::models::{Record, SearchResult, SourceTag};
use crate::sources::{Source, SourceError};

/// Records scoring below this are not returned
const MIN_SCORE: f64 = 0.85;

/// Fields whose words are matched against the search terms
const SEARCHED_FIELDS: &[&str] = &["title", "booktitle", "journal", "year"];

/// Fuzzy search over the entries of a BibTeX file
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every well-formed record of the file
    ///
    /// Malformed entries are logged and skipped.
    pub async fn load(&self) -> Result<Vec<Record>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let path = self.path.display().to_string();
        let records: Vec<Record> = RecordStream::new(&content, |message: &str| {
            tracing::warn!("{}: {}", path, message);
        })
        .collect();

        tracing::debug!("Loaded {} records from {}", records.len(), path);
        Ok(records)
    }
}

/// Lowercase words of the searchable parts of a record
fn record_tokens(record: &Record) -> Vec<String> {
    let mut text: Vec<&str> = SEARCHED_FIELDS
        .iter()
        .filter_map(|field| record.scalar(field))
        .collect();
    text.extend(record.authors().iter().map(String::as_str));
    text.extend(record.editors().iter().map(String::as_str));
    if let Some(key) = record.key.as_deref() {
        text.push(key);
    }

    text.iter()
        .flat_map(|t| t.split(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Average over the terms of the best Jaro-Winkler match among the tokens
pub fn match_score(terms: &[String], record: &Record) -> f64 {
    let tokens = record_tokens(record);
    if terms.is_empty() || tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = terms
        .iter()
        .map(|term| {
            let term = term.to_lowercase();
            tokens
                .iter()
                .map(|token| strsim::jaro_winkler(&term, token))
                .fold(0.0, f64::max)
        })
        .sum();
    total / terms.len() as f64
}

#[async_trait]
impl Source for LocalFileSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Local
    }

    fn name(&self) -> &str {
        "Local file"
    }

    async fn search(&self, terms: &[String]) -> Result<Vec<SearchResult>, SourceError> {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .load()
            .await?
            .into_iter()
            .filter_map(|record| {
                let score = match_score(&terms, &record);
                (score >= MIN_SCORE).then(|| SearchResult::new(record, SourceTag::Local, score))
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }
}

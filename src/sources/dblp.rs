//! DBLP research source implementation.
//!
//! Uses the DBLP publication search API in its JSON flavour. The response
//! is read permissively: any missing piece of a hit is treated as absent
//! rather than as an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::bibtex::normalize::{clean_title, normalize_pages, venue_fields};
use crate::config::DblpConfig;
use crate::models::{Category, Record, RecordBuilder, SearchResult, SourceTag, DBLP_KEY_FIELD};
use crate::sources::{Source, SourceError};
use crate::utils::{Fetcher, HttpClient};

/// DBLP research source
#[derive(Debug, Clone)]
pub struct DblpSource {
    fetcher: Arc<dyn Fetcher>,
    config: DblpConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DblpResponse {
    result: DblpResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DblpResult {
    hits: DblpHits,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DblpHits {
    hit: Vec<DblpHit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DblpHit {
    info: DblpInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DblpInfo {
    authors: Option<DblpAuthors>,
    title: Option<String>,
    venue: Option<OneOrMany<String>>,
    volume: Option<String>,
    number: Option<String>,
    pages: Option<String>,
    year: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    key: Option<String>,
    doi: Option<String>,
    ee: Option<OneOrMany<String>>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DblpAuthors {
    author: OneOrMany<DblpAuthor>,
}

/// Authors come either as `{"text": ...}` objects or as plain strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DblpAuthor {
    Named { text: String },
    Plain(String),
}

/// A single value or a list, depending on the number of items
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl DblpAuthor {
    fn into_name(self) -> String {
        let name = match self {
            DblpAuthor::Named { text } => text,
            DblpAuthor::Plain(text) => text,
        };
        strip_homonym_number(&name)
    }
}

/// DBLP disambiguates homonyms as `"John Smith 0002"`
fn strip_homonym_number(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.rsplit_once(' ') {
        Some((rest, suffix)) if suffix.len() == 4 && suffix.chars().all(|c| c.is_ascii_digit()) => {
            rest.trim_end().to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Map the DBLP publication type onto an entry category
fn category_for(kind: Option<&str>) -> Category {
    match kind {
        Some("Journal Articles") => Category::Article,
        Some("Conference and Workshop Papers") => Category::InProceedings,
        Some("Books and Theses") => Category::Book,
        Some("Editorship") => Category::Proceedings,
        Some("Parts in Books or Collections") => Category::InCollection,
        _ => Category::Misc,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl DblpSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: DblpConfig) -> Self {
        Self { fetcher, config }
    }

    /// DBLP source talking to the real API through [`HttpClient`]
    pub fn from_config(config: DblpConfig) -> Self {
        Self::new(Arc::new(HttpClient::new()), config)
    }

    /// Search URL for the given terms
    pub fn search_url(&self, terms: &[String]) -> String {
        format!(
            "{}/search/publ/api?q={}&format=json&h={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&terms.join(" ")),
            self.config.max_results
        )
    }

    /// Parse a search response body into scored results
    pub fn parse_response(&self, body: &str) -> Result<Vec<SearchResult>, SourceError> {
        let response: DblpResponse = serde_json::from_str(body)?;
        let hits = response.result.hits.hit;
        let total = hits.len();

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| {
                let score = 1.0 - i as f64 / total as f64;
                SearchResult::new(hit_to_record(hit.info), SourceTag::Dblp, score)
            })
            .collect())
    }
}

fn hit_to_record(info: DblpInfo) -> Record {
    let category = category_for(info.kind.as_deref());
    let mut builder = RecordBuilder::new(category);

    let names: Vec<String> = info
        .authors
        .map(|a| a.author.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(DblpAuthor::into_name)
        .collect();
    // for an editorship the listed persons are the editors
    builder = if category == Category::Proceedings {
        builder.editors(names)
    } else {
        builder.authors(names)
    };

    if let Some(title) = non_empty(info.title) {
        builder = builder.title(clean_title(&title));
    }

    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut put = |name: &str, value: Option<String>| {
        if let Some(value) = non_empty(value) {
            fields.insert(name.to_string(), value);
        }
    };
    put("volume", info.volume);
    put("number", info.number);
    put("pages", info.pages.map(|p| normalize_pages(&p)));
    put("year", info.year);
    put(DBLP_KEY_FIELD, info.key);
    put("doi", info.doi);
    put("ee", info.ee.and_then(|ee| ee.into_vec().into_iter().next()));
    put("url", info.url);

    let venue = info
        .venue
        .map(|v| v.into_vec().join(", "))
        .and_then(|v| non_empty(Some(v)));

    if let Some(venue) = venue {
        if ["volume", "pages", "year"].iter().any(|f| !fields.contains_key(*f)) {
            for (name, value) in venue_fields(Some(category), &venue) {
                fields.entry(name).or_insert(value);
            }
        }
        if !fields.contains_key("journal") && !fields.contains_key("booktitle") {
            let venue_field = match category {
                Category::Article => "journal",
                Category::InProceedings | Category::InCollection => "booktitle",
                Category::Proceedings | Category::Book => "series",
                _ => "howpublished",
            };
            fields.insert(venue_field.to_string(), venue);
        }
    }

    for (name, value) in fields {
        builder = builder.field(&name, value);
    }
    builder.build()
}

#[async_trait]
impl Source for DblpSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Dblp
    }

    fn name(&self) -> &str {
        "DBLP"
    }

    async fn search(&self, terms: &[String]) -> Result<Vec<SearchResult>, SourceError> {
        if terms.iter().all(|t| t.trim().is_empty()) {
            return Ok(Vec::new());
        }

        let url = self.search_url(terms);
        let body = self
            .fetcher
            .fetch(&url, Duration::from_secs(self.config.timeout_secs))
            .await?;

        let results = self.parse_response(&body)?;
        tracing::debug!("DBLP returned {} results for {:?}", results.len(), terms);
        Ok(results)
    }
}

//! Utilities built on the record model.
//!
//! - [`generate_key`] / [`assign_missing_keys`]: citation key generation
//! - [`are_equivalent`]: the similarity test used for deduplication and merging
//! - [`find_duplicates`] / [`deduplicate_records`]: duplicate detection in a collection
//! - [`consolidate`] / [`replace_results`]: merging of per-source result lists
//! - [`CacheService`]: JSON file cache for search results
//! - [`Fetcher`] / [`HttpClient`]: HTTP access for online sources
//!
//! # Consolidation
//!
//! ```rust
//! use std::collections::HashMap;
//! use bib_master::models::{Category, RecordBuilder, SearchResult, SourceTag};
//! use bib_master::utils::consolidate;
//!
//! let record = RecordBuilder::new(Category::Misc).title("Proofs and Types").year("1989").build();
//! let mut results = HashMap::new();
//! results.insert(SourceTag::Local, vec![SearchResult::new(record.clone(), SourceTag::Local, 0.9)]);
//! results.insert(SourceTag::Dblp, vec![SearchResult::new(record, SourceTag::Dblp, 1.0)]);
//!
//! let merged = consolidate(&results, &[SourceTag::Local, SourceTag::Dblp]);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].source_list(), "local,dblp");
//! ```

mod cache;
mod consolidate;
mod dedup;
mod http;
mod key;

pub use cache::{CacheResult, CacheService, CacheStats};
pub use consolidate::{consolidate, replace_results};
pub use dedup::{are_equivalent, deduplicate_records, find_duplicates, DuplicateStrategy};
pub use http::{FetchError, Fetcher, HttpClient};
pub use key::{assign_missing_keys, generate_key};

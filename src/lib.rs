//! # bib-master
//!
//! Collects bibliographic records from a local BibTeX file, an on-disk
//! search cache and the DBLP API, merges equivalent entries and writes
//! the result back as BibTeX.
//!
//! ## Architecture
//!
//! - [`models`]: entry categories and field schemas, records, search results
//! - [`bibtex`]: BibTeX parsing and rendering, normalization of external text
//! - [`utils`]: key generation, equivalence and deduplication, consolidation,
//!   the search cache and HTTP access
//! - [`sources`]: search providers behind the [`Source`] trait
//! - [`config`]: configuration management

pub mod bibtex;
pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Category, Record, RecordBuilder, SearchResult, SourceTag};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! BibTeX text format: parsing, rendering and LaTeX escaping, plus the
//! normalization applied to loosely formatted text from online sources.
//!
//! # Example
//!
//! ```rust
//! use bib_master::bibtex::{parse_record, render_record};
//!
//! let record = parse_record("@misc{k, title = {G{\\\"o}del}}").unwrap();
//! assert_eq!(record.title(), Some("Gödel"));
//! assert_eq!(render_record(&record), "@misc{k,\n  title = {G{\\\"o}del}\n}");
//! ```

pub mod latex;
pub mod normalize;
mod parser;
mod render;

pub use parser::{parse_record, parse_records, ParseError, RecordStream};
pub use render::{field_order, render_collection, render_record};

/// Fields whose values are written and read without LaTeX escaping
pub const VERBATIM_FIELDS: &[&str] = &["url", "doi", "ee", "biburl", "file", "dblpkey"];

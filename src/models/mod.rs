//! Core data models: entry categories, records and search results.

mod record;
mod schema;
mod search;

pub use record::{
    is_person_field, split_persons, Record, RecordBuilder, RecordError, DBLP_KEY_FIELD,
    PERSON_FIELDS, PERSON_SEPARATOR,
};
pub use schema::{
    optional_fields, relevant_fields, required_fields, schema, Category, FieldRequirement,
    FieldSchema, SCALAR_FIELDS,
};
pub use search::{SearchResult, SourceTag};

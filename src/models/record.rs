//! Bibliographic record: category, citation key and field storage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::schema::{required_fields, scalar_field_registry, Category, FieldRequirement};
use crate::utils::generate_key;

/// Fields holding an ordered list of person names
pub const PERSON_FIELDS: &[&str] = &["author", "editor"];

/// Separator between names inside a person field
pub const PERSON_SEPARATOR: &str = " and ";

/// Field holding the DBLP record identifier
pub const DBLP_KEY_FIELD: &str = "dblpkey";

/// Errors raised while building a record from raw fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A person field produced no names after splitting
    #[error("Malformed record: field '{field}' has no names in '{value}'")]
    MalformedRecord { field: String, value: String },
}

/// Whether `name` is stored as an ordered list of persons
pub fn is_person_field(name: &str) -> bool {
    PERSON_FIELDS.contains(&name)
}

/// Split a person field value on the literal `" and "` separator
pub fn split_persons(field: &str, value: &str) -> Result<Vec<String>, RecordError> {
    let persons: Vec<String> = value
        .split(PERSON_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if persons.is_empty() {
        return Err(RecordError::MalformedRecord {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(persons)
}

/// A single bibliographic entry
///
/// Values are kept as formatted text: LaTeX accents are decoded to Unicode,
/// brace groups and other TeX markup are kept verbatim so that rendering
/// reproduces what was imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Entry type; `None` for unknown types
    pub category: Option<Category>,

    /// Citation key, absent until assigned
    pub key: Option<String>,

    /// Single-valued fields (title, year, journal, ...)
    #[serde(default)]
    pub scalar_fields: BTreeMap<String, String>,

    /// Ordered person lists (author, editor)
    #[serde(default)]
    pub person_fields: BTreeMap<String, Vec<String>>,
}

/// Generates `fn name(&self) -> Option<&str>` lookups into the scalar fields
macro_rules! scalar_accessors {
    ($($name:ident => $field:literal),* $(,)?) => {
        $(
            #[doc = concat!("The `", $field, "` field")]
            pub fn $name(&self) -> Option<&str> {
                self.scalar($field)
            }
        )*
    };
}

impl Record {
    /// Create an empty record of the given category
    pub fn new(category: Option<Category>) -> Self {
        Self {
            category,
            ..Default::default()
        }
    }

    /// Build a record from a flat field map, classifying person fields
    pub fn import_from<I, K, V>(
        category: Option<Category>,
        key: Option<String>,
        fields: I,
    ) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Record::new(category);
        record.key = key.filter(|k| !k.trim().is_empty());
        for (name, value) in fields {
            record.set(name.as_ref(), value.as_ref())?;
        }
        Ok(record)
    }

    /// All field names, scalar and person
    pub fn fields(&self) -> BTreeSet<&str> {
        self.scalar_fields
            .keys()
            .chain(self.person_fields.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.scalar_fields.contains_key(name) || self.person_fields.contains_key(name)
    }

    /// True when every required field of the category is present
    pub fn is_valid(&self) -> bool {
        self.missing_requirements().is_empty()
    }

    /// Requirements of the category that the record does not satisfy
    pub fn missing_requirements(&self) -> Vec<FieldRequirement> {
        required_fields(self.category)
            .iter()
            .filter(|req| !req.is_satisfied_by(|name| self.has_field(name)))
            .copied()
            .collect()
    }

    /// Field value as text; person lists are joined with `" and "`
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        if let Some(value) = self.scalar_fields.get(&name) {
            return Some(value.clone());
        }
        self.person_fields
            .get(&name)
            .map(|persons| persons.join(PERSON_SEPARATOR))
    }

    /// Borrowed lookup of a scalar field
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalar_fields.get(name).map(String::as_str)
    }

    /// Declared category, or `misc`
    pub fn effective_category(&self) -> Category {
        self.category.unwrap_or(Category::Misc)
    }

    /// Declared key, or the generated fallback
    pub fn effective_key(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => generate_key(self),
        }
    }

    pub fn authors(&self) -> &[String] {
        self.persons("author")
    }

    pub fn editors(&self) -> &[String] {
        self.persons("editor")
    }

    /// Ordered names of a person field, empty if absent
    pub fn persons(&self, name: &str) -> &[String] {
        self.person_fields
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    scalar_field_registry!(scalar_accessors);

    /// Set a field, splitting person fields on `" and "`
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), RecordError> {
        let name = name.trim().to_lowercase();
        if is_person_field(&name) {
            let persons = split_persons(&name, value)?;
            self.scalar_fields.remove(&name);
            self.person_fields.insert(name, persons);
        } else {
            self.person_fields.remove(&name);
            self.scalar_fields.insert(name, value.to_string());
        }
        Ok(())
    }

    /// Replace a person field with an already split list
    pub fn set_persons(&mut self, name: &str, persons: Vec<String>) -> Result<(), RecordError> {
        let name = name.trim().to_lowercase();
        let persons: Vec<String> = persons
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if persons.is_empty() {
            return Err(RecordError::MalformedRecord {
                field: name,
                value: String::new(),
            });
        }
        self.scalar_fields.remove(&name);
        self.person_fields.insert(name, persons);
        Ok(())
    }

    /// Remove a field; returns whether it was present
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        let scalar = self.scalar_fields.remove(&name).is_some();
        let person = self.person_fields.remove(&name).is_some();
        scalar || person
    }

    pub fn assign_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Copy of this record with the given key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.assign_key(key);
        self
    }
}

/// Builder for constructing records in sources and tests
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    pub fn new(category: Category) -> Self {
        Self {
            record: Record::new(Some(category)),
        }
    }

    /// Builder for a record whose entry type is unknown
    pub fn untyped() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.record.key = Some(key.into());
        self
    }

    /// Set a scalar field; person field names are split like on import
    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let name = name.to_lowercase();
        if is_person_field(&name) {
            return self.persons(&name, value.split(PERSON_SEPARATOR));
        }
        self.record.person_fields.remove(&name);
        self.record.scalar_fields.insert(name, value);
        self
    }

    /// Set a person field from individual names; empty lists are ignored
    pub fn persons<I, S>(mut self, name: &str, persons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let persons: Vec<String> = persons.into_iter().map(Into::into).collect();
        // set_persons only fails on an empty list, which leaves the field unset
        let _ = self.record.set_persons(name, persons);
        self
    }

    pub fn authors<I, S>(self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persons("author", authors)
    }

    pub fn editors<I, S>(self, editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persons("editor", editors)
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.field("title", title)
    }

    pub fn year(self, year: impl Into<String>) -> Self {
        self.field("year", year)
    }

    pub fn doi(self, doi: impl Into<String>) -> Self {
        self.field("doi", doi)
    }

    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Record {
        RecordBuilder::new(Category::Article)
            .key("Smith12Types")
            .authors(["John Smith", "Ann Jones"])
            .title("Types for Proofs")
            .year("2012")
            .build()
    }

    #[test]
    fn test_import_classifies_person_fields() {
        let record = Record::import_from(
            Some(Category::Article),
            Some("k".to_string()),
            [
                ("Author", "John Smith and Ann Jones"),
                ("title", "A Title"),
                ("editor", "Bob Lee"),
            ],
        )
        .unwrap();

        assert_eq!(record.authors(), &["John Smith", "Ann Jones"]);
        assert_eq!(record.editors(), &["Bob Lee"]);
        assert_eq!(record.title(), Some("A Title"));
        assert!(!record.scalar_fields.contains_key("author"));
    }

    #[test]
    fn test_import_rejects_empty_person_field() {
        let err = Record::import_from(None, None, [("author", "  and  ")]).unwrap_err();
        assert!(matches!(err, RecordError::MalformedRecord { ref field, .. } if field == "author"));
    }

    #[test]
    fn test_import_ignores_blank_key() {
        let record = Record::import_from(None, Some("  ".to_string()), [("title", "x")]).unwrap();
        assert_eq!(record.key, None);
    }

    #[test]
    fn test_get_joins_persons() {
        let record = article();
        assert_eq!(record.get("author").as_deref(), Some("John Smith and Ann Jones"));
        assert_eq!(record.get("TITLE").as_deref(), Some("Types for Proofs"));
        assert_eq!(record.get("journal"), None);
    }

    #[test]
    fn test_fields_union() {
        let record = article();
        let fields: Vec<&str> = record.fields().into_iter().collect();
        assert_eq!(fields, vec!["author", "title", "year"]);
    }

    #[test]
    fn test_validity_article_needs_journal() {
        let mut record = article();
        assert!(!record.is_valid());
        assert_eq!(
            record.missing_requirements(),
            vec![FieldRequirement::Field("journal")]
        );

        record.set("journal", "CACM").unwrap();
        assert!(record.is_valid());
    }

    #[test]
    fn test_validity_one_of() {
        let book = RecordBuilder::new(Category::Book)
            .editors(["Jane Roe"])
            .title("Handbook")
            .field("publisher", "Springer")
            .year("2001")
            .build();
        assert!(book.is_valid());
    }

    #[test]
    fn test_unknown_category_always_valid() {
        assert!(Record::new(None).is_valid());
        assert_eq!(Record::new(None).effective_category(), Category::Misc);
    }

    #[test]
    fn test_effective_key_prefers_declared() {
        let record = article();
        assert_eq!(record.effective_key(), "Smith12Types");

        let mut unkeyed = record.clone();
        unkeyed.key = None;
        assert_eq!(unkeyed.effective_key(), "SmithJones12TypesProofs");
    }

    #[test]
    fn test_set_moves_between_maps() {
        let mut record = Record::new(None);
        record.set("note", "x").unwrap();
        record.set("author", "A B").unwrap();
        assert!(record.remove("note"));
        assert!(!record.remove("note"));
        assert_eq!(record.fields().len(), 1);
    }

    #[test]
    fn test_named_accessors() {
        let record = RecordBuilder::untyped()
            .field("dblpkey", "journals/cacm/Smith12")
            .doi("10.1145/1")
            .build();
        assert_eq!(record.dblp_key(), Some("journals/cacm/Smith12"));
        assert_eq!(record.doi(), Some("10.1145/1"));
        assert_eq!(record.pages(), None);

        let mut report = Record::new(Some(Category::TechReport));
        report.set("type", "Research Note").unwrap();
        report.set("month", "jun").unwrap();
        assert_eq!(report.kind(), Some("Research Note"));
        assert_eq!(report.month(), Some("jun"));
    }
}

//! Entry categories and their required/optional field tables.

use serde::{Deserialize, Serialize};

/// The BibTeX entry type of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Article,
    Book,
    Booklet,
    InBook,
    InCollection,
    InProceedings,
    Manual,
    MastersThesis,
    Misc,
    PhdThesis,
    Proceedings,
    TechReport,
    Unpublished,
}

/// Name table used for both parsing and rendering
const CATEGORY_NAMES: &[(Category, &str)] = &[
    (Category::Article, "article"),
    (Category::Book, "book"),
    (Category::Booklet, "booklet"),
    (Category::InBook, "inbook"),
    (Category::InCollection, "incollection"),
    (Category::InProceedings, "inproceedings"),
    (Category::Manual, "manual"),
    (Category::MastersThesis, "mastersthesis"),
    (Category::Misc, "misc"),
    (Category::PhdThesis, "phdthesis"),
    (Category::Proceedings, "proceedings"),
    (Category::TechReport, "techreport"),
    (Category::Unpublished, "unpublished"),
];

impl Category {
    /// Every category, in name-table order
    pub fn all() -> impl Iterator<Item = Category> {
        CATEGORY_NAMES.iter().map(|(c, _)| *c)
    }

    /// Canonical lowercase name (`"inproceedings"`, ...)
    pub fn name(&self) -> &'static str {
        CATEGORY_NAMES
            .iter()
            .find(|(c, _)| c == self)
            .map(|(_, n)| *n)
            .unwrap_or("misc")
    }

    /// Case-insensitive lookup; unknown names yield `None`
    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim().to_lowercase();
        CATEGORY_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(c, _)| *c)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One entry of a category's required list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRequirement {
    /// The named field must be present
    Field(&'static str),
    /// At least one of the named fields must be present
    OneOf(&'static [&'static str]),
}

impl FieldRequirement {
    /// Field names this requirement mentions, in declaration order
    pub fn names(&self) -> &[&'static str] {
        match self {
            FieldRequirement::Field(name) => std::slice::from_ref(name),
            FieldRequirement::OneOf(names) => names,
        }
    }

    /// Whether `has` reports any of the names as present
    pub fn is_satisfied_by(&self, has: impl Fn(&str) -> bool) -> bool {
        self.names().iter().any(|name| has(name))
    }
}

impl std::fmt::Display for FieldRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// Single-valued fields known to the registry, as `accessor => "name"`
///
/// Invokes `$callback!` with the list, so each consumer (the name table
/// below, the accessors on `Record`) is generated from this one place.
macro_rules! scalar_field_registry {
    ($callback:ident) => {
        $callback! {
            title => "title",
            year => "year",
            month => "month",
            journal => "journal",
            booktitle => "booktitle",
            volume => "volume",
            number => "number",
            pages => "pages",
            chapter => "chapter",
            edition => "edition",
            series => "series",
            kind => "type",
            publisher => "publisher",
            address => "address",
            organization => "organization",
            school => "school",
            institution => "institution",
            howpublished => "howpublished",
            note => "note",
            doi => "doi",
            url => "url",
            ee => "ee",
            dblp_key => "dblpkey",
        }
    };
}
pub(crate) use scalar_field_registry;

macro_rules! field_name_table {
    ($($accessor:ident => $field:literal),* $(,)?) => {
        /// Names of every registered scalar field
        pub const SCALAR_FIELDS: &[&str] = &[$($field),*];
    };
}

scalar_field_registry!(field_name_table);

/// Required and optional fields of one category
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub required: &'static [FieldRequirement],
    pub optional: &'static [&'static str],
}

use FieldRequirement::{Field, OneOf};

const AUTHOR_OR_EDITOR: FieldRequirement = OneOf(&["author", "editor"]);

static EMPTY: FieldSchema = FieldSchema {
    required: &[],
    optional: &[],
};

static ARTICLE: FieldSchema = FieldSchema {
    required: &[Field("author"), Field("title"), Field("journal"), Field("year")],
    optional: &["volume", "number", "pages", "month", "note"],
};

static BOOK: FieldSchema = FieldSchema {
    required: &[AUTHOR_OR_EDITOR, Field("title"), Field("publisher"), Field("year")],
    optional: &["volume", "number", "series", "address", "edition", "month", "note"],
};

static BOOKLET: FieldSchema = FieldSchema {
    required: &[Field("title")],
    optional: &["author", "howpublished", "address", "month", "year", "note"],
};

static INBOOK: FieldSchema = FieldSchema {
    required: &[
        AUTHOR_OR_EDITOR,
        Field("title"),
        OneOf(&["chapter", "pages"]),
        Field("publisher"),
        Field("year"),
    ],
    optional: &["volume", "number", "series", "type", "address", "edition", "month", "note"],
};

static INCOLLECTION: FieldSchema = FieldSchema {
    required: &[
        Field("author"),
        Field("title"),
        Field("booktitle"),
        Field("publisher"),
        Field("year"),
    ],
    optional: &[
        "editor", "volume", "number", "series", "type", "chapter", "pages", "address", "edition",
        "month", "note",
    ],
};

static INPROCEEDINGS: FieldSchema = FieldSchema {
    required: &[Field("author"), Field("title"), Field("booktitle"), Field("year")],
    optional: &[
        "editor", "volume", "number", "series", "pages", "address", "month", "organization",
        "publisher", "note",
    ],
};

static MANUAL: FieldSchema = FieldSchema {
    required: &[Field("title")],
    optional: &["author", "organization", "address", "edition", "month", "year", "note"],
};

static THESIS: FieldSchema = FieldSchema {
    required: &[Field("author"), Field("title"), Field("school"), Field("year")],
    optional: &["type", "address", "month", "note"],
};

static MISC: FieldSchema = FieldSchema {
    required: &[],
    optional: &["author", "title", "howpublished", "month", "year", "note"],
};

static PROCEEDINGS: FieldSchema = FieldSchema {
    required: &[Field("title"), Field("year")],
    optional: &[
        "editor", "volume", "number", "series", "address", "month", "organization", "publisher",
        "note",
    ],
};

static TECHREPORT: FieldSchema = FieldSchema {
    required: &[Field("author"), Field("title"), Field("institution"), Field("year")],
    optional: &["type", "number", "address", "month", "note"],
};

static UNPUBLISHED: FieldSchema = FieldSchema {
    required: &[Field("author"), Field("title"), Field("note")],
    optional: &["month", "year"],
};

/// Schema for a category; `None` has no requirements at all
pub fn schema(category: Option<Category>) -> &'static FieldSchema {
    match category {
        None => &EMPTY,
        Some(Category::Article) => &ARTICLE,
        Some(Category::Book) => &BOOK,
        Some(Category::Booklet) => &BOOKLET,
        Some(Category::InBook) => &INBOOK,
        Some(Category::InCollection) => &INCOLLECTION,
        Some(Category::InProceedings) => &INPROCEEDINGS,
        Some(Category::Manual) => &MANUAL,
        Some(Category::MastersThesis) | Some(Category::PhdThesis) => &THESIS,
        Some(Category::Misc) => &MISC,
        Some(Category::Proceedings) => &PROCEEDINGS,
        Some(Category::TechReport) => &TECHREPORT,
        Some(Category::Unpublished) => &UNPUBLISHED,
    }
}

pub fn required_fields(category: Option<Category>) -> &'static [FieldRequirement] {
    schema(category).required
}

pub fn optional_fields(category: Option<Category>) -> &'static [&'static str] {
    schema(category).optional
}

/// Required fields (one-of sets flattened) followed by optional fields
pub fn relevant_fields(category: Option<Category>) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = Vec::new();
    let flattened = required_fields(category)
        .iter()
        .flat_map(|req| req.names().iter().copied());
    for name in flattened.chain(optional_fields(category).iter().copied()) {
        if !fields.contains(&name) {
            fields.push(name);
        }
    }
    fields
}

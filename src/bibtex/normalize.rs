//! Normalization of loosely structured text from external sources.
//!
//! Venue strings such as `"Commun. ACM (CACM) 55(2):103-111 (2012)"` or
//! `"TYPES 2004:1-20"` are matched against a short list of patterns, first
//! match wins. Text that matches nothing degrades to absent fields.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::Category;

/// Fields extracted from a conference venue string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceVenue {
    pub venue: String,
    pub year: String,
    pub pages: Option<String>,
}

/// Fields extracted from a journal venue string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalVenue {
    pub journal: String,
    pub volume: String,
    pub number: Option<String>,
    pub pages: Option<String>,
    pub year: String,
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("pattern is a valid regex"))
        }
    };
}

static_regex!(
    conference_with_pages,
    r"^(?P<venue>.+?)\s+(?P<year>\d{4}):\s*(?P<pages>\S.*?)\s*$"
);
static_regex!(conference_plain, r"^(?P<venue>.+?)\s+(?P<year>\d{4})\s*$");
static_regex!(
    journal_full,
    r"^(?P<journal>.+?)\s+(?P<volume>[^\s()]+)\((?P<number>[^)]*)\):\s*(?P<pages>[^\s()]+)\s*\((?P<year>\d{4})\)\s*$"
);
static_regex!(
    journal_no_number,
    r"^(?P<journal>.+?)\s+(?P<volume>[^\s():]+):\s*(?P<pages>[^\s()]+)\s*\((?P<year>\d{4})\)\s*$"
);
static_regex!(
    journal_no_pages,
    r"^(?P<journal>.+?)\s+(?P<volume>[^\s()]+)\((?P<number>[^)]*)\)\s*\((?P<year>\d{4})\)\s*$"
);
static_regex!(
    page_range,
    r"^\s*(?P<start>[^\s\-–—]+)\s*(?:-+|–|—)\s*(?P<end>[^\s\-–—]+)\s*$"
);
static_regex!(journal_abbreviation, r"^.+?\s*\((?P<abbr>[^()]+)\)\s*$");
static_regex!(html_entity, r"&#?[A-Za-z0-9]+;");

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Match `<venue> <year>:<pages>` then `<venue> <year>`
pub fn parse_conference_venue(text: &str) -> Option<ConferenceVenue> {
    let text = text.trim();
    let caps = conference_with_pages()
        .captures(text)
        .or_else(|| conference_plain().captures(text))?;

    Some(ConferenceVenue {
        venue: group(&caps, "venue")?,
        year: group(&caps, "year")?,
        pages: group(&caps, "pages").map(|p| normalize_pages(&p)),
    })
}

/// Match the three journal forms, most specific first
///
/// `<journal> <vol>(<num>):<pages> (<year>)`, then
/// `<journal> <vol>:<pages> (<year>)`, then `<journal> <vol>(<num>) (<year>)`.
pub fn parse_journal_venue(text: &str) -> Option<JournalVenue> {
    let text = text.trim();
    let caps = [journal_full(), journal_no_number(), journal_no_pages()]
        .into_iter()
        .find_map(|re| re.captures(text))?;

    Some(JournalVenue {
        journal: abbreviate_journal(&group(&caps, "journal")?),
        volume: group(&caps, "volume")?,
        number: group(&caps, "number"),
        pages: group(&caps, "pages").map(|p| normalize_pages(&p)),
        year: group(&caps, "year")?,
    })
}

/// `"103-111"` becomes `"103--111"`; anything else is returned unchanged
pub fn normalize_pages(pages: &str) -> String {
    match page_range().captures(pages) {
        Some(caps) => format!("{}--{}", &caps["start"], &caps["end"]),
        None => pages.to_string(),
    }
}

/// `"Communications of the ACM (CACM)"` becomes `"CACM"`
pub fn abbreviate_journal(journal: &str) -> String {
    match journal_abbreviation().captures(journal) {
        Some(caps) => caps["abbr"].trim().to_string(),
        None => journal.to_string(),
    }
}

/// Strip one trailing period and unescape HTML entities
///
/// Entities are resolved one at a time, so a bare `&` or an unknown entity
/// stays as written without blocking the others.
pub fn clean_title(title: &str) -> String {
    let title = title.trim();
    let title = title.strip_suffix('.').unwrap_or(title);
    html_entity()
        .replace_all(title, |caps: &Captures<'_>| {
            let entity = &caps[0];
            match quick_xml::escape::unescape(entity) {
                Ok(resolved) => resolved.into_owned(),
                Err(e) => {
                    tracing::debug!("Keeping entity '{}' in title: {}", entity, e);
                    entity.to_string()
                }
            }
        })
        .into_owned()
}

impl ConferenceVenue {
    pub fn into_fields(self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("booktitle".to_string(), self.venue);
        fields.insert("year".to_string(), self.year);
        if let Some(pages) = self.pages {
            fields.insert("pages".to_string(), pages);
        }
        fields
    }
}

impl JournalVenue {
    pub fn into_fields(self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("journal".to_string(), self.journal);
        fields.insert("volume".to_string(), self.volume);
        fields.insert("year".to_string(), self.year);
        if let Some(number) = self.number {
            fields.insert("number".to_string(), number);
        }
        if let Some(pages) = self.pages {
            fields.insert("pages".to_string(), pages);
        }
        fields
    }
}

/// Extract venue fields for a record of the given category
///
/// Articles use the journal patterns, proceedings-like entries the
/// conference patterns, everything else tries journal then conference.
/// An unmatched venue yields an empty map.
pub fn venue_fields(category: Option<Category>, venue: &str) -> BTreeMap<String, String> {
    let journal = || parse_journal_venue(venue).map(JournalVenue::into_fields);
    let conference = || parse_conference_venue(venue).map(ConferenceVenue::into_fields);

    let fields = match category {
        Some(Category::Article) => journal(),
        Some(Category::InProceedings | Category::InCollection | Category::Proceedings) => {
            conference()
        }
        _ => journal().or_else(conference),
    };

    fields.unwrap_or_else(|| {
        tracing::debug!("Unrecognized venue text '{}', leaving venue fields empty", venue);
        BTreeMap::new()
    })
}

//! Citation key generation.
//!
//! Keys have the shape `<surnames><yy><TitleWords>`, e.g. `Smith12Types`
//! or `SmithETAL12TypesProofsPrograms`.

use std::collections::HashSet;

use crate::models::{Record, SearchResult};

/// Title words ignored when building the title part of a key
const STOP_WORDS: &[&str] = &["", "in", "the", "a", "an", "of", "for", "and", "or", "by", "on", "with"];

/// More persons than this collapse to `<first>ETAL`
const MAX_LISTED_PERSONS: usize = 3;

/// Number of title words kept in the key
const MAX_TITLE_WORDS: usize = 6;

/// Generate the fallback citation key of a record
pub fn generate_key(record: &Record) -> String {
    let mut key = surname_part(record);
    key.push_str(&year_part(record.year()));
    key.push_str(&title_part(record.title()));
    key
}

fn ascii_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Last whitespace-delimited token of a name, ASCII letters and digits only
fn surname(person: &str) -> String {
    person
        .split_whitespace()
        .last()
        .map(ascii_alphanumeric)
        .unwrap_or_default()
}

fn surname_part(record: &Record) -> String {
    let persons = if !record.authors().is_empty() {
        record.authors()
    } else {
        record.editors()
    };

    if persons.len() > MAX_LISTED_PERSONS {
        format!("{}ETAL", surname(&persons[0]))
    } else {
        persons.iter().map(|p| surname(p)).collect()
    }
}

fn year_part(year: Option<&str>) -> String {
    year.and_then(|y| y.trim().parse::<i64>().ok())
        .map(|y| format!("{:02}", y.rem_euclid(100)))
        .unwrap_or_default()
}

fn title_part(title: Option<&str>) -> String {
    let Some(title) = title else {
        return String::new();
    };

    title
        .split(' ')
        .map(ascii_alphanumeric)
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .map(|word| capitalize(&word))
        .take(MAX_TITLE_WORDS)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Give every unkeyed result its generated key
///
/// A generated key that is already taken in the collection gets a
/// lowercase suffix (`b`, `c`, ...); declared keys are left untouched.
pub fn assign_missing_keys(results: &mut [SearchResult]) {
    let mut taken: HashSet<String> = results
        .iter()
        .filter_map(|r| r.record.key.clone())
        .collect();

    for result in results.iter_mut().filter(|r| r.record.key.is_none()) {
        let base = generate_key(&result.record);
        let key = disambiguate(&base, &taken);
        taken.insert(key.clone());
        result.record.assign_key(key);
    }
}

fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    ('b'..='z')
        .map(|suffix| format!("{base}{suffix}"))
        .chain((2..).map(|n| format!("{base}_{n}")))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

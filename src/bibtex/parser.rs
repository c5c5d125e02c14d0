//! BibTeX parser built on nom.
//!
//! Handles `@string` macros (expanded in later values), `@preamble` and
//! `@comment` blocks, braced, quoted, numeric and macro values joined with
//! `#`, nested braces and `%` line comments between entries.
//!
//! Parsing is a stream: a malformed entry is reported to the caller's sink
//! and skipped, and the stream resumes at the next `@`.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use std::collections::HashMap;

use super::latex;
use super::VERBATIM_FIELDS;
use crate::models::{Category, Record, RecordError};

/// Errors produced while reading a single entry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The entry text does not follow BibTeX syntax
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// The entry parsed but its fields are inconsistent
    #[error("line {line}: {source}")]
    Record { line: usize, source: RecordError },

    /// The input contains no entry
    #[error("no BibTeX entry found")]
    Empty,
}

/// An entry as written, before decoding and classification
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawEntry {
    entry_type: String,
    key: String,
    fields: Vec<(String, String)>,
}

enum AtBlock {
    Entry(RawEntry),
    String(String, String),
    Preamble,
    Comment,
}

/// Iterator over the records of one BibTeX text
///
/// Every problem is passed to `sink` as a human readable message.
pub struct RecordStream<'a, F>
where
    F: FnMut(&str),
{
    remaining: &'a str,
    line: usize,
    strings: HashMap<String, String>,
    auxiliary: usize,
    sink: F,
}

impl<'a, F> RecordStream<'a, F>
where
    F: FnMut(&str),
{
    pub fn new(input: &'a str, sink: F) -> Self {
        Self {
            remaining: input,
            line: 1,
            strings: HashMap::new(),
            auxiliary: 0,
            sink,
        }
    }

    /// Number of `@string`, `@preamble` and `@comment` blocks read so far
    ///
    /// These produce no record, so rendering the parsed records drops them.
    pub fn auxiliary_blocks(&self) -> usize {
        self.auxiliary
    }

    fn advance_to(&mut self, rest: &'a str) {
        let consumed = &self.remaining[..self.remaining.len() - rest.len()];
        self.line += consumed.matches('\n').count();
        self.remaining = rest;
    }

    /// Skip past the current `@` to the next one, or to the end
    fn skip_block(&mut self) {
        let rest = match self.remaining.get(1..).and_then(|s| s.find('@')) {
            Some(pos) => &self.remaining[pos + 1..],
            None => &self.remaining[self.remaining.len()..],
        };
        self.advance_to(rest);
    }

    /// Parse up to the next entry, reporting it or its error
    fn next_entry(&mut self) -> Option<Result<Record, ParseError>> {
        loop {
            let rest = skip_whitespace_and_comments(self.remaining);
            self.advance_to(rest);

            if self.remaining.is_empty() {
                return None;
            }

            if !self.remaining.starts_with('@') {
                // stray text between entries is ignored like BibTeX does
                let rest = match self.remaining.find('@') {
                    Some(pos) => &self.remaining[pos..],
                    None => &self.remaining[self.remaining.len()..],
                };
                self.advance_to(rest);
                continue;
            }

            let line = self.line;
            match parse_at_block(self.remaining, &self.strings) {
                Ok((rest, block)) => {
                    self.advance_to(rest);
                    match block {
                        AtBlock::Entry(raw) => return Some(into_record(raw, line)),
                        AtBlock::String(name, value) => {
                            self.auxiliary += 1;
                            self.strings.insert(name.to_lowercase(), value);
                        }
                        AtBlock::Preamble | AtBlock::Comment => self.auxiliary += 1,
                    }
                }
                Err(_) => {
                    let message = format!("malformed entry near '{}'", snippet(self.remaining));
                    self.skip_block();
                    return Some(Err(ParseError::Syntax { line, message }));
                }
            }
        }
    }
}

impl<F> Iterator for RecordStream<'_, F>
where
    F: FnMut(&str),
{
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            match self.next_entry()? {
                Ok(record) => return Some(record),
                Err(e) => (self.sink)(&e.to_string()),
            }
        }
    }
}

/// Parse every well-formed record of `input`, reporting problems to `sink`
pub fn parse_records<F>(input: &str, sink: F) -> Vec<Record>
where
    F: FnMut(&str),
{
    RecordStream::new(input, sink).collect()
}

/// Parse the first entry of `input`
pub fn parse_record(input: &str) -> Result<Record, ParseError> {
    let mut stream = RecordStream::new(input, |_: &str| {});
    stream.next_entry().unwrap_or(Err(ParseError::Empty))
}

fn snippet(text: &str) -> String {
    text.lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect()
}

fn into_record(raw: RawEntry, line: usize) -> Result<Record, ParseError> {
    let fields = raw.fields.into_iter().map(|(name, value)| {
        let name = name.to_lowercase();
        let value = if VERBATIM_FIELDS.contains(&name.as_str()) {
            value
        } else {
            latex::decode(&value)
        };
        (name, value)
    });

    let key = Some(raw.key).filter(|k| !k.is_empty());
    Record::import_from(Category::from_name(&raw.entry_type), key, fields)
        .map_err(|source| ParseError::Record { line, source })
}

/// Skip whitespace and `%` line comments
fn skip_whitespace_and_comments(input: &str) -> &str {
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        if let Some(comment) = trimmed.strip_prefix('%') {
            rest = comment.find('\n').map_or("", |pos| &comment[pos..]);
        } else {
            return trimmed;
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-:.+/".contains(c)
}

fn is_key_char(c: char) -> bool {
    !c.is_whitespace() && !",{}()\"#%'=".contains(c)
}

fn parse_at_block<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, AtBlock> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, entry_type) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;
    let (rest, _) = multispace0(rest)?;

    match entry_type.to_lowercase().as_str() {
        "string" => {
            let (rest, _) = char('{')(rest)?;
            let (rest, (name, value)) = parse_field(rest, strings)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = char('}')(rest)?;
            Ok((rest, AtBlock::String(name, value)))
        }
        "preamble" => {
            let (rest, _) = braced(rest)?;
            Ok((rest, AtBlock::Preamble))
        }
        "comment" => {
            if rest.starts_with('{') {
                let (rest, _) = braced(rest)?;
                Ok((rest, AtBlock::Comment))
            } else {
                let end = rest.find('\n').unwrap_or(rest.len());
                Ok((&rest[end..], AtBlock::Comment))
            }
        }
        _ => {
            let (rest, entry) = parse_entry_body(rest, entry_type, strings)?;
            Ok((rest, AtBlock::Entry(entry)))
        }
    }
}

fn parse_entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, RawEntry> {
    let (rest, _) = char('{')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, key) = take_while(is_key_char)(rest)?;
    let (rest, _) = multispace0(rest)?;

    let mut fields = Vec::new();
    let mut remaining = rest;
    loop {
        let (rest, _) = multispace0(remaining)?;
        if let Some(rest) = rest.strip_prefix('}') {
            return Ok((
                rest,
                RawEntry {
                    entry_type: entry_type.to_string(),
                    key: key.to_string(),
                    fields,
                },
            ));
        }

        // every field, including the first, follows a comma
        let (rest, _) = char(',')(rest)?;
        let (rest, _) = multispace0(rest)?;
        if rest.starts_with('}') {
            remaining = rest;
            continue;
        }

        let (rest, field) = parse_field(rest, strings)?;
        fields.push(field);
        remaining = rest;
    }
}

/// `name = value`
fn parse_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, name) = take_while1(is_name_char)(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, value) = parse_value(rest, strings)?;
    Ok((rest, (name.to_string(), value)))
}

/// One or more value pieces joined with `#`
fn parse_value<'a>(input: &'a str, strings: &HashMap<String, String>) -> IResult<&'a str, String> {
    let mut value = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        let (rest, piece) = alt((
            map(braced, str::to_string),
            map(quoted, str::to_string),
            map(take_while1(|c: char| c.is_ascii_digit()), str::to_string),
            map(take_while1(is_name_char), |name: &str| {
                strings
                    .get(&name.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            }),
        ))(rest)?;
        value.push_str(&piece);

        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(next) => remaining = next,
            None => return Ok((rest, collapse_line_breaks(&value))),
        }
    }
}

/// Content of a `{...}` group, nested and escaped braces allowed
fn braced(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('{')(input)?;
    let end = scan_delimited(body, '}')
        .ok_or_else(|| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))?;
    Ok((&body[end + 1..], &body[..end]))
}

/// Content of a `"..."` value; quotes inside braces do not terminate it
fn quoted(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('"')(input)?;
    let end = scan_delimited(body, '"')
        .ok_or_else(|| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))?;
    Ok((&body[end + 1..], &body[..end]))
}

/// Byte offset of the closing delimiter at brace depth zero
fn scan_delimited(body: &str, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = body.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c == close && depth == 0 => return Some(pos),
            '{' => depth += 1,
            '}' => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    None
}

/// Fold line breaks (and the indentation around them) into single spaces
fn collapse_line_breaks(value: &str) -> String {
    if !value.contains('\n') {
        return value.to_string();
    }
    value
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_entry() {
        let record = parse_record(
            r#"@article{Smith12Types,
  title = {Types for {ML}},
  author = {John Smith and Ann Jones},
  journal = "CACM",
  year = 2012
}"#,
        )
        .unwrap();

        assert_eq!(record.category, Some(Category::Article));
        assert_eq!(record.key.as_deref(), Some("Smith12Types"));
        assert_eq!(record.title(), Some("Types for {ML}"));
        assert_eq!(record.authors(), &["John Smith", "Ann Jones"]);
        assert_eq!(record.journal(), Some("CACM"));
        assert_eq!(record.year(), Some("2012"));
    }

    #[test]
    fn test_string_macros_and_concatenation() {
        let input = r#"
@string{ popl = "Principles of Programming Languages" }
@inproceedings{k, booktitle = "Proc. " # POPL # { 2012}, title = {T}}
"#;
        let mut stream = RecordStream::new(input, |m: &str| panic!("{m}"));
        let records: Vec<Record> = stream.by_ref().collect();
        assert_eq!(stream.auxiliary_blocks(), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].booktitle(),
            Some("Proc. Principles of Programming Languages 2012")
        );
    }

    #[test]
    fn test_comments_and_preamble_are_skipped() {
        let input = r#"
% a line comment @misc{not, title = {entry}}
@preamble{ "\newcommand{\noop}[1]{}" }
@comment{ @misc{hidden, title = {x}} }
Free text between entries.
@misc{visible, title = {Shown}}
"#;
        let mut stream = RecordStream::new(input, |m: &str| panic!("{m}"));
        let records: Vec<Record> = stream.by_ref().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_deref(), Some("visible"));
        assert_eq!(stream.auxiliary_blocks(), 2);
    }

    #[test]
    fn test_malformed_entry_is_reported_and_skipped() {
        let input = "@article{good1, title = {One}}\n\n@article{bad, title = {unclosed}\n\n@article{good2, title = {Two}}\n";
        let mut errors = Vec::new();
        let records = parse_records(input, |m: &str| errors.push(m.to_string()));

        let keys: Vec<_> = records.iter().filter_map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec!["good1", "good2"]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("line 3:"), "{}", errors[0]);
    }

    #[test]
    fn test_empty_author_is_malformed() {
        let mut errors = Vec::new();
        let records = parse_records(
            "@article{x, author = { and }}\n@misc{y, title = {ok}}",
            |m: &str| errors.push(m.to_string()),
        );
        assert_eq!(records.len(), 1);
        assert!(errors[0].contains("author"));

        let err = parse_record("@article{x, author = {}}").unwrap_err();
        assert!(matches!(err, ParseError::Record { line: 1, .. }));
    }

    #[test]
    fn test_decodes_accents_but_not_urls() {
        let record = parse_record(
            r#"@misc{g, author = {Kurt G{\"o}del}, url = {http://x.org/G\"odel%20a}}"#,
        )
        .unwrap();
        assert_eq!(record.authors(), &["Kurt Gödel"]);
        assert_eq!(record.url(), Some("http://x.org/G\\\"odel%20a"));
    }

    #[test]
    fn test_unknown_type_and_missing_key() {
        let record = parse_record("@software{, title = {Tool},}").unwrap();
        assert_eq!(record.category, None);
        assert_eq!(record.key, None);
        assert_eq!(record.title(), Some("Tool"));
    }

    #[test]
    fn test_multiline_value() {
        let record = parse_record("@misc{m, title = {A long\n      title}}").unwrap();
        assert_eq!(record.title(), Some("A long title"));
    }

    #[test]
    fn test_escaped_braces_in_value() {
        let record = parse_record(r"@misc{m, note = {a \} b}}").unwrap();
        assert_eq!(record.note(), Some("a } b"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_record("  % nothing\n"), Err(ParseError::Empty));
    }
}

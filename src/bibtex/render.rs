//! BibTeX rendering.

use std::collections::BTreeSet;

use super::latex;
use super::VERBATIM_FIELDS;
use crate::models::{optional_fields, required_fields, Record};

/// Fields printed first, in this order, when present
const DISPLAY_ORDER: &[&str] = &["title", "author", "editor", "booktitle", "journal", "year"];

/// Field names of `record` in output order
///
/// Each pass appends the fields it names that are present and not yet
/// emitted; the last pass takes whatever is left, sorted.
pub fn field_order(record: &Record) -> Vec<String> {
    let mut required: Vec<&str> = required_fields(record.category)
        .iter()
        .flat_map(|req| req.names().iter().copied())
        .collect();
    required.sort_unstable();

    let mut optional: Vec<&str> = optional_fields(record.category).to_vec();
    optional.sort_unstable();

    let passes: [Vec<&str>; 3] = [DISPLAY_ORDER.to_vec(), required, optional];
    let remaining: BTreeSet<&str> = record.fields();

    let (mut emitted, remaining) = passes.iter().fold(
        (Vec::new(), remaining),
        |(mut emitted, mut remaining): (Vec<String>, BTreeSet<&str>), pass| {
            for name in pass {
                if remaining.remove(name) {
                    emitted.push(name.to_string());
                }
            }
            (emitted, remaining)
        },
    );

    // BTreeSet iteration is already sorted
    emitted.extend(remaining.into_iter().map(str::to_string));
    emitted
}

fn render_value(name: &str, value: &str) -> String {
    if VERBATIM_FIELDS.contains(&name) {
        value.to_string()
    } else {
        latex::encode(value)
    }
}

/// Render one record as a BibTeX entry
pub fn render_record(record: &Record) -> String {
    let lines: Vec<String> = field_order(record)
        .into_iter()
        .filter_map(|name| {
            let value = record.get(&name)?;
            Some(format!("  {} = {{{}}}", name, render_value(&name, &value)))
        })
        .collect();

    let mut out = format!("@{}{{{}", record.effective_category().name(), record.effective_key());
    for line in &lines {
        out.push_str(",\n");
        out.push_str(line);
    }
    out.push_str("\n}");
    out
}

/// Render records separated by one blank line
pub fn render_collection<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .map(render_record)
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Record equivalence and deduplication.

use std::collections::HashSet;

use super::key::generate_key;
use crate::models::Record;

/// Strategy for handling duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Keep the first occurrence of each duplicate group
    First,
    /// Keep the last occurrence of each duplicate group
    Last,
    /// Keep all records but report the groups
    Mark,
}

/// Fields that corroborate a title match
const CORROBORATING_FIELDS: &[&str] = &["year", "journal", "booktitle"];

/// Check whether two records describe the same work
///
/// Signals are tried strongest first: structural equality, DOI, DBLP key,
/// declared citation key, generated key, and finally an equal title backed
/// by an equal year, journal or booktitle.
pub fn are_equivalent(a: &Record, b: &Record) -> bool {
    if a == b {
        return true;
    }

    if both_equal(a.doi(), b.doi()) {
        return true;
    }

    if both_equal(a.dblp_key(), b.dblp_key()) {
        return true;
    }

    if both_equal(a.key.as_deref(), b.key.as_deref()) {
        return true;
    }

    let generated = generate_key(a);
    if !generated.is_empty() && generated == generate_key(b) {
        return true;
    }

    both_equal(a.title(), b.title())
        && CORROBORATING_FIELDS
            .iter()
            .any(|field| both_equal(a.scalar(field), b.scalar(field)))
}

fn both_equal(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Find groups of equivalent records
///
/// Returns groups (of size two or more) of record indices, each group in
/// ascending order and anchored on its first member.
pub fn find_duplicates(records: &[Record]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for i in 0..records.len() {
        if processed.contains(&i) {
            continue;
        }

        let mut group = vec![i];
        for (j, other) in records.iter().enumerate().skip(i + 1) {
            if processed.contains(&j) {
                continue;
            }
            if are_equivalent(&records[i], other) {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
        processed.insert(i);
    }

    groups
}

/// Remove duplicate records from a list
///
/// # Arguments
/// * `records` - The records to deduplicate
/// * `strategy` - Which member of each duplicate group survives
pub fn deduplicate_records(records: Vec<Record>, strategy: DuplicateStrategy) -> Vec<Record> {
    let groups = find_duplicates(&records);
    if groups.is_empty() || strategy == DuplicateStrategy::Mark {
        return records;
    }

    let mut to_remove: HashSet<usize> = HashSet::new();
    for group in groups {
        let keep = match strategy {
            DuplicateStrategy::Last => group[group.len() - 1],
            _ => group[0],
        };
        to_remove.extend(group.into_iter().filter(|idx| *idx != keep));
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !to_remove.contains(i))
        .map(|(_, r)| r)
        .collect()
}

//! Merging of per-source result lists into one ranked list.

use std::collections::{BTreeSet, HashMap};

use super::dedup::are_equivalent;
use crate::models::{SearchResult, SourceTag};

/// Order in which sources are visited
///
/// Tags named in `priority` come first (each once), followed by any other
/// source present in `results`, in tag order.
fn visit_order<'a>(
    results: &'a HashMap<SourceTag, Vec<SearchResult>>,
    priority: &'a [SourceTag],
) -> Vec<&'a SourceTag> {
    let mut seen: BTreeSet<&SourceTag> = BTreeSet::new();
    let mut order: Vec<&SourceTag> = priority.iter().filter(|tag| seen.insert(*tag)).collect();

    let mut rest: Vec<&SourceTag> = results.keys().filter(|tag| !seen.contains(tag)).collect();
    rest.sort();
    order.extend(rest);
    order
}

/// Fold a candidate into the accepted list
///
/// The first equivalent accepted result absorbs the candidate; otherwise
/// the candidate is appended.
fn absorb(accepted: &mut Vec<SearchResult>, candidate: SearchResult) {
    match accepted
        .iter()
        .position(|existing| are_equivalent(&existing.record, &candidate.record))
    {
        Some(idx) => {
            let existing = accepted[idx].clone();
            accepted[idx] = existing.merge(candidate);
        }
        None => accepted.push(candidate),
    }
}

fn sort_by_score(results: &mut [SearchResult]) {
    // sort_by is stable, so equal scores keep discovery order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Combine the result lists of several sources
///
/// Earlier sources in `priority` keep their record when an equivalent one
/// shows up later; only the source set and the score are merged in.
pub fn consolidate(
    results: &HashMap<SourceTag, Vec<SearchResult>>,
    priority: &[SourceTag],
) -> Vec<SearchResult> {
    let mut accepted: Vec<SearchResult> = Vec::new();

    for tag in visit_order(results, priority) {
        let Some(list) = results.get(tag) else {
            continue;
        };
        for candidate in list {
            absorb(&mut accepted, candidate.clone());
        }
    }

    sort_by_score(&mut accepted);
    accepted
}

/// Replace results by equivalent updates
///
/// Each current result whose record is equivalent to an update takes the
/// update's record, with sources united and the higher score. Updates that
/// match nothing are appended; current results without an update are kept.
pub fn replace_results(current: Vec<SearchResult>, updates: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut pending: Vec<Option<SearchResult>> = updates.into_iter().map(Some).collect();

    let mut replaced: Vec<SearchResult> = current
        .into_iter()
        .map(|result| {
            let matching = pending.iter_mut().find(|update| {
                update
                    .as_ref()
                    .is_some_and(|u| are_equivalent(&u.record, &result.record))
            });
            match matching.and_then(Option::take) {
                Some(update) => update.merge(result),
                None => result,
            }
        })
        .collect();

    replaced.extend(pending.into_iter().flatten());
    replaced
}

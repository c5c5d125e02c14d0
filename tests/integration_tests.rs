//! Integration tests for bib-master
//!
//! These tests exercise the public API end to end: parsing and rendering,
//! key generation, equivalence, consolidation and the source registry.

use bib_master::bibtex::normalize::{parse_journal_venue, venue_fields};
use bib_master::bibtex::{parse_record, parse_records, render_collection, render_record};
use bib_master::models::{Category, Record, RecordBuilder, SearchResult, SourceTag};
use bib_master::sources::{LocalFileSource, MockSource, SourceRegistry};
use bib_master::utils::{are_equivalent, consolidate, generate_key};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn sample_records() -> Vec<Record> {
    vec![
        RecordBuilder::new(Category::Article)
            .key("Smith12Types")
            .authors(["John Smith", "Ann Jones"])
            .title("Types & Proofs")
            .field("journal", "CACM")
            .field("volume", "55")
            .field("pages", "103--111")
            .field("url", "https://example.org/a_b?x=1&y=2")
            .year("2012")
            .build(),
        RecordBuilder::new(Category::Proceedings)
            .key("TYPES04")
            .editors(["Stefano Berardi", "Mario Coppo"])
            .title("Types for Proofs and Programs")
            .field("publisher", "Springer")
            .field("series", "LNCS")
            .year("2004")
            .build(),
        RecordBuilder::untyped()
            .key("odd")
            .field("howpublished", "{Web} page")
            .build(),
        RecordBuilder::new(Category::Misc)
            .key("paths")
            .title("Set {x | x > 0")
            .field("note", "C:\\temp\\ and }{")
            .build(),
    ]
}

#[test]
fn test_round_trip() {
    for record in sample_records() {
        let text = render_record(&record);
        let parsed = parse_record(&text).unwrap();

        assert_eq!(parsed.effective_category(), record.effective_category());
        assert_eq!(parsed.key, record.key);
        assert_eq!(parsed.scalar_fields, record.scalar_fields);
        assert_eq!(parsed.person_fields, record.person_fields);
    }
}

#[test]
fn test_render_is_idempotent() {
    for record in sample_records() {
        let once = render_record(&record);
        assert_eq!(render_record(&record), once);

        let reparsed = parse_record(&once).unwrap();
        assert_eq!(render_record(&reparsed), once);
    }
}

#[test]
fn test_collection_round_trip() {
    let records = sample_records();
    let text = render_collection(&records);

    let mut errors = Vec::new();
    let parsed = parse_records(&text, |m: &str| errors.push(m.to_string()));

    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(parsed.len(), records.len());
    assert_eq!(render_collection(&parsed), text);
}

#[test]
fn test_key_determinism() {
    let a = RecordBuilder::new(Category::Article)
        .authors(["John Smith"])
        .year("2012")
        .title("Types")
        .build();
    let b = RecordBuilder::new(Category::Article)
        .authors(["John Smith"])
        .year("2013")
        .title("Types")
        .build();

    assert_eq!(generate_key(&a), generate_key(&a.clone()));
    assert_ne!(generate_key(&a), generate_key(&b));
}

#[test]
fn test_et_al_key() {
    let record = RecordBuilder::new(Category::Article)
        .authors(["A Smith", "B Jones", "C Lee", "D Park"])
        .year("2012")
        .build();
    assert!(generate_key(&record).starts_with("SmithETAL12"));
}

#[test]
fn test_equivalence_is_symmetric() {
    let mut records = sample_records();
    records.push(
        RecordBuilder::new(Category::Article)
            .authors(["John Smith", "Ann Jones"])
            .title("Types & Proofs")
            .year("2012")
            .build(),
    );
    records.push(RecordBuilder::new(Category::Misc).title("Types & Proofs").build());

    for a in &records {
        for b in &records {
            assert_eq!(are_equivalent(a, b), are_equivalent(b, a));
        }
    }
}

#[test]
fn test_title_alone_does_not_merge() {
    let tagged = RecordBuilder::new(Category::InProceedings)
        .title("Types for Proofs and Programs")
        .year("2004")
        .build();
    let untagged = RecordBuilder::new(Category::InProceedings)
        .title("Types for Proofs and Programs")
        .build();
    assert!(!are_equivalent(&tagged, &untagged));

    let mut results = HashMap::new();
    results.insert(
        SourceTag::Local,
        vec![SearchResult::new(tagged.clone(), SourceTag::Local, 0.9)],
    );
    results.insert(
        SourceTag::Dblp,
        vec![SearchResult::new(untagged.clone(), SourceTag::Dblp, 0.8)],
    );
    assert_eq!(consolidate(&results, &[SourceTag::Local, SourceTag::Dblp]).len(), 2);

    let tagged = RecordBuilder::new(Category::InProceedings)
        .title("Types for Proofs and Programs")
        .year("2004")
        .doi("10.1007/b100654")
        .build();
    let untagged = RecordBuilder::new(Category::InProceedings)
        .title("Types for Proofs and Programs")
        .doi("10.1007/b100654")
        .build();
    assert!(are_equivalent(&tagged, &untagged));
}

#[test]
fn test_consolidation_idempotence() {
    let list: Vec<SearchResult> = sample_records()
        .into_iter()
        .map(|r| SearchResult::new(r, SourceTag::Dblp, 0.5))
        .collect();

    let mut once = HashMap::new();
    once.insert(SourceTag::Dblp, list.clone());
    let single = consolidate(&once, &[SourceTag::Dblp]);

    let mut twice = HashMap::new();
    twice.insert(SourceTag::Dblp, [list.clone(), list].concat());
    let doubled = consolidate(&twice, &[SourceTag::Dblp, SourceTag::Dblp]);

    assert_eq!(doubled.len(), single.len());
    for result in &doubled {
        assert_eq!(result.source_list(), "dblp");
    }
}

#[test]
fn test_cacm_venue() {
    let venue = parse_journal_venue("Commun. ACM (CACM) 55(2):103-111 (2012)").unwrap();
    assert_eq!(venue.journal, "CACM");
    assert_eq!(venue.volume, "55");
    assert_eq!(venue.number.as_deref(), Some("2"));
    assert_eq!(venue.pages.as_deref(), Some("103--111"));
    assert_eq!(venue.year, "2012");

    let fields = venue_fields(Some(Category::Article), "Commun. ACM (CACM) 55(2):103-111 (2012)");
    assert_eq!(fields.len(), 5);
}

#[test]
fn test_article_validity() {
    let mut record = RecordBuilder::new(Category::Article)
        .authors(["John Smith"])
        .title("Types")
        .year("2012")
        .build();
    assert!(!record.is_valid());

    record.set("journal", "CACM").unwrap();
    assert!(record.is_valid());
}

#[tokio::test]
async fn test_search_pipeline_with_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.bib");
    std::fs::write(
        &path,
        "@inproceedings{Berardi04,\n  title = {Types for Proofs and Programs},\n  author = {Stefano Berardi},\n  booktitle = {TYPES},\n  year = {2004}\n}\n",
    )
    .unwrap();

    let remote = RecordBuilder::new(Category::InProceedings)
        .authors(["Stefano Berardi"])
        .title("Types for Proofs and Programs")
        .field("booktitle", "TYPES")
        .field("dblpkey", "conf/types/Berardi04")
        .year("2004")
        .build();
    let dblp = MockSource::new(SourceTag::Dblp);
    dblp.set_results(vec![SearchResult::new(remote, SourceTag::Dblp, 1.0)]);

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(LocalFileSource::new(&path)));
    registry.register(Arc::new(dblp));

    let terms = vec!["types".to_string(), "berardi".to_string()];
    let by_source = registry.search_all(&terms, Duration::from_secs(5)).await;
    let merged = consolidate(&by_source, &[SourceTag::Local, SourceTag::Dblp]);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].record.key.as_deref(), Some("Berardi04"));
    assert_eq!(merged[0].source_list(), "local,dblp");
    assert_eq!(merged[0].score, 1.0);
}

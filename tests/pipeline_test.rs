//! End-to-end pipeline tests against an in-memory query service

mod common;

use rand::rngs::mock::StepRng;
use std::collections::BTreeMap;

use common::{q, FakeWikidata, Membership};
use wdgraph::config::{ClassConfig, ClassSpec};
use wdgraph::graph::{Graph, Object, Predicate};
use wdgraph::models::{PropertyRef, SubjectRecord};
use wdgraph::pipeline::{load_subjects, write_subjects, Pipeline, SkipReason};
use wdgraph::sparql::QueryKind;

fn subject(id: &str, class: &str) -> SubjectRecord {
    SubjectRecord::new(q(id), class)
}

/// Q42: two edges, one to a member of the country
/// Q43: edges only to non-members
/// Q44: no edges at all
fn fake() -> FakeWikidata {
    FakeWikidata::new()
        .with_edges("Q42", &[("P27", "Q30"), ("P19", "Q84"), ("P106", "Q36180")])
        .with_edges("Q43", &[("P19", "Q84")])
        .with_membership(Membership::new(&["Q30"], &["Q36180"], &[]))
        .with_label("Q42", "Ada Ejemplo")
        .with_label("Q30", "Estados Unidos")
}

#[tokio::test]
async fn test_end_to_end_run() {
    let dir = tempfile::tempdir().unwrap();
    let fake = fake();
    let pipeline = Pipeline::new(&fake, dir.path().join("us"));

    let subjects = vec![
        subject("Q42", "writer"),
        subject("Q43", "writer"),
        subject("Q44", "writer"),
    ];
    let summary = pipeline
        .run(&subjects, &q("Q30"), &mut StepRng::new(0, 0))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.skipped_by_reason[&SkipReason::NoCountryEdges], 1);
    assert_eq!(summary.skipped_by_reason[&SkipReason::NoEdges], 1);
    assert_eq!(summary.sampled_dir, None);

    let path = dir.path().join("us").join("full").join("Q42.ttl");
    let graph = Graph::from_turtle(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(graph.subject, q("Q42"));
    assert_eq!(graph.edge_count(), 2);

    let objects: Vec<_> = graph
        .triples
        .iter()
        .filter_map(|t| match (&t.predicate, &t.object) {
            (Predicate::Direct(_), Object::Entity(o)) => Some(o.as_str()),
            _ => None,
        })
        .collect();
    assert!(objects.contains(&"Q30"));
    assert!(objects.contains(&"Q36180"));
    assert!(!objects.contains(&"Q84"));

    // only entities with a real label get one
    let labelled: Vec<_> = graph
        .triples
        .iter()
        .filter(|t| t.predicate == Predicate::Label)
        .map(|t| t.subject.as_str())
        .collect();
    assert_eq!(labelled, vec!["Q30", "Q42"]);

    assert!(!dir.path().join("us").join("full").join("Q43.ttl").exists());
    assert!(!dir.path().join("us").join("sampled").exists());
}

#[tokio::test]
async fn test_filter_failure_skips_subject_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let mut fake = fake().with_edges("Q50", &[("P27", "Q666")]);
    fake.poison.insert("Q666".to_string());
    fake.broken_subjects.insert("Q51".to_string());

    let pipeline = Pipeline::new(&fake, dir.path());
    let subjects = vec![
        subject("Q50", "writer"),
        subject("Q51", "writer"),
        subject("Q42", "writer"),
    ];

    let summary = pipeline
        .run(&subjects, &q("Q30"), &mut StepRng::new(0, 0))
        .await
        .unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.skipped_by_reason[&SkipReason::FilterFailed], 1);
    assert_eq!(summary.skipped_by_reason[&SkipReason::ExtractionFailed], 1);
    assert!(dir.path().join("full").join("Q42.ttl").exists());
    assert!(!dir.path().join("full").join("Q50.ttl").exists());
}

#[tokio::test]
async fn test_sampled_output_duplicates_full() {
    let dir = tempfile::tempdir().unwrap();
    let fake = fake();

    let spec = ClassSpec {
        occupations: Vec::new(),
        weights: BTreeMap::from([(PropertyRef::parse("P27").unwrap(), 1.0)]),
        max_props: Some(1),
    };
    let classes = ClassConfig::new(BTreeMap::from([("writer".to_string(), spec)]));

    let pipeline = Pipeline::new(&fake, dir.path()).class_config(Some(classes));
    let summary = pipeline
        .run(&[subject("Q42", "writer")], &q("Q30"), &mut StepRng::new(0, 0))
        .await
        .unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.sampled_dir, Some(dir.path().join("sampled")));

    let full = std::fs::read_to_string(dir.path().join("full").join("Q42.ttl")).unwrap();
    let sampled = std::fs::read_to_string(dir.path().join("sampled").join("Q42.ttl")).unwrap();
    assert_eq!(full, sampled);

    // max_props = 1 keeps only the highest weighted property
    let graph = Graph::from_turtle(&full).unwrap();
    assert_eq!(graph.edge_count(), 1);
    assert!(full.contains("wd:Q42 wdt:P27 wd:Q30 ."));
}

#[tokio::test]
async fn test_empty_subject_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fake = fake();
    let pipeline = Pipeline::new(&fake, dir.path());

    let result = pipeline.run(&[], &q("Q30"), &mut StepRng::new(0, 0)).await;

    assert!(result.is_err());
    assert!(fake.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_labels_cover_subject_and_objects() {
    let dir = tempfile::tempdir().unwrap();
    let fake = fake();
    let pipeline = Pipeline::new(&fake, dir.path()).label_batch_size(1);

    pipeline
        .run(&[subject("Q42", "writer")], &q("Q30"), &mut StepRng::new(0, 0))
        .await
        .unwrap();

    // subject + 2 surviving objects, one per batch
    assert_eq!(fake.calls_of(QueryKind::Labels), 3);
}

#[tokio::test]
async fn test_subjects_csv_feeds_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("data").join("subjects_us.csv");
    write_subjects(&csv, &[subject("Q42", "writer"), subject("Q44", "writer")]).unwrap();

    let subjects = load_subjects(&csv).unwrap();
    let fake = fake();
    let summary = Pipeline::new(&fake, dir.path().join("graphs"))
        .run(&subjects, &q("Q30"), &mut StepRng::new(0, 0))
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.persisted, 1);
}

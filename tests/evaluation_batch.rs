mod common;

use std::fs;
use std::path::PathBuf;

use ppe_monitor::api::{ApiError, HumanReview};
use ppe_monitor::classifier::{ClassificationResult, Label};
use ppe_monitor::evaluation::{Evaluation, EvaluationSet, EvaluationSummary, court_target, ppe_target};
use ppe_monitor::images::list_images;

use common::{FakeClassifier, detector};

fn seed_images(dir: &std::path::Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"\xFF\xD8\xFF\xE0fake-jpeg").unwrap();
    }
}

#[test]
fn every_matching_image_is_submitted_once_in_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    seed_images(dir.path(), &["a.jpg", "b.jpg", "c.jpg"]);
    fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
    fs::create_dir(dir.path().join("nested.jpg")).unwrap();

    let target = ppe_target();
    let detector = detector(&target.detector);
    let classifier = FakeClassifier::always("YES", 0.91, 3);

    let summary = Evaluation::new(&classifier, &detector, target.query_options())
        .run_directory(dir.path(), &target.pattern)
        .unwrap();

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 3,
            failed: 0
        }
    );
    let expected: Vec<String> = list_images(dir.path(), "*.jpg")
        .unwrap()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(*classifier.submissions.borrow(), expected);
}

#[test]
fn a_failed_image_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    seed_images(dir.path(), &["one.jpg", "two.jpg", "three.jpg"]);
    let files: Vec<PathBuf> = list_images(dir.path(), "*.jpg").unwrap();

    let target = ppe_target();
    let detector = detector(&target.detector);
    let classifier = FakeClassifier::answering(vec![
        Ok(ClassificationResult {
            label: Label::No,
            confidence: Some(0.8),
        }),
        Err(ApiError::UnexpectedStatus {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "busy".into(),
        }),
        Ok(ClassificationResult {
            label: Label::Yes,
            confidence: Some(0.99),
        }),
    ]);

    let summary = Evaluation::new(&classifier, &detector, target.query_options())
        .run(&files)
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(classifier.submissions.borrow().len(), 3);
}

#[test]
fn empty_directory_makes_no_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let target = court_target();
    let detector = detector(&target.detector);
    let classifier = FakeClassifier::default();

    let summary = Evaluation::new(&classifier, &detector, target.query_options())
        .run_directory(dir.path(), &target.pattern)
        .unwrap();

    assert_eq!(summary, EvaluationSummary::default());
    assert!(classifier.submissions.borrow().is_empty());
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = ppe_target();
    let detector = detector(&target.detector);
    let classifier = FakeClassifier::default();

    let result = Evaluation::new(&classifier, &detector, target.query_options())
        .run_directory(&dir.path().join("new_images"), "*.jpg");

    assert!(result.is_err());
}

#[test]
fn court_target_disables_human_review() {
    let dir = tempfile::tempdir().unwrap();
    seed_images(dir.path(), &["game.jpg"]);

    let target = court_target();
    assert_eq!(target.directory(EvaluationSet::Updated), std::path::Path::new("./new_court_images"));
    let detector = detector(&target.detector);
    let classifier = FakeClassifier::always("NO", 0.4, 1);

    Evaluation::new(&classifier, &detector, target.query_options())
        .run_directory(dir.path(), &target.pattern)
        .unwrap();

    let options = classifier.options_seen.borrow()[0];
    assert_eq!(options.human_review, HumanReview::Never);
}

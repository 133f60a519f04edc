use std::io::Write;
use std::sync::Arc;

use sentiscope::error::AnnotateError;
use sentiscope::sentiment::{SentimentLabel, VaderScorer, NEGATIVE_THRESHOLD, POSITIVE_THRESHOLD};
use sentiscope::BatchAnnotator;
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn annotator() -> BatchAnnotator {
    BatchAnnotator::new(Arc::new(VaderScorer::new()))
}

#[test]
fn three_row_example() {
    let file = csv_file("airline,text\nUnited,great flight!\nDelta,\"delayed again, furious\"\nUnited,\n");
    let ds = annotator().annotate(file.path()).unwrap();

    assert_eq!(ds.len(), 2);
    assert_eq!(ds.records[0].text(), "great flight!");
    assert_eq!(ds.records[0].label(), SentimentLabel::Positive);
    assert!(ds.records[0].score() >= POSITIVE_THRESHOLD);
    assert_eq!(ds.records[1].text(), "delayed again, furious");
    assert_eq!(ds.records[1].label(), SentimentLabel::Negative);
    assert!(ds.records[1].score() <= NEGATIVE_THRESHOLD);
    assert_eq!(ds.records[1].field("airline"), Some("Delta"));
    assert_eq!(ds.column_names(), vec!["airline", "text", "score", "label"]);
}

#[test]
fn repeat_calls_are_memoized() {
    let file = csv_file("text\nlove it\nhate it\n");
    let annotator = annotator();

    let first = annotator.annotate(file.path()).unwrap();
    // the source is treated as immutable once loaded
    std::fs::write(file.path(), "text\nsomething else entirely\n").unwrap();
    let second = annotator.annotate(file.path()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.len(), 2);
}

#[test]
fn missing_text_column_produces_no_dataset() {
    let file = csv_file("airline,tweet\nUnited,great flight!\n");
    let annotator = annotator();

    let err = annotator.annotate(file.path()).unwrap_err();
    assert!(matches!(err, AnnotateError::MissingColumn { .. }));
    // failures are not memoized
    std::fs::write(file.path(), "airline,text\nUnited,great flight!\n").unwrap();
    assert_eq!(annotator.annotate(file.path()).unwrap().len(), 1);
}

#[test]
fn every_record_has_text_and_consistent_label() {
    let file = csv_file(
        "tweet_id,airline,text\n1,Delta,thanks for the upgrade\n2,United,\n3,US Airways,lost my bag. awful\n4,Delta,boarding now\n",
    );
    let ds = annotator().annotate(file.path()).unwrap();

    assert_eq!(ds.len(), 3);
    for record in &ds.records {
        assert!(!record.text().trim().is_empty());
        assert_eq!(record.label(), sentiscope::classify(record.score()));
    }
}

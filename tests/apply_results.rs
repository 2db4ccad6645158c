// tests/apply_results.rs

mod common;
use crate::common::builders::{item, ArtifactBuilder, TestResultBuilder};
use crate::common::{init_tracing, RecordingSink};

use runwatch::report::model::parse_artifact;
use runwatch::report::{apply_results, ResultArtifact, TestIdMatcher};
use runwatch::types::RunStatus;

fn parse(json: String) -> ResultArtifact {
    parse_artifact(&json).expect("artifact parses")
}

/// The canonical three-test scenario: t1/t3 pass, t2 fails with one
/// assertion-failure message.
#[test]
fn mixed_artifact_marks_items_individually() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(TestResultBuilder::passing("t1").build())
            .with_test(
                TestResultBuilder::failing("t2")
                    .assertion_failed("expected 200 got 404", "200", "404")
                    .build(),
            )
            .with_test(TestResultBuilder::passing("t3").build())
            .build_json(),
    );
    assert_eq!(artifact.summary.total, 3);
    assert_eq!(artifact.summary.failed, 1);

    let items = [item("t1"), item("t2"), item("t3")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    assert_eq!(sink.item_status_of("t1"), Some(RunStatus::Passed));
    assert_eq!(sink.item_status_of("t2"), Some(RunStatus::Failed));
    assert_eq!(sink.item_status_of("t3"), Some(RunStatus::Passed));

    let failures = sink.failure_texts_of("t2");
    assert!(
        failures.iter().any(|t| t.contains("expected 200 got 404")),
        "missing assertion message in {failures:?}"
    );
    let (_, assertion) = sink
        .failures
        .iter()
        .find(|(id, m)| id == "t2" && m.expected.is_some())
        .expect("assertion failure with payloads");
    assert_eq!(assertion.expected.as_deref(), Some("200"));
    assert_eq!(assertion.actual.as_deref(), Some("404"));
}

#[test]
fn zero_matches_means_skipped() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(TestResultBuilder::passing("t1").build())
            .build_json(),
    );

    let items = [item("not-in-artifact")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    assert_eq!(
        sink.item_status_of("not-in-artifact"),
        Some(RunStatus::Skipped)
    );
    assert!(sink.failures.is_empty());
}

#[test]
fn passing_item_still_forwards_event_summary() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(
                TestResultBuilder::passing("t1")
                    .trace("opened page")
                    .log("login ok")
                    .build(),
            )
            .build_json(),
    );

    let items = [item("t1")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    assert_eq!(sink.item_status_of("t1"), Some(RunStatus::Passed));
    let output = sink.outputs.join("\n");
    assert!(output.contains("trace: opened page"));
    assert!(output.contains("log: login ok"));
}

#[test]
fn failure_without_explicit_event_gets_generic_message() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(TestResultBuilder::failing("t1").trace("got here").build())
            .build_json(),
    );

    let items = [item("t1")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    assert_eq!(sink.item_status_of("t1"), Some(RunStatus::Failed));
    let failures = sink.failure_texts_of("t1");
    assert!(failures.iter().any(|t| *t == "Test failed"));
    // The supplementary full event summary is always appended.
    assert!(failures.iter().any(|t| t.contains("trace: got here")));
}

#[test]
fn explicit_error_event_is_forwarded() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(
                TestResultBuilder::failing("t1")
                    .error("page crashed")
                    .build(),
            )
            .build_json(),
    );

    let items = [item("t1")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    let failures = sink.failure_texts_of("t1");
    assert!(failures.iter().any(|t| t.contains("page crashed")));
    assert!(!failures.iter().any(|t| *t == "Test failed"));
}

/// Data-driven variants aggregate: success is ANDed, durations are summed.
#[test]
fn data_driven_variants_aggregate_onto_one_item() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(
                TestResultBuilder::passing("checkout[0]")
                    .duration_ms(40)
                    .build(),
            )
            .with_test(
                TestResultBuilder::failing("checkout[1]")
                    .duration_ms(60)
                    .assertion_failed("variant 1 broke", "a", "b")
                    .build(),
            )
            .build_json(),
    );

    let items = [item("checkout")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    // One failing variant fails the whole item.
    assert_eq!(sink.item_status_of("checkout"), Some(RunStatus::Failed));
    let failures = sink.failure_texts_of("checkout");
    assert!(failures.iter().any(|t| t.contains("variant 1 broke")));
}

#[test]
fn matcher_does_not_claim_prefix_named_tests() {
    init_tracing();

    let artifact = parse(
        ArtifactBuilder::new()
            .with_test(TestResultBuilder::passing("checkout-express").build())
            .build_json(),
    );

    let items = [item("checkout")];
    let mut sink = RecordingSink::new();
    apply_results(&items, &artifact, &TestIdMatcher, &mut sink);

    // "checkout-express" is a different test, not a variant of "checkout".
    assert_eq!(sink.item_status_of("checkout"), Some(RunStatus::Skipped));
}

//! End-to-end runs of the regeneration pipeline over in-memory stores.

use regen::declarations::ServiceDeclaration;
use regen::pipeline::{Decision, Evaluation, RuleEvaluator, RunOptions};
use regen::rules::RuleUpdate;
use regen::snapshots::{FsSnapshotRepository, Snapshot, SnapshotRepository};

use crate::helpers::{
    combined, date, html_snapshot, page_snapshot, single, text_snapshot, Archive, Script,
};

fn tos_options() -> RunOptions {
    RunOptions {
        service_id: "svc".to_string(),
        document_type: "tos".to_string(),
        ..RunOptions::default()
    }
}

// ============================================================================
// Version generation
// ============================================================================

#[test]
fn identical_versions_are_skipped_and_changes_are_diffed() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "tos", 1, "Hello world"),
        text_snapshot("a2", "svc", "tos", 2, "Hello world"),
        text_snapshot("a3", "svc", "tos", 3, "Hello world v2"),
    ]);
    let script = Script::default();
    let transcript = script.transcript();

    let stats = archive.run_with(script, &RunOptions::default());

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(archive.contents(), vec!["Hello world", "Hello world v2"]);
    assert_eq!(archive.versions.records()[1].snapshot_ids, vec!["a3"]);
    assert_eq!(
        transcript.borrow().presented,
        vec!["Hello world", "- Hello world\n+ Hello world v2\n"]
    );
    assert!(archive.output.finalized);
}

#[test]
fn snapshots_without_declaration_produce_nothing() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "tos", 1, "Hello world"),
        text_snapshot("b1", "other", "tos", 2, "Other terms"),
    ]);

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.declaration_absent, 1);
    assert!(archive.output.skipped.is_empty());
}

#[test]
fn history_declaration_applies_before_its_end_date() {
    let service = ServiceDeclaration::new("svc")
        .with_document("tos", single("main"))
        .with_history("tos", single("article"), date(2));
    let mut archive = Archive::new(
        vec![service],
        vec![
            html_snapshot("a1", 1, "<article>Old terms</article><main>Ignored</main>"),
            html_snapshot("a2", 3, "<article>Ignored</article><main>New terms</main>"),
        ],
    );

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.accepted, 2);
    let contents = archive.contents();
    assert!(contents[0].contains("Old terms") && !contents[0].contains("Ignored"));
    assert!(contents[1].contains("New terms") && !contents[1].contains("Ignored"));
}

#[test]
fn document_type_aliases_are_resolved_before_rules() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "Terms of Service", 1, "Hello world"),
        text_snapshot("a2", "svc", "tos", 2, "Hello world v2"),
    ]);
    archive
        .rules
        .add_document_type_alias("Terms of Service", "tos")
        .unwrap();

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.accepted, 2);
    assert!(archive
        .versions
        .records()
        .iter()
        .all(|r| r.document_type == "tos"));
}

#[test]
fn binary_capture_fails_alone_and_the_run_goes_on() {
    let mut archive = Archive::tos(vec![]);
    let mut snapshots = FsSnapshotRepository::open(archive.dir.path().join("snapshots")).unwrap();
    snapshots
        .add(&Snapshot {
            mime_type: "application/pdf".to_string(),
            ..text_snapshot("pdf1", "svc", "tos", 1, "")
        })
        .unwrap();
    snapshots
        .add(&text_snapshot("a2", "svc", "tos", 2, "Hello world"))
        .unwrap();
    let pdf = archive.dir.path().join("snapshots").join(&snapshots.entries()[0].path);
    std::fs::write(&pdf, b"%PDF\xff\xfe\x00\x80").unwrap();

    let stats = regen::pipeline::Regenerator::new(
        &mut archive.rules,
        &mut archive.declarations,
        &snapshots,
        &mut archive.versions,
        &mut archive.output,
    )
    .run(&RunOptions::default())
    .unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(archive.contents(), vec!["Hello world"]);
    assert_eq!(archive.rules.progress().unwrap().snapshot_id, "a2");
}

// ============================================================================
// Multi-page documents
// ============================================================================

#[test]
fn three_page_document_waits_for_every_page() {
    let service = ServiceDeclaration::new("svc").with_document("tos", combined(&["p1", "p2", "p3"]));
    let mut archive = Archive::new(
        vec![service],
        vec![
            page_snapshot("c", "p3", 1, "three"),
            page_snapshot("a", "p1", 2, "one"),
            page_snapshot("b", "p2", 3, "two"),
        ],
    );

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.waiting, 2);
    assert_eq!(stats.accepted, 1);
    let record = &archive.versions.records()[0];
    assert_eq!(record.content, "one\n\ntwo\n\nthree");
    assert_eq!(record.snapshot_ids, vec!["a", "b", "c"]);
    assert_eq!(record.fetch_date, date(3));
}

#[test]
fn buffered_pages_survive_an_interrupted_run() {
    let service = ServiceDeclaration::new("svc").with_document("tos", combined(&["p1", "p2"]));
    let mut archive = Archive::new(vec![service], vec![page_snapshot("a", "p1", 1, "one")]);

    let first = archive.run(&RunOptions::default());
    assert_eq!(first.waiting, 1);
    let progress = archive.rules.progress().cloned().unwrap();
    assert_eq!(progress.snapshot_id, "a");
    assert_eq!(progress.pending, vec!["a"]);

    archive.snapshots.push(page_snapshot("b", "p2", 2, "two"));
    let second = archive.run(&RunOptions::default());

    assert_eq!(second.processed, 1);
    assert_eq!(second.accepted, 1);
    assert_eq!(archive.contents(), vec!["one\n\ntwo"]);
    assert!(archive.rules.progress().unwrap().pending.is_empty());
}

#[test]
fn page_of_a_downgraded_declaration_is_a_failure() {
    let mut archive = Archive::tos(vec![page_snapshot("a", "p2", 1, "two")]);

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.failures, 1);
    assert_eq!(stats.accepted, 0);
}

// ============================================================================
// Checkpoint
// ============================================================================

#[test]
fn interrupted_run_resumes_after_last_handled_snapshot() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "tos", 1, "Version one"),
        text_snapshot("a2", "svc", "tos", 2, "Version two"),
        text_snapshot("a3", "svc", "tos", 3, "Version three"),
    ]);

    let script = Script {
        stop_after: Some(1),
        ..Script::default()
    };
    let first = archive.run_with(script, &tos_options());
    assert!(first.interrupted);
    assert_eq!(first.processed, 1);

    let progress = archive.rules.progress().cloned().unwrap();
    assert_eq!(progress.snapshot_id, "a1");
    assert_eq!(progress.index, 2);

    let resumed: Vec<String> = archive
        .snapshots
        .iterate(&tos_options().filter(), Some(progress.snapshot_id.as_str()))
        .unwrap()
        .map(|s| s.unwrap().id)
        .collect();
    assert_eq!(resumed, vec!["a2", "a3"]);

    let second = archive.run(&tos_options());
    assert_eq!(second.processed, 2);
    assert_eq!(
        archive.contents(),
        vec!["Version one", "Version two", "Version three"]
    );
    assert_eq!(archive.rules.progress().unwrap().index, 4);
}

#[test]
fn restart_clears_versions_and_checkpoint() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "tos", 1, "Version one"),
        text_snapshot("a2", "svc", "tos", 2, "Version two"),
    ]);
    archive.run(&tos_options());
    assert_eq!(archive.versions.records().len(), 2);

    let stats = archive.run(&RunOptions {
        restart: true,
        ..tos_options()
    });

    assert_eq!(stats.processed, 2);
    assert_eq!(archive.versions.records().len(), 2);
}

// ============================================================================
// Skip rules
// ============================================================================

#[test]
fn selector_rule_wins_over_content_rule() {
    let mut archive = Archive::tos(vec![]);
    archive
        .rules
        .update_document("*", "*", RuleUpdate::SkipSelector(".banner".to_string()))
        .unwrap();
    archive
        .rules
        .update_document(
            "svc",
            "tos",
            RuleUpdate::SkipContent {
                selector: ".banner".to_string(),
                value: "Closed".to_string(),
            },
        )
        .unwrap();

    let snapshot = html_snapshot("a1", 1, r#"<main>Terms</main><div class="banner">Closed</div>"#);
    let evaluation = RuleEvaluator
        .should_skip(&snapshot, &archive.rules.document_rules("svc", "tos"))
        .unwrap();

    assert_eq!(
        evaluation,
        Evaluation::Skip {
            reason: "its content matches a selector to skip: \".banner\"".to_string()
        }
    );
}

#[test]
fn wildcard_skip_commit_applies_to_concrete_service() {
    let mut archive = Archive::tos(vec![
        text_snapshot("a1", "svc", "tos", 1, "Version one"),
        text_snapshot("a2", "svc", "tos", 2, "Broken page"),
        text_snapshot("a3", "svc", "tos", 3, "Version two"),
    ]);
    archive
        .rules
        .update_document("*", "tos", RuleUpdate::SkipCommit("a2".to_string()))
        .unwrap();

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.snapshots_skipped, 1);
    assert_eq!(archive.output.skipped, vec!["a2"]);
    assert_eq!(archive.contents(), vec!["Version one", "Version two"]);
}

#[test]
fn content_identical_to_an_unprocessable_snapshot_is_skipped_silently() {
    let mut archive = Archive::tos(vec![
        html_snapshot("a1", 1, "<p>Service unavailable</p>"),
        html_snapshot("a2", 2, "<p>Service unavailable</p>"),
        html_snapshot("a3", 3, "<p>Something else went wrong</p>"),
    ]);
    archive
        .rules
        .update_document("svc", "tos", RuleUpdate::SkipCommit("a1".to_string()))
        .unwrap();

    let stats = archive.run(&RunOptions::default());

    assert_eq!(stats.snapshots_skipped, 1);
    assert_eq!(stats.known_unprocessable, 1);
    assert_eq!(stats.failures, 1);
}

// ============================================================================
// Operator decisions
// ============================================================================

#[test]
fn update_history_archives_declaration_and_asks_again() {
    let mut archive = Archive::tos(vec![
        html_snapshot("a1", 1, "<main>Terms</main>"),
        html_snapshot("a2", 2, "<article>Moved terms</article>"),
    ]);
    let script = Script::answering(vec![Decision::Keep, Decision::UpdateHistory]);
    let transcript = script.transcript();

    let stats = archive.run_with(
        script,
        &RunOptions {
            interactive: true,
            ..tos_options()
        },
    );

    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(transcript.borrow().questions.len(), 3);

    let history = std::fs::read_to_string(archive.declarations.history_path("svc")).unwrap();
    assert!(history.contains("\"validUntil\": \"2023-01-01T12:00:00"));
    assert_eq!(
        archive
            .declarations
            .resolve("svc", "tos", &date(1))
            .unwrap()
            .valid_until,
        Some(date(1))
    );
}

#[test]
fn skip_snapshot_decision_records_skip_commit() {
    let mut archive = Archive::tos(vec![html_snapshot("a1", 1, "<p>Captcha</p>")]);
    let script = Script::answering(vec![Decision::SkipSnapshot]);

    let stats = archive.run_with(
        script,
        &RunOptions {
            interactive: true,
            ..tos_options()
        },
    );

    assert_eq!(stats.snapshots_skipped, 1);
    assert_eq!(archive.output.to_check, vec!["a1"]);
    assert_eq!(archive.rules.snapshot_ids_to_skip("svc", "tos"), vec!["a1"]);
}

#[test]
fn done_document_is_refused_in_interactive_mode_unless_forced() {
    let mut archive = Archive::tos(vec![text_snapshot("a1", "svc", "tos", 1, "Terms")]);
    archive.rules.mark_as_done("svc", "tos").unwrap();
    let interactive = RunOptions {
        interactive: true,
        ..tos_options()
    };

    let err = regen::pipeline::Regenerator::new(
        &mut archive.rules,
        &mut archive.declarations,
        &archive.snapshots,
        &mut archive.versions,
        &mut archive.output,
    )
    .run(&interactive)
    .unwrap_err();
    assert!(err.to_string().contains("has already been marked as done"));

    let stats = archive.run(&RunOptions {
        force: true,
        ..interactive
    });
    assert_eq!(stats.accepted, 1);
}

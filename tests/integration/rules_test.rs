//! Rule file contents written by operator decisions.

use serde_json::Value;

use regen::pipeline::{Decision, EndDecision, RunOptions};
use regen::rules::{RuleStore, RuleUpdate};

use crate::helpers::{html_snapshot, Archive, Script};

/// Rules file as pretty JSON with wall-clock dates masked.
fn normalized(store: &RuleStore) -> String {
    let raw = std::fs::read_to_string(store.path()).unwrap();
    let mut value: Value = serde_json::from_str(&raw).unwrap();
    mask(&mut value);
    serde_json::to_string_pretty(&value).unwrap()
}

fn mask(value: &mut Value) {
    if let Value::Object(fields) = value {
        for (key, field) in fields.iter_mut() {
            if key == "date" || key == "done" {
                *field = Value::String("[date]".to_string());
            } else {
                mask(field);
            }
        }
    }
}

#[test]
fn interactive_review_writes_rules_and_done_marker() {
    let mut archive = Archive::tos(vec![
        html_snapshot("s1", 1, "<main>Terms v1</main>"),
        html_snapshot("s2", 2, r#"<div class="captcha">Are you human?</div>"#),
        html_snapshot("s3", 3, "<main>Terms v2</main>"),
        html_snapshot("s4", 4, "<p>Server error</p>"),
    ]);
    let script = Script {
        end: Some(EndDecision::MarkAsDone),
        ..Script::answering(vec![
            Decision::Keep,
            Decision::SkipSelector(".captcha".to_string()),
            Decision::Keep,
            Decision::SkipSnapshot,
        ])
    };

    let stats = archive.run_with(
        script,
        &RunOptions {
            service_id: "svc".to_string(),
            document_type: "tos".to_string(),
            interactive: true,
            ..RunOptions::default()
        },
    );

    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.snapshots_skipped, 2);
    assert_eq!(archive.output.skipped, vec!["s2"]);
    assert!(archive.rules.is_document_done("svc", "tos"));

    insta::assert_snapshot!(normalized(&archive.rules), @r###"
    {
      "documentTypes": {},
      "documents": {
        "svc": {
          "tos": {
            "done": "[date]",
            "skipCommit": [
              "s4"
            ],
            "skipSelector": [
              ".captcha"
            ]
          }
        }
      },
      "progression": {
        "date": "[date]",
        "index": 5,
        "snapshotId": "s4"
      }
    }
    "###);
}

#[test]
fn repeated_rule_is_stored_once() {
    let archive = Archive::tos(vec![]);
    let mut rules = archive.rules;

    for _ in 0..2 {
        rules
            .update_document("*", "tos", RuleUpdate::SkipSelector(".cookie-banner".to_string()))
            .unwrap();
    }
    rules
        .update_document(
            "svc",
            "*",
            RuleUpdate::SkipContent {
                selector: "h1".to_string(),
                value: "Maintenance".to_string(),
            },
        )
        .unwrap();
    rules.add_document_type_alias("Terms of Service", "tos").unwrap();

    insta::assert_snapshot!(normalized(&rules), @r###"
    {
      "documentTypes": {
        "Terms of Service": "tos"
      },
      "documents": {
        "*": {
          "tos": {
            "skipSelector": [
              ".cookie-banner"
            ]
          }
        },
        "svc": {
          "*": {
            "skipContent": {
              "h1": "Maintenance"
            }
          }
        }
      }
    }
    "###);
}

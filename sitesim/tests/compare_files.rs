mod common;

use common::{approx, fixture_arg, json_output, sitesim};
use predicates::prelude::*;

#[test]
fn class_order_does_not_matter() {
    sitesim()
        .args([
            "compare-files",
            &fixture_arg("files/a_original.html"),
            &fixture_arg("files/a_candidate.html"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("File Comparison"))
        .stdout(predicate::str::contains("Similarity: 100.0%"));
}

#[test]
fn missing_property_is_a_partial_selector_match() {
    let parsed = json_output(&[
        "compare-files",
        &fixture_arg("files/b_original.css"),
        &fixture_arg("files/b_candidate.css"),
    ]);
    assert_eq!(parsed["kind"], "css");
    assert!(parsed["similarity"].as_f64().unwrap() < 1.0);
    let detail = &parsed["detail"];
    assert_eq!(detail["kind"], "style");
    assert_eq!(detail["partial_selectors"], 1);
    assert_eq!(detail["matching_selectors"], 0);
    assert_eq!(detail["missing_selectors"], 0);
    assert_eq!(detail["extra_selectors"], 0);
}

#[test]
fn renamed_local_variable_scores_one() {
    let parsed = json_output(&[
        "compare-files",
        &fixture_arg("files/c_original.js"),
        &fixture_arg("files/c_candidate.js"),
    ]);
    assert_eq!(parsed["kind"], "script");
    let detail = &parsed["detail"];
    assert_eq!(detail["kind"], "script");
    assert!(approx(&detail["function_similarity"], 1.0));
    assert_eq!(detail["matching_functions"], 2);
    assert!(approx(&parsed["similarity"], 1.0));
}

#[test]
fn mixed_kinds_are_rejected() {
    sitesim()
        .args([
            "compare-files",
            &fixture_arg("files/a_original.html"),
            &fixture_arg("files/b_original.css"),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Cannot compare a html file with a css file",
        ));
}

#[test]
fn unsupported_file_is_rejected() {
    sitesim()
        .args([
            "compare-files",
            &fixture_arg("projects/original/package.json"),
            &fixture_arg("projects/candidate/package.json"),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unsupported file type"));
}

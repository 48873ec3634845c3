mod common;

use common::{approx, fixture_arg, json_output, sitesim};
use predicates::prelude::*;

#[test]
fn report_lists_matches_and_unmatched_files() {
    sitesim()
        .args([
            "report",
            &fixture_arg("projects/original"),
            &fixture_arg("projects/candidate"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Similarity Summary"))
        .stdout(predicate::str::contains("HTML Matches"))
        .stdout(predicate::str::contains("index.html <-> index.html [exact"))
        .stdout(predicate::str::contains("+ blog/post.html (only in candidate)"));
}

#[test]
fn unmatched_candidate_file_lowers_the_type_aggregate() {
    let parsed = json_output(&[
        "report",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/candidate"),
    ]);
    let html = &parsed["types"]["html"];
    assert_eq!(html["files_original"], 2);
    assert_eq!(html["files_candidate"], 3);
    assert_eq!(html["files_unmatched"], 1);
    for pair in html["matched_pairs"].as_array().unwrap() {
        assert!(approx(&pair["score"], 1.0));
    }
    let aggregate = html["aggregate_score"].as_f64().unwrap();
    assert!(aggregate < 1.0);
    assert!((aggregate - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn every_artifact_kind_is_reported() {
    let parsed = json_output(&[
        "report",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/candidate"),
    ]);
    for kind in ["html", "css", "jsx", "script"] {
        assert!(parsed["types"].get(kind).is_some(), "missing {kind}");
    }
    assert!(approx(&parsed["types"]["css"]["aggregate_score"], 1.0));
    assert!(approx(&parsed["types"]["script"]["aggregate_score"], 1.0));
    assert!(approx(&parsed["types"]["jsx"]["aggregate_score"], 1.0));
    assert!(approx(&parsed["config"]["package_json"]["similarity"], 1.0));
}

#[test]
fn summary_shows_prediction() {
    sitesim()
        .args([
            "summary",
            &fixture_arg("projects/original"),
            &fixture_arg("projects/candidate"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall similarity:"))
        .stdout(predicate::str::contains("High similarity"));
}

#[test]
fn identical_projects_score_one() {
    let parsed = json_output(&[
        "summary",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/original"),
    ]);
    assert!(approx(&parsed["overall_similarity"], 1.0));
    assert_eq!(parsed["prediction"]["label"], "high");
}

#[test]
fn missing_project_is_an_error() {
    sitesim()
        .args([
            "report",
            &fixture_arg("projects/does-not-exist"),
            &fixture_arg("projects/candidate"),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

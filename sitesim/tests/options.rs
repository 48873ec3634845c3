mod common;

use std::fs;

use common::{approx, fixture_arg, json_output, sitesim};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn exclude_option_drops_matching_paths() {
    let parsed = json_output(&[
        "--exclude",
        "blog",
        "report",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/candidate"),
    ]);
    let html = &parsed["types"]["html"];
    assert_eq!(html["files_candidate"], 2);
    assert_eq!(html["files_unmatched"], 0);
    assert!(approx(&html["aggregate_score"], 1.0));
}

#[test]
fn config_file_excludes_are_applied() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("custom.toml");
    fs::write(&config, "exclude = [\"blog\", \"components\"]\n").unwrap();
    let parsed = json_output(&[
        "--config",
        config.to_str().unwrap(),
        "report",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/candidate"),
    ]);
    assert_eq!(parsed["types"]["html"]["files_unmatched"], 0);
    assert!(parsed["types"].get("jsx").is_none());
}

#[test]
fn malformed_config_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "exclude = [").unwrap();
    sitesim()
        .args([
            "--config",
            config.to_str().unwrap(),
            "summary",
            &fixture_arg("projects/original"),
            &fixture_arg("projects/candidate"),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn dedicated_thread_pool() {
    let parsed = json_output(&[
        "--threads",
        "2",
        "summary",
        &fixture_arg("projects/original"),
        &fixture_arg("projects/original"),
    ]);
    assert!(approx(&parsed["overall_similarity"], 1.0));
}

#[test]
fn json_format_is_one_document() {
    sitesim()
        .args([
            "--format",
            "json",
            "report",
            &fixture_arg("projects/original"),
            &fixture_arg("projects/candidate"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("\"overall_similarity\""));
}

#[test]
fn unparsable_file_is_a_warning() {
    let tmp = TempDir::new().unwrap();
    let (original, candidate) = (tmp.path().join("a"), tmp.path().join("b"));
    fs::create_dir_all(&original).unwrap();
    fs::create_dir_all(&candidate).unwrap();
    fs::write(original.join("app.js"), "export function f() { return 1; }\n").unwrap();
    fs::write(candidate.join("app.js"), "export function f( {\n").unwrap();
    sitesim()
        .args([
            "summary",
            original.to_str().unwrap(),
            candidate.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("syntax error"));
}

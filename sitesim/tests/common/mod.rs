use assert_cmd::cargo::cargo_bin_cmd;
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn fixture_arg(name: &str) -> String {
    fixture_path(name).to_str().unwrap().to_string()
}

pub fn sitesim() -> assert_cmd::Command {
    cargo_bin_cmd!("sitesim")
}

/// Run `sitesim --format json <args…>` and parse stdout.
#[allow(dead_code)]
pub fn json_output(args: &[&str]) -> serde_json::Value {
    let output = sitesim()
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Float field close to `expected`.
#[allow(dead_code)]
pub fn approx(value: &serde_json::Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|v| (v - expected).abs() < 1e-9)
}

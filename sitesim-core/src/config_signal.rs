//! Project configuration similarity: Tailwind theme extensions,
//! `package.json` and `tsconfig.json`.
//!
//! Each comparison that can be performed counts as one virtual "config file"
//! in the overall score. A file present on one side only is not compared.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::analyzer::ScriptParser;
use crate::scanner::ProjectFiles;
use crate::script::Dialect;
use crate::similarity::{jaccard, ratio};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSimilarity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailwind: Option<TailwindComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_json: Option<PackageJsonComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<TsconfigComparison>,
}

impl ConfigSimilarity {
    /// Scores of the comparisons that were performed.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        [
            self.tailwind.as_ref().map(|t| t.similarity),
            self.package_json.as_ref().map(|p| p.similarity),
            self.tsconfig.as_ref().map(|t| t.similarity),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// -- Tailwind -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailwindComparison {
    pub shared_config_keys: Vec<String>,
    pub only_in_original_config: Vec<String>,
    pub only_in_candidate_config: Vec<String>,
    pub key_jaccard_similarity: f64,
    /// Sub-key Jaccard per shared `theme.extend` key.
    pub subkey_similarity: BTreeMap<String, f64>,
    pub similarity: f64,
    /// At least one side could not be read and was compared as empty.
    pub unreadable: bool,
}

fn theme_extend(config: &Value) -> Map<String, Value> {
    config
        .pointer("/theme/extend")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn subkey_jaccard(a: &Value, b: &Value) -> f64 {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            jaccard(&x.keys().collect::<BTreeSet<_>>(), &y.keys().collect())
        }
        _ => f64::from(u8::from(a == b)),
    }
}

/// Compare `theme.extend` of two evaluated Tailwind configs. `None` stands
/// for an unreadable config and compares as empty.
#[must_use]
pub fn compare_tailwind(a: Option<&Value>, b: Option<&Value>) -> TailwindComparison {
    let ext_a = a.map(theme_extend).unwrap_or_default();
    let ext_b = b.map(theme_extend).unwrap_or_default();
    let keys_a: BTreeSet<&String> = ext_a.keys().collect();
    let keys_b: BTreeSet<&String> = ext_b.keys().collect();
    let key_jaccard_similarity = jaccard(&keys_a, &keys_b);

    let subkey_similarity: BTreeMap<String, f64> = keys_a
        .intersection(&keys_b)
        .map(|key| ((*key).clone(), subkey_jaccard(&ext_a[*key], &ext_b[*key])))
        .collect();
    let similarity = if subkey_similarity.is_empty() {
        key_jaccard_similarity
    } else {
        let mean_sub = subkey_similarity.values().sum::<f64>() / subkey_similarity.len() as f64;
        (key_jaccard_similarity + mean_sub) / 2.0
    };

    TailwindComparison {
        shared_config_keys: subkey_similarity.keys().cloned().collect(),
        only_in_original_config: keys_a.difference(&keys_b).map(|k| (*k).clone()).collect(),
        only_in_candidate_config: keys_b.difference(&keys_a).map(|k| (*k).clone()).collect(),
        key_jaccard_similarity,
        subkey_similarity,
        similarity,
        unreadable: a.is_none() || b.is_none(),
    }
}

// -- package.json ---------------------------------------------------------------

const BOILERPLATE_DEPENDENCIES: &[&str] = &["react", "react-dom", "next"];
const BOILERPLATE_SCRIPTS: &[&str] = &["dev", "build", "start", "lint"];
const METADATA_KEYS: &[&str] = &["name", "version", "description", "keywords", "author"];

/// Section weights: dependencies, devDependencies, peerDependencies,
/// scripts, metadata, config blocks.
const PACKAGE_WEIGHTS: [f64; 6] = [0.5, 0.2, 0.05, 0.05, 0.05, 0.05];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageJsonComparison {
    pub dependencies: Option<f64>,
    pub dev_dependencies: Option<f64>,
    pub peer_dependencies: Option<f64>,
    pub scripts: Option<f64>,
    pub metadata: Option<f64>,
    pub config_blocks: Option<f64>,
    /// Weight given to dependencies after folding in absent sections.
    pub dependencies_weight: f64,
    pub similarity: f64,
}

static VERSION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\^~><= ]+").expect("valid regex"));

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_version(version: &Value) -> String {
    VERSION_PREFIX
        .replace(value_text(version).trim(), "")
        .into_owned()
}

/// 1.0 for equal normalized versions, 0.3 when only the last numeric
/// component differs by one.
fn version_score(a: &Value, b: &Value) -> f64 {
    let (va, vb) = (normalize_version(a), normalize_version(b));
    if va == vb {
        return 1.0;
    }
    let parts = |v: &str| -> Vec<u64> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let (pa, pb) = (parts(&va), parts(&vb));
    if pa.len() == pb.len() && pa.len() >= 2 {
        let last = pa.len() - 1;
        if pa[..last] == pb[..last] && pa[last].abs_diff(pb[last]) == 1 {
            return 0.3;
        }
    }
    0.0
}

fn object<'a>(pkg: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    pkg.get(key).and_then(Value::as_object)
}

fn compare_dependencies(a: Option<&Map<String, Value>>, b: Option<&Map<String, Value>>) -> f64 {
    let empty = Map::new();
    let (a, b) = (a.unwrap_or(&empty), b.unwrap_or(&empty));
    let names = |m: &Map<String, Value>| -> BTreeSet<String> {
        m.keys()
            .filter(|k| !BOILERPLATE_DEPENDENCIES.contains(&k.as_str()))
            .cloned()
            .collect()
    };
    let key_similarity = jaccard(&names(a), &names(b));
    let shared: Vec<&String> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return key_similarity;
    }
    let version_similarity =
        shared.iter().map(|k| version_score(&a[*k], &b[*k])).sum::<f64>() / shared.len() as f64;
    0.3 * key_similarity + 0.7 * version_similarity
}

fn compare_scripts(a: Option<&Map<String, Value>>, b: Option<&Map<String, Value>>) -> f64 {
    let filtered = |m: Option<&Map<String, Value>>| -> BTreeMap<String, String> {
        m.into_iter()
            .flatten()
            .filter(|(k, _)| !BOILERPLATE_SCRIPTS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect()
    };
    let (a, b) = (filtered(a), filtered(b));
    let keys_a: BTreeSet<&String> = a.keys().collect();
    let keys_b: BTreeSet<&String> = b.keys().collect();
    let key_similarity = jaccard(&keys_a, &keys_b);
    let shared: Vec<&&String> = keys_a.intersection(&keys_b).collect();
    if shared.is_empty() {
        return key_similarity;
    }
    let command_similarity =
        shared.iter().map(|k| ratio(&a[**k], &b[**k])).sum::<f64>() / shared.len() as f64;
    0.6 * key_similarity + 0.4 * command_similarity
}

fn compare_metadata(a: &Value, b: &Value) -> f64 {
    let text = |v: Option<&Value>| v.map(value_text).unwrap_or_default().trim().to_lowercase();
    let scores: Vec<f64> = METADATA_KEYS
        .iter()
        .filter(|key| a.get(**key).is_some() || b.get(**key).is_some())
        .map(|key| match (a.get(key), b.get(key)) {
            (Some(Value::Array(x)), Some(Value::Array(y))) => {
                let set = |arr: &Vec<Value>| -> BTreeSet<String> {
                    arr.iter().map(|v| text(Some(v))).collect()
                };
                jaccard(&set(x), &set(y))
            }
            (va, vb) => {
                let (ta, tb) = (text(va), text(vb));
                f64::from(u8::from(!ta.is_empty() && ta == tb))
            }
        })
        .collect();
    if scores.is_empty() {
        return 1.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

fn is_config_block(key: &str) -> bool {
    key.ends_with("Config") || key == "browserslist" || key == "jest"
}

fn compare_config_blocks(a: &Value, b: &Value) -> f64 {
    let (Some(ma), Some(mb)) = (a.as_object(), b.as_object()) else {
        return 1.0;
    };
    let scores: Vec<f64> = ma
        .iter()
        .filter(|(k, _)| is_config_block(k))
        .filter_map(|(k, va)| mb.get(k).map(|vb| (va, vb)))
        .map(|(va, vb)| match (va, vb) {
            (Value::Object(x), Value::Object(y)) => {
                jaccard(&x.keys().collect::<BTreeSet<_>>(), &y.keys().collect())
            }
            (Value::Array(x), Value::Array(y)) => {
                let set = |arr: &Vec<Value>| -> BTreeSet<String> { arr.iter().map(Value::to_string).collect() };
                jaccard(&set(x), &set(y))
            }
            _ => ratio(&value_text(va), &value_text(vb)),
        })
        .collect();
    if scores.is_empty() {
        return 1.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Compare two `package.json` documents section by section.
///
/// Sections absent from both files are skipped and their weight moves to
/// dependencies; the result is renormalized over the sections present.
#[must_use]
pub fn compare_package_json(a: &Value, b: &Value) -> PackageJsonComparison {
    let in_either = |key: &str| a.get(key).is_some() || b.get(key).is_some();
    let deps = |key: &str| {
        in_either(key).then(|| compare_dependencies(object(a, key), object(b, key)))
    };

    let dependencies = deps("dependencies");
    let dev_dependencies = deps("devDependencies");
    let peer_dependencies = deps("peerDependencies");
    let scripts = in_either("scripts").then(|| compare_scripts(object(a, "scripts"), object(b, "scripts")));
    let metadata = METADATA_KEYS
        .iter()
        .any(|k| in_either(k))
        .then(|| compare_metadata(a, b));
    let has_config = |v: &Value| v.as_object().is_some_and(|m| m.keys().any(|k| is_config_block(k)));
    let config_blocks = (has_config(a) || has_config(b)).then(|| compare_config_blocks(a, b));

    let sections = [
        dependencies,
        dev_dependencies,
        peer_dependencies,
        scripts,
        metadata,
        config_blocks,
    ];
    let mut weights = PACKAGE_WEIGHTS;
    for i in 1..weights.len() {
        if sections[i].is_none() {
            weights[0] += weights[i];
            weights[i] = 0.0;
        }
    }
    let (weighted, total) = sections
        .iter()
        .zip(weights)
        .filter_map(|(s, w)| s.map(|s| (s * w, w)))
        .filter(|(_, w)| *w > 0.0)
        .fold((0.0, 0.0), |(acc, tw), (sw, w)| (acc + sw, tw + w));

    PackageJsonComparison {
        dependencies,
        dev_dependencies,
        peer_dependencies,
        scripts,
        metadata,
        config_blocks,
        dependencies_weight: weights[0],
        similarity: if total > 0.0 { weighted / total } else { 0.0 },
    }
}

// -- tsconfig.json --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TsconfigComparison {
    /// Flattened `compilerOptions` key -> 1.0 when both values agree.
    pub options: BTreeMap<String, f64>,
    pub similarity: f64,
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, v, out);
            }
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), value_text(other).trim().to_lowercase());
        }
    }
}

/// Fraction of flattened `compilerOptions` keys whose values agree
/// (case-insensitive). An empty union scores 1.0.
#[must_use]
pub fn compare_tsconfig(a: &Value, b: &Value) -> TsconfigComparison {
    let options_of = |v: &Value| {
        let mut flat = BTreeMap::new();
        if let Some(opts) = v.get("compilerOptions") {
            flatten("", opts, &mut flat);
        }
        flat
    };
    let (fa, fb) = (options_of(a), options_of(b));
    let keys: BTreeSet<&String> = fa.keys().chain(fb.keys()).collect();
    let options: BTreeMap<String, f64> = keys
        .iter()
        .map(|k| {
            let equal = matches!((fa.get(*k), fb.get(*k)), (Some(x), Some(y)) if x == y);
            ((*k).clone(), f64::from(u8::from(equal)))
        })
        .collect();
    let similarity = if options.is_empty() {
        1.0
    } else {
        options.values().sum::<f64>() / options.len() as f64
    };
    TsconfigComparison {
        options,
        similarity,
    }
}

/// Remove `//` and `/* */` comments and trailing commas so JSONC parses as
/// JSON. String contents are left untouched.
#[must_use]
pub fn strip_jsonc(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    remove_trailing_commas(&out)
}

fn remove_trailing_commas(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if c == '\\' && i + 1 < chars.len() {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

// -- Project files --------------------------------------------------------------

fn read_source(path: &Path, warnings: &mut Vec<String>) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(path = %path.display(), "unreadable config file");
            warnings.push(format!("Failed to read {}: {e}", path.display()));
            None
        }
    }
}

/// Parse a JSON (or, with `jsonc`, commented) config file. Unreadable or
/// malformed files compare as an empty object.
fn read_json(path: &Path, jsonc: bool, warnings: &mut Vec<String>) -> Value {
    let Some(source) = read_source(path, warnings) else {
        return Value::Object(Map::new());
    };
    let text = if jsonc { strip_jsonc(&source) } else { source };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warnings.push(format!("Failed to parse {}: {e}", path.display()));
        Value::Object(Map::new())
    })
}

fn read_tailwind(
    parser: &dyn ScriptParser,
    path: &Path,
    warnings: &mut Vec<String>,
) -> Option<Value> {
    let source = read_source(path, warnings)?;
    match parser.evaluate_config(&source, Dialect::from_path(path)) {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(format!("Failed to evaluate {}: {e}", path.display()));
            None
        }
    }
}

/// Run every config comparison whose file exists in both projects.
pub fn compare_project_configs(
    parser: &dyn ScriptParser,
    original: &ProjectFiles,
    candidate: &ProjectFiles,
    warnings: &mut Vec<String>,
) -> ConfigSimilarity {
    let tailwind = match (&original.tailwind_config, &candidate.tailwind_config) {
        (Some(a), Some(b)) => {
            let (a, b) = (read_tailwind(parser, a, warnings), read_tailwind(parser, b, warnings));
            Some(compare_tailwind(a.as_ref(), b.as_ref()))
        }
        _ => None,
    };
    let package_json = match (&original.package_json, &candidate.package_json) {
        (Some(a), Some(b)) => Some(compare_package_json(
            &read_json(a, false, warnings),
            &read_json(b, false, warnings),
        )),
        _ => None,
    };
    let tsconfig = match (&original.tsconfig, &candidate.tsconfig) {
        (Some(a), Some(b)) => Some(compare_tsconfig(
            &read_json(a, true, warnings),
            &read_json(b, true, warnings),
        )),
        _ => None,
    };
    ConfigSimilarity {
        tailwind,
        package_json,
        tsconfig,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tailwind_identical_themes() {
        let cfg = json!({"theme": {"extend": {"colors": {"brand": "#f00"}, "spacing": {"72": "18rem"}}}});
        let result = compare_tailwind(Some(&cfg), Some(&cfg));
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.shared_config_keys, ["colors", "spacing"]);
        assert!(!result.unreadable);
    }

    #[test]
    fn tailwind_partial_overlap() {
        let a = json!({"theme": {"extend": {"colors": {"brand": 1, "accent": 2}, "spacing": {}}}});
        let b = json!({"theme": {"extend": {"colors": {"brand": 1}, "fontFamily": {}}}});
        let result = compare_tailwind(Some(&a), Some(&b));
        // keys {colors, spacing} vs {colors, fontFamily}: 1/3; colors sub-keys 1/2
        assert!((result.key_jaccard_similarity - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!((result.similarity - (1.0 / 3.0 + 0.5) / 2.0).abs() < 1e-9);
        assert_eq!(result.only_in_original_config, ["spacing"]);
        assert_eq!(result.only_in_candidate_config, ["fontFamily"]);
    }

    #[test]
    fn tailwind_unreadable_compares_as_empty() {
        let result = compare_tailwind(None, None);
        assert!((result.similarity - 1.0).abs() < f64::EPSILON);
        assert!(result.unreadable);
    }

    #[test]
    fn version_scores() {
        assert!((version_score(&json!("^1.2.3"), &json!("1.2.3")) - 1.0).abs() < f64::EPSILON);
        assert!((version_score(&json!("~1.2.3"), &json!("1.2.4")) - 0.3).abs() < f64::EPSILON);
        assert!(version_score(&json!("1.2.3"), &json!("2.0.0")) < f64::EPSILON);
    }

    #[test]
    fn package_json_identical() {
        let pkg = json!({
            "name": "site",
            "dependencies": {"react": "^18.0.0", "axios": "1.6.0"},
            "scripts": {"dev": "vite", "deploy": "gh-pages -d dist"}
        });
        let result = compare_package_json(&pkg, &pkg);
        assert!((result.similarity - 1.0).abs() < 1e-9);
        assert!(result.dev_dependencies.is_none());
        // 0.5 + dev 0.2 + peer 0.05 + config 0.05 folded in
        assert!((result.dependencies_weight - 0.8).abs() < 1e-9);
    }

    #[test]
    fn boilerplate_dependencies_do_not_count_as_keys() {
        let a = json!({"dependencies": {"react": "18.0.0"}});
        let b = json!({"dependencies": {"react": "18.0.0", "next": "14.0.0"}});
        let result = compare_package_json(&a, &b);
        // key Jaccard over {} vs {} = 1.0, shared react version equal
        assert!((result.dependencies.unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tsconfig_flattened_option_agreement() {
        let a = json!({"compilerOptions": {"strict": true, "target": "ES2020", "paths": {"@/*": ["src/*"]}}});
        let b = json!({"compilerOptions": {"strict": true, "target": "es2020", "jsx": "react"}});
        let result = compare_tsconfig(&a, &b);
        // keys: strict, target, paths.@/*, jsx; agree on strict and target
        assert_eq!(result.options.len(), 4);
        assert!((result.similarity - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn tsconfig_empty_options_score_one() {
        assert!((compare_tsconfig(&json!({}), &json!({})).similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn jsonc_comments_and_trailing_commas() {
        let source = r#"{
            // compiler settings
            "compilerOptions": {
                "target": "es2020", /* modern */
                "baseUrl": "./src//x",
            },
        }"#;
        let value: Value = serde_json::from_str(&strip_jsonc(source)).unwrap();
        assert_eq!(value["compilerOptions"]["baseUrl"], "./src//x");
        assert_eq!(value["compilerOptions"]["target"], "es2020");
    }

    #[test]
    fn one_sided_config_is_not_performed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pkg = tmp.path().join("package.json");
        fs::write(&pkg, r#"{"dependencies": {"vite": "5.0.0"}}"#).unwrap();
        let original = ProjectFiles {
            package_json: Some(pkg.clone()),
            ..ProjectFiles::default()
        };
        let candidate = ProjectFiles::default();
        let mut warnings = Vec::new();
        let parser = crate::analyzer::testing::LineScript;
        let result = compare_project_configs(&parser, &original, &candidate, &mut warnings);
        assert_eq!(result, ConfigSimilarity::default());

        let both = ProjectFiles {
            package_json: Some(pkg),
            ..ProjectFiles::default()
        };
        let result = compare_project_configs(&parser, &both, &original, &mut warnings);
        assert!((result.package_json.unwrap().similarity - 1.0).abs() < 1e-9);
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_json_compares_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tsconfig.json");
        fs::write(&path, "{ not json").unwrap();
        let mut warnings = Vec::new();
        assert_eq!(read_json(&path, true, &mut warnings), serde_json::json!({}));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn performed_scores_only() {
        let sim = ConfigSimilarity {
            tsconfig: Some(compare_tsconfig(&json!({}), &json!({}))),
            ..ConfigSimilarity::default()
        };
        assert_eq!(sim.scores(), vec![1.0]);
    }
}

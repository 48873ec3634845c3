//! Value normalization, `var()` resolution and selector specificity.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCT_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([,()/])\s*").expect("valid regex"));
static SHORT_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9a-f]{3}|[0-9a-f]{4})\b").expect("valid regex"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^a-z0-9#._-])(-?(?:\d+\.?\d*|\.\d+))([a-z%]*)").expect("valid regex")
});

/// Case-fold and collapse whitespace in a selector, query or property key.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let folded = WHITESPACE.replace_all(raw.trim(), " ").to_lowercase();
    folded.replace(" ,", ",").replace(", ", ",")
}

/// Canonical form of a declaration value: lower-cased, whitespace collapsed,
/// short hex colors expanded, and numbers re-serialized so that `10.0px`
/// reads `10px`.
#[must_use]
pub fn normalize_value(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let tight = PUNCT_SPACING.replace_all(&collapsed, "$1");
    let hex = SHORT_HEX.replace_all(&tight, |caps: &Captures<'_>| {
        let mut expanded = String::from("#");
        for c in caps[1].chars() {
            expanded.push(c);
            expanded.push(c);
        }
        expanded
    });
    NUMBER
        .replace_all(&hex, |caps: &Captures<'_>| {
            format!("{}{}{}", &caps[1], normalize_number(&caps[2]), &caps[3])
        })
        .into_owned()
}

fn normalize_number(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        Ok(n) => format!("{n}"),
        Err(_) => raw.to_string(),
    }
}

/// Expand `var(--name[, fallback])` references against `vars`.
///
/// A variable already being resolved on the current path is left as
/// `var(--name)`; an unknown variable resolves to its fallback when one is
/// given, otherwise stays as written.
#[must_use]
pub fn resolve_vars(value: &str, vars: &BTreeMap<String, String>) -> String {
    resolve_with_stack(value, vars, &mut Vec::new())
}

fn resolve_with_stack(value: &str, vars: &BTreeMap<String, String>, stack: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("var(") {
        out.push_str(&rest[..start]);
        let inner_start = start + "var(".len();
        let Some(len) = balanced_len(&rest[inner_start..]) else {
            // Unbalanced: keep the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &rest[inner_start..inner_start + len];
        out.push_str(&expand_var(inner, vars, stack));
        rest = &rest[inner_start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Length of the text up to (not including) the `)` that closes an already
/// opened parenthesis.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn expand_var(inner: &str, vars: &BTreeMap<String, String>, stack: &mut Vec<String>) -> String {
    let (name, fallback) = split_top_level_comma(inner);
    let name = name.trim().to_lowercase();
    if stack.contains(&name) {
        return format!("var({name})");
    }
    if let Some(defined) = vars.get(&name) {
        stack.push(name);
        let resolved = resolve_with_stack(defined, vars, stack);
        stack.pop();
        return resolved;
    }
    match fallback {
        Some(fallback) => resolve_with_stack(fallback.trim(), vars, stack),
        None => format!("var({inner})"),
    }
}

fn split_top_level_comma(inner: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return (&inner[..i], Some(&inner[i + 1..])),
            _ => {}
        }
    }
    (inner, None)
}

// -- Specificity ------------------------------------------------------------------

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#[\w-]+").expect("valid regex"));
static CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[\w-]+").expect("valid regex"));
static PSEUDO_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::[\w-]+").expect("valid regex"));
static PSEUDO_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[\w-]+").expect("valid regex"));
static ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s>+~])[a-zA-Z][\w-]*").expect("valid regex"));

/// Selector specificity as `ids * 100 + (classes, attributes, pseudo-classes) * 10
/// + (elements, pseudo-elements)`.
///
/// Available for weighting; rule scoring uses uniform per-selector fractions.
#[must_use]
pub fn specificity(selector: &str) -> u32 {
    fn strip(re: &Regex, text: &str) -> (u32, String) {
        let count = re.find_iter(text).count() as u32;
        (count, re.replace_all(text, " ").into_owned())
    }
    let (attrs, rest) = strip(&ATTRIBUTE, selector);
    let (ids, rest) = strip(&ID, &rest);
    let (pseudo_elements, rest) = strip(&PSEUDO_ELEMENT, &rest);
    let (pseudo_classes, rest) = strip(&PSEUDO_CLASS, &rest);
    let (classes, rest) = strip(&CLASS, &rest);
    let elements = ELEMENT.find_iter(&rest).count() as u32;
    ids * 100 + (classes + attrs + pseudo_classes) * 10 + elements + pseudo_elements
}

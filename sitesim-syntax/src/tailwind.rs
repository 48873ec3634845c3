//! Static evaluation of `tailwind.config.*` modules.
//!
//! The exported object literal is read straight from the syntax tree:
//! `module.exports = {…}`, `export default {…}`, `export default
//! defineConfig({…})` and `const config = {…}; export default config` are
//! recognized. Values that are not literals (function calls, spreads,
//! `require(…)`) are kept as their source text.

use std::path::Path;

use serde_json::{Map, Number, Value};
use sitesim_core::analyzer::{ParseError, ParseOptions};
use sitesim_core::script::Dialect;
use tree_sitter::Node;

use crate::script::language;
use crate::tree;

const CONFIG_PATH: &str = "<tailwind config>";

/// Read the exported config object of a Tailwind config module.
pub fn evaluate(source: &str, dialect: Dialect) -> Result<Value, ParseError> {
    let path = Path::new(CONFIG_PATH);
    let parsed = tree::parse(&language(dialect), path, source, &ParseOptions::default())?;
    tree::reject_errors(&parsed, path)?;
    let root = parsed.root_node();
    let object = exported_value(root, source)
        .and_then(|value| resolve_object(root, value, source))
        .ok_or_else(|| tree::syntax_error(path, "no exported object literal"))?;
    Ok(to_json(object, source))
}

/// The expression assigned to `module.exports` or exported as default.
fn exported_value<'t>(root: Node<'t>, source: &str) -> Option<Node<'t>> {
    tree::named_children(root).into_iter().find_map(|statement| {
        match statement.kind() {
            "expression_statement" => {
                let assignment = statement.named_child(0)?;
                let left = assignment.child_by_field_name("left")?;
                (assignment.kind() == "assignment_expression"
                    && tree::text(left, source) == "module.exports")
                    .then(|| assignment.child_by_field_name("right"))
                    .flatten()
            }
            "export_statement" => {
                let is_default = tree::children(statement)
                    .iter()
                    .any(|c| c.kind() == "default");
                is_default
                    .then(|| statement.child_by_field_name("value"))
                    .flatten()
            }
            _ => None,
        }
    })
}

/// Follow wrappers (`defineConfig(…)`, `satisfies Config`, parentheses) and
/// identifier references down to an object literal.
fn resolve_object<'t>(root: Node<'t>, value: Node<'t>, source: &str) -> Option<Node<'t>> {
    match value.kind() {
        "object" => Some(value),
        "call_expression" => {
            let arguments = value.child_by_field_name("arguments")?;
            let first = arguments.named_child(0)?;
            resolve_object(root, first, source)
        }
        "satisfies_expression" | "as_expression" | "parenthesized_expression" => {
            resolve_object(root, value.named_child(0)?, source)
        }
        "identifier" => {
            let name = tree::text(value, source);
            let init = find_declarator(root, name, source)?;
            resolve_object(root, init, source)
        }
        _ => None,
    }
}

fn find_declarator<'t>(node: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    if node.kind() == "variable_declarator"
        && node
            .child_by_field_name("name")
            .is_some_and(|n| tree::text(n, source) == name)
    {
        return node.child_by_field_name("value");
    }
    tree::named_children(node)
        .into_iter()
        .find_map(|child| find_declarator(child, name, source))
}

fn to_json(node: Node<'_>, source: &str) -> Value {
    let text = tree::text(node, source);
    match node.kind() {
        "object" => Value::Object(object_entries(node, source)),
        "array" => Value::Array(
            tree::named_children(node)
                .into_iter()
                .filter(|c| !matches!(c.kind(), "comment" | "spread_element"))
                .map(|c| to_json(c, source))
                .collect(),
        ),
        "string" => Value::String(tree::unquote(text).to_string()),
        "template_string" if !text.contains("${") => Value::String(tree::unquote(text).to_string()),
        "number" => number(text),
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        "parenthesized_expression" | "satisfies_expression" | "as_expression" => node
            .named_child(0)
            .map_or_else(|| Value::String(text.to_string()), |inner| to_json(inner, source)),
        _ => Value::String(tree::collapse_whitespace(text)),
    }
}

fn object_entries(object: Node<'_>, source: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for entry in tree::named_children(object) {
        match entry.kind() {
            "pair" => {
                let (Some(key), Some(value)) = (
                    entry.child_by_field_name("key"),
                    entry.child_by_field_name("value"),
                ) else {
                    continue;
                };
                map.insert(property_key(key, source), to_json(value, source));
            }
            "shorthand_property_identifier" => {
                let name = tree::text(entry, source).to_string();
                map.insert(name.clone(), Value::String(name));
            }
            "method_definition" => {
                if let Some(name) = entry.child_by_field_name("name") {
                    map.insert(
                        property_key(name, source),
                        Value::String(tree::collapse_whitespace(tree::text(entry, source))),
                    );
                }
            }
            _ => {}
        }
    }
    map
}

fn property_key(key: Node<'_>, source: &str) -> String {
    let text = tree::text(key, source);
    match key.kind() {
        "computed_property_name" => text
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim()
            .to_string(),
        _ => tree::unquote(text).to_string(),
    }
}

fn number(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(text.to_string()), Value::Number)
}

//! JSX/TSX component markup to normalized element trees.
//!
//! Every outermost JSX element in the file is collected; one element is the
//! root as-is, several are wrapped in a fragment. React attribute spellings
//! are folded to their HTML names (`className` to `class`, `htmlFor` to
//! `for`, event handlers lowercased) so components compare against plain
//! markup on equal terms.

use std::collections::BTreeMap;
use std::path::Path;

use sitesim_core::analyzer::{MarkupParser, ParseError, ParseOptions};
use sitesim_core::node::{AttrValue, NormalizedNode};
use sitesim_core::script::Dialect;
use tree_sitter::{Language, Node};

use crate::tree;

/// Stand-in value for attributes bound to an expression.
pub const DYNAMIC_VALUE: &str = "[dynamic]";

pub struct JsxParser;

impl JsxParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JsxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupParser for JsxParser {
    fn parse_markup(
        &self,
        path: &Path,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Option<NormalizedNode>, ParseError> {
        let language: Language = match Dialect::from_path(path) {
            Dialect::Tsx | Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::Jsx | Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        };
        let parsed = tree::parse(&language, path, source, options)?;
        tree::reject_errors(&parsed, path)?;

        let mut roots = Vec::new();
        collect_roots(parsed.root_node(), &mut roots);
        let mut elements: Vec<NormalizedNode> =
            roots.into_iter().map(|n| jsx_node(n, source)).collect();
        Ok(match elements.len() {
            0 => None,
            1 => elements.pop(),
            _ => Some(NormalizedNode::fragment(elements)),
        })
    }
}

fn is_jsx_element(node: Node<'_>) -> bool {
    matches!(node.kind(), "jsx_element" | "jsx_self_closing_element")
}

fn collect_roots<'t>(node: Node<'t>, roots: &mut Vec<Node<'t>>) {
    if is_jsx_element(node) {
        roots.push(node);
        return;
    }
    for child in tree::children(node) {
        collect_roots(child, roots);
    }
}

fn jsx_node(node: Node<'_>, source: &str) -> NormalizedNode {
    let (open, children) = if node.kind() == "jsx_element" {
        (node.child_by_field_name("open_tag"), jsx_children(node, source))
    } else {
        (Some(node), Vec::new())
    };
    let name = open.and_then(|o| o.child_by_field_name("name"));
    match (open, name) {
        (Some(open), Some(name)) => NormalizedNode::element(
            tree::text(name, source),
            attributes(open, source),
            children,
        ),
        _ => NormalizedNode::fragment(children),
    }
}

fn jsx_children(node: Node<'_>, source: &str) -> Vec<NormalizedNode> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    for child in tree::children(node) {
        match child.kind() {
            "jsx_text" | "html_character_reference" => {
                pending.push(' ');
                pending.push_str(tree::text(child, source));
            }
            "jsx_element" | "jsx_self_closing_element" => {
                flush_text(&mut pending, &mut nodes);
                nodes.push(jsx_node(child, source));
            }
            "jsx_expression" => {
                flush_text(&mut pending, &mut nodes);
                nodes.extend(expression(child, source));
            }
            _ => {}
        }
    }
    flush_text(&mut pending, &mut nodes);
    nodes
}

fn flush_text(pending: &mut String, nodes: &mut Vec<NormalizedNode>) {
    let text = tree::collapse_whitespace(pending);
    if !text.is_empty() {
        nodes.push(NormalizedNode::text(text));
    }
    pending.clear();
}

/// `{expr}` child as an expression node; empty and comment-only braces
/// produce nothing.
fn expression(node: Node<'_>, source: &str) -> Option<NormalizedNode> {
    let inner: Vec<_> = tree::named_children(node)
        .into_iter()
        .filter(|c| c.kind() != "comment")
        .collect();
    let (first, last) = (inner.first()?, inner.last()?);
    let body = source.get(first.start_byte()..last.end_byte())?;
    Some(NormalizedNode::expression(tree::collapse_whitespace(body)))
}

fn fold_attribute_name(raw: &str) -> String {
    match raw {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        _ => raw.to_ascii_lowercase(),
    }
}

fn attributes(open: Node<'_>, source: &str) -> BTreeMap<String, AttrValue> {
    let mut attrs = BTreeMap::new();
    for attr in tree::children(open) {
        if attr.kind() != "jsx_attribute" {
            continue;
        }
        let parts = tree::named_children(attr);
        let Some(name) = parts.first() else {
            continue;
        };
        let name = fold_attribute_name(tree::text(*name, source));
        let value = parts.get(1).map_or_else(
            || AttrValue::Text(String::new()),
            |v| attribute_value(&name, *v, source),
        );
        attrs.entry(name).or_insert(value);
    }
    attrs
}

fn attribute_value(name: &str, value: Node<'_>, source: &str) -> AttrValue {
    match value.kind() {
        "string" => {
            let raw = tree::unquote(tree::text(value, source));
            match name {
                "class" => AttrValue::tokens(raw),
                "style" => AttrValue::style(raw),
                _ => AttrValue::Text(raw.to_string()),
            }
        }
        "jsx_expression" if name == "style" => tree::named_children(value)
            .into_iter()
            .find(|c| c.kind() == "object")
            .map_or_else(
                || AttrValue::Text(DYNAMIC_VALUE.to_string()),
                |object| AttrValue::Style(style_object(object, source)),
            ),
        _ => AttrValue::Text(DYNAMIC_VALUE.to_string()),
    }
}

/// `{{ backgroundColor: "red" }}` as `background-color: red`.
fn style_object(object: Node<'_>, source: &str) -> BTreeMap<String, String> {
    tree::named_children(object)
        .into_iter()
        .filter(|c| c.kind() == "pair")
        .filter_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            let value = pair.child_by_field_name("value")?;
            Some((
                kebab_case(tree::unquote(tree::text(key, source))),
                tree::unquote(tree::text(value, source)).trim().to_string(),
            ))
        })
        .collect()
}

fn kebab_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for c in camel.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use sitesim_core::node::NodeKind;

    use super::*;

    fn parse_at(path: &str, source: &str) -> Result<Option<NormalizedNode>, ParseError> {
        JsxParser::new().parse_markup(Path::new(path), source, &ParseOptions::default())
    }

    fn parse(source: &str) -> NormalizedNode {
        parse_at("Card.jsx", source).unwrap().unwrap()
    }

    #[test]
    fn component_markup_is_folded_to_html_names() {
        let root = parse(
            r#"
export default function Card({ title }) {
  return (
    <div className="card  shadow" onClick={handle}>
      <h2>{title}</h2>
      <label htmlFor="name">Some   text</label>
    </div>
  );
}
"#,
        );
        assert_eq!(root.tag(), "div");
        assert_eq!(root.attrs["class"], AttrValue::tokens("card shadow"));
        assert_eq!(root.attrs["onclick"], AttrValue::Text(DYNAMIC_VALUE.to_string()));
        assert_eq!(root.children.len(), 2);

        let heading = &root.children[0];
        assert_eq!(heading.children[0].kind, NodeKind::Expression);
        assert_eq!(heading.children[0].text.as_deref(), Some("title"));

        let label = &root.children[1];
        assert_eq!(label.attrs["for"], AttrValue::Text("name".to_string()));
        assert_eq!(label.text_content(), Some("Some text"));
    }

    #[test]
    fn fragments_have_no_name() {
        let root = parse("const A = () => <><a /><b /></>;");
        assert_eq!(root.kind, NodeKind::Fragment);
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn several_roots_are_wrapped() {
        let root = parse("function A({ on }) { return on ? <a /> : <b />; }");
        assert_eq!(root.kind, NodeKind::Fragment);
        assert_eq!(root.children[0].tag(), "a");
        assert_eq!(root.children[1].tag(), "b");
    }

    #[test]
    fn style_objects_become_declarations() {
        let root = parse(r#"const A = () => <div style={{ backgroundColor: "red", marginTop: 4 }} />;"#);
        let AttrValue::Style(style) = &root.attrs["style"] else {
            panic!("expected a style map");
        };
        assert_eq!(style["background-color"], "red");
        assert_eq!(style["margin-top"], "4");
    }

    #[test]
    fn comment_expressions_are_dropped() {
        let root = parse("const A = () => <div>{/* note */}<i /></div>;");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].tag(), "i");
    }

    #[test]
    fn file_without_markup_is_none() {
        assert!(parse_at("util.jsx", "export const x = 1;").unwrap().is_none());
    }

    #[test]
    fn broken_markup_is_an_error() {
        let err = parse_at("Bad.jsx", "const A = () => <div>;").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn tsx_is_parsed_with_types() {
        let root = parse_at("A.tsx", "const A = (p: Props): JSX.Element => <span>{p.x}</span>;")
            .unwrap()
            .unwrap();
        assert_eq!(root.tag(), "span");
    }

    #[test]
    fn kebab_case_conversion() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(kebab_case("WebkitTransform"), "-webkit-transform");
        assert_eq!(kebab_case("color"), "color");
    }
}

//! HTML documents to normalized element trees.
//!
//! The tree is rooted at `<body>` when the document has one, otherwise at
//! the single top-level element, otherwise at a fragment of all top-level
//! elements. Comments and the doctype are dropped, whitespace in text is
//! collapsed and tag and attribute names are lowercased.

use std::collections::BTreeMap;
use std::path::Path;

use sitesim_core::analyzer::{MarkupParser, ParseError, ParseOptions};
use sitesim_core::node::{AttrValue, NodeKind, NormalizedNode};
use tracing::trace;
use tree_sitter::{Language, Node};

use crate::tree;

pub struct HtmlParser;

impl HtmlParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupParser for HtmlParser {
    fn parse_markup(
        &self,
        path: &Path,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Option<NormalizedNode>, ParseError> {
        let language: Language = tree_sitter_html::LANGUAGE.into();
        let parsed = tree::parse(&language, path, source, options)?;
        if parsed.root_node().has_error() {
            trace!(path = %path.display(), "recovered from malformed HTML");
        }
        let mut top = content(parsed.root_node(), source);
        if let Some(body) = top.iter().find_map(find_body) {
            return Ok(Some(body.clone()));
        }
        Ok(match top.len() {
            0 => None,
            1 => top.pop(),
            _ => Some(NormalizedNode::fragment(top)),
        })
    }
}

fn find_body(node: &NormalizedNode) -> Option<&NormalizedNode> {
    if node.kind == NodeKind::Element && node.name.as_deref() == Some("body") {
        return Some(node);
    }
    node.children.iter().find_map(find_body)
}

/// Element and text children of `parent`, with adjacent text runs merged.
fn content(parent: Node<'_>, source: &str) -> Vec<NormalizedNode> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    for child in tree::children(parent) {
        match child.kind() {
            "text" | "entity" | "raw_text" => {
                pending.push(' ');
                pending.push_str(tree::text(child, source));
            }
            "element" | "script_element" | "style_element" => {
                flush_text(&mut pending, &mut nodes);
                nodes.extend(element(child, source));
            }
            "ERROR" => {
                flush_text(&mut pending, &mut nodes);
                nodes.extend(content(child, source));
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

fn element(node: Node<'_>, source: &str) -> Option<NormalizedNode> {
    let open = tree::children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))?;
    let tag = tree::child_of_kind(open, "tag_name")?;
    Some(NormalizedNode::element(
        tree::text(tag, source).to_ascii_lowercase(),
        attributes(open, source),
        content(node, source),
    ))
}

fn attributes(open: Node<'_>, source: &str) -> BTreeMap<String, AttrValue> {
    let mut attrs = BTreeMap::new();
    for attr in tree::children(open) {
        if attr.kind() != "attribute" {
            continue;
        }
        let Some(name) = tree::child_of_kind(attr, "attribute_name") else {
            continue;
        };
        let name = tree::text(name, source).to_ascii_lowercase();
        let raw = tree::children(attr)
            .into_iter()
            .find_map(|c| match c.kind() {
                "attribute_value" => Some(tree::text(c, source)),
                "quoted_attribute_value" => Some(tree::unquote(tree::text(c, source))),
                _ => None,
            })
            .unwrap_or_default();
        let value = match name.as_str() {
            "class" => AttrValue::tokens(raw),
            "style" => AttrValue::style(raw),
            _ => AttrValue::Text(raw.to_string()),
        };
        // Browsers keep the first of duplicated attributes.
        attrs.entry(name).or_insert(value);
    }
    attrs
}

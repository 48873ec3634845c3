//! Shared tree-sitter plumbing: parser setup, node text and child access.

use std::path::Path;

use sitesim_core::analyzer::{ParseError, ParseOptions};
use tree_sitter::{Language, Node, Parser, Tree};

/// Parse `source` with `language`, honoring the per-file timeout.
pub(crate) fn parse(
    language: &Language,
    path: &Path,
    source: &str,
    options: &ParseOptions,
) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ParseError::Language(e.to_string()))?;
    if let Some(timeout) = options.timeout {
        let micros = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        #[allow(deprecated)]
        parser.set_timeout_micros(micros);
    }
    parser
        .parse(source, None)
        .ok_or_else(|| match options.timeout {
            Some(timeout) => ParseError::Timeout {
                path: path.display().to_string(),
                timeout,
            },
            None => syntax_error(path, "parser produced no tree"),
        })
}

pub(crate) fn syntax_error(path: &Path, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        path: path.display().to_string(),
        message: message.into(),
    }
}

/// Fail when the tree contains error or missing nodes.
pub(crate) fn reject_errors(tree: &Tree, path: &Path) -> Result<(), ParseError> {
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }
    let line = first_error(root).map_or(0, |n| n.start_position().row + 1);
    Err(syntax_error(path, format!("unexpected input at line {line}")))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    children(node)
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    children(node).into_iter().find(|c| c.kind() == kind)
}

/// Strip one pair of matching quotes (`"`, `'` or `` ` ``).
pub(crate) fn unquote(raw: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Collapse every whitespace run to one space and trim.
pub(crate) fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Stylesheets to rule lists.
//!
//! Style rules, `@media`, `@supports` and `@keyframes` blocks are kept with
//! their nesting. Other at-rules with a declaration block (`@font-face`,
//! `@page`) become style rules keyed by their prelude; grouping at-rules
//! such as `@layer` contribute their inner rules. Malformed regions are
//! skipped rather than failing the file.

use std::path::Path;

use sitesim_core::analyzer::{ParseError, ParseOptions, StyleParser};
use sitesim_core::css::{CssRule, Declaration, KeyframeStep, Stylesheet};
use tracing::debug;
use tree_sitter::{Language, Node};

use crate::tree;

pub struct CssParser;

impl CssParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleParser for CssParser {
    fn parse_stylesheet(
        &self,
        path: &Path,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Stylesheet, ParseError> {
        let language: Language = tree_sitter_css::LANGUAGE.into();
        let parsed = tree::parse(&language, path, source, options)?;
        if parsed.root_node().has_error() {
            debug!(path = %path.display(), "skipping malformed CSS regions");
        }
        Ok(Stylesheet {
            rules: rules(parsed.root_node(), source, None),
        })
    }
}

fn rules(parent: Node<'_>, source: &str, enclosing: Option<&str>) -> Vec<CssRule> {
    let mut out = Vec::new();
    for child in tree::named_children(parent) {
        let block = tree::child_of_kind(child, "block");
        match (child.kind(), block) {
            ("rule_set", Some(block)) => {
                let selector = nest_selector(
                    enclosing,
                    &tree::collapse_whitespace(&prelude(child, block, source)),
                );
                out.push(CssRule::Style {
                    selector: selector.clone(),
                    declarations: declarations(block, source),
                });
                out.extend(rules(block, source, Some(&selector)));
            }
            ("media_statement", Some(block)) => out.push(CssRule::Media {
                query: strip_at_keyword(&prelude(child, block, source)),
                rules: rules(block, source, enclosing),
            }),
            ("supports_statement", Some(block)) => out.push(CssRule::Supports {
                condition: strip_at_keyword(&prelude(child, block, source)),
                rules: rules(block, source, enclosing),
            }),
            ("keyframes_statement", _) => out.extend(keyframes(child, source)),
            ("at_rule", Some(block)) => {
                let declarations = declarations(block, source);
                if !declarations.is_empty() {
                    out.push(CssRule::Style {
                        selector: tree::collapse_whitespace(&prelude(child, block, source)),
                        declarations,
                    });
                }
                out.extend(rules(block, source, enclosing));
            }
            _ => {}
        }
    }
    out
}

/// Source text between the start of `node` and its block.
fn prelude(node: Node<'_>, block: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..block.start_byte())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn strip_at_keyword(prelude: &str) -> String {
    let rest = prelude
        .strip_prefix('@')
        .map_or(prelude, |p| p.trim_start_matches(|c: char| !c.is_whitespace()));
    tree::collapse_whitespace(rest)
}

/// Selector of a rule nested inside `enclosing`; `&` stands for the parent.
fn nest_selector(enclosing: Option<&str>, selector: &str) -> String {
    match enclosing {
        None => selector.to_string(),
        Some(parent) if selector.contains('&') => selector.replace('&', parent),
        Some(parent) => format!("{parent} {selector}"),
    }
}

fn declarations(block: Node<'_>, source: &str) -> Vec<Declaration> {
    tree::named_children(block)
        .into_iter()
        .filter(|c| c.kind() == "declaration")
        .filter_map(|c| declaration(c, source))
        .collect()
}

fn declaration(node: Node<'_>, source: &str) -> Option<Declaration> {
    let property = tree::text(tree::child_of_kind(node, "property_name")?, source).trim();
    let (_, rest) = tree::text(node, source).split_once(':')?;
    let (value, important) = strip_important(rest.trim().trim_end_matches(';').trim_end());
    let property = if property.starts_with("--") {
        property.to_string()
    } else {
        property.to_ascii_lowercase()
    };
    let declaration = Declaration::new(property, tree::collapse_whitespace(value));
    Some(if important {
        declaration.important()
    } else {
        declaration
    })
}

fn strip_important(value: &str) -> (&str, bool) {
    if let Some(idx) = value.rfind('!') {
        if value[idx + 1..].trim().eq_ignore_ascii_case("important") {
            return (value[..idx].trim_end(), true);
        }
    }
    (value, false)
}

fn keyframes(node: Node<'_>, source: &str) -> Option<CssRule> {
    let name = tree::text(tree::child_of_kind(node, "keyframes_name")?, source).trim();
    let list = tree::child_of_kind(node, "keyframe_block_list")?;
    let steps = tree::named_children(list)
        .into_iter()
        .filter(|c| c.kind() == "keyframe_block")
        .filter_map(|step| {
            let block = tree::child_of_kind(step, "block")?;
            Some(KeyframeStep {
                selector: tree::collapse_whitespace(&prelude(step, block, source)),
                declarations: declarations(block, source),
            })
        })
        .collect();
    Some(CssRule::Keyframes {
        name: name.to_string(),
        steps,
    })
}

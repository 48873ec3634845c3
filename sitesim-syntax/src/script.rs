//! JavaScript/TypeScript to normalized ASTs and call graphs.
//!
//! Identifiers and literals are replaced with positional aliases (`id0`,
//! `lit0`, …) in first-occurrence order across the file, so consistently
//! renamed code normalizes to the same tree. Property names, import sources
//! and function names keep their raw text. Punctuation is dropped; keywords
//! and operators stay as leaves.

use std::path::Path;

use serde_json::Value;
use sitesim_core::analyzer::{ParseError, ParseOptions, ScriptParser};
use sitesim_core::node::{AliasKind, NodeKind, NormalizationContext, NormalizedNode};
use sitesim_core::script::extract::{CLASS_KINDS, IMPORT_KINDS, IMPORT_SPECIFIER, SCOPE_KINDS};
use sitesim_core::script::{CallGraph, Dialect, ScriptModule};
use tree_sitter::{Language, Node};

use crate::{tailwind, tree};

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

const LITERAL_KINDS: &[&str] = &[
    "string",
    "number",
    "template_string",
    "regex",
    "true",
    "false",
    "null",
    "undefined",
];

const PUNCTUATION: &[&str] = &[
    "(", ")", "{", "}", "[", "]", ";", ",", ".", ":", "?.", "\"", "'", "`", "${",
];

/// Grammar for a script dialect.
pub(crate) fn language(dialect: Dialect) -> Language {
    match dialect {
        Dialect::JavaScript | Dialect::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    }
}

pub struct ScriptFrontend;

impl ScriptFrontend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ScriptFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for ScriptFrontend {
    fn parse_script(
        &self,
        path: &Path,
        source: &str,
        dialect: Dialect,
        options: &ParseOptions,
    ) -> Result<ScriptModule, ParseError> {
        let parsed = tree::parse(&language(dialect), path, source, options)?;
        tree::reject_errors(&parsed, path)?;
        let mut normalizer = Normalizer::new(source);
        let ast = normalizer
            .node(parsed.root_node())
            .unwrap_or_else(|| NormalizedNode::syntax("program"));
        Ok(ScriptModule::new(ast, normalizer.graph))
    }

    fn evaluate_config(&self, source: &str, dialect: Dialect) -> Result<Value, ParseError> {
        tailwind::evaluate(source, dialect)
    }
}

// -- Normalizer ---------------------------------------------------------------

struct Normalizer<'s> {
    source: &'s str,
    context: NormalizationContext,
    /// Enclosing function names, innermost last.
    scopes: Vec<String>,
    anonymous: usize,
    graph: CallGraph,
}

impl<'s> Normalizer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            context: NormalizationContext::new(),
            scopes: Vec::new(),
            anonymous: 0,
            graph: CallGraph::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        tree::text(node, self.source)
    }

    fn node(&mut self, node: Node<'_>) -> Option<NormalizedNode> {
        let kind = node.kind();
        if node.is_extra() || matches!(kind, "comment" | "hash_bang_line") {
            return None;
        }
        if !node.is_named() {
            return (!PUNCTUATION.contains(&kind)).then(|| NormalizedNode::syntax(kind));
        }
        if IDENTIFIER_KINDS.contains(&kind) {
            let raw = self.text(node);
            let alias = self.context.alias(raw, AliasKind::Identifier);
            return Some(NormalizedNode::syntax(kind).named(alias));
        }
        if LITERAL_KINDS.contains(&kind) {
            let raw = self.text(node);
            let alias = self.context.alias(raw, AliasKind::Literal);
            return Some(NormalizedNode::syntax(kind).valued(alias));
        }
        if IMPORT_KINDS.contains(&kind) {
            if let Some(import) = self.import(node) {
                return Some(import);
            }
        }
        if kind == "call_expression" {
            self.record_call(node);
        }

        let scope = SCOPE_KINDS.contains(&kind).then(|| self.scope_name(node));
        let name = match &scope {
            Some(name) => Some(name.clone()),
            None if CLASS_KINDS.contains(&kind) => self.declared_name(node),
            None => None,
        };
        if let Some(scope) = scope {
            self.graph.add_function(&scope);
            self.scopes.push(scope);
        }

        let children: Vec<NormalizedNode> = tree::children(node)
            .into_iter()
            .filter_map(|c| self.node(c))
            .collect();

        if SCOPE_KINDS.contains(&kind) {
            self.scopes.pop();
        }

        let mut normalized = if children.is_empty() && node.child_count() == 0 {
            NormalizedNode::syntax(kind).with_text(self.text(node))
        } else {
            NormalizedNode::with_children(NodeKind::syntax(kind), children)
        };
        normalized.name = name;
        Some(normalized)
    }

    /// Declared name, else the name the function is bound to, else a fresh
    /// `anon_func_N`.
    fn scope_name(&mut self, node: Node<'_>) -> String {
        if let Some(name) = self.declared_name(node) {
            return name;
        }
        let name = format!("anon_func_{}", self.anonymous);
        self.anonymous += 1;
        name
    }

    fn declared_name(&self, node: Node<'_>) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(self.text(name).to_string());
        }
        let parent = node.parent()?;
        let target = match parent.kind() {
            "variable_declarator" => parent.child_by_field_name("name"),
            "assignment_expression" => parent.child_by_field_name("left"),
            "pair" => parent.child_by_field_name("key"),
            "public_field_definition" | "field_definition" => parent
                .child_by_field_name("name")
                .or_else(|| parent.child_by_field_name("property")),
            _ => None,
        }?;
        // Destructuring patterns bind no single name.
        matches!(
            target.kind(),
            "identifier" | "property_identifier" | "member_expression" | "string"
        )
        .then(|| tree::unquote(self.text(target)).to_string())
    }

    fn record_call(&mut self, call: Node<'_>) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        let callee = match function.kind() {
            "identifier" => Some(function),
            "member_expression" => function.child_by_field_name("property"),
            _ => None,
        };
        // Calls outside any function have no caller and add no edge.
        if let (Some(callee), Some(caller)) = (callee, self.scopes.last()) {
            let callee = self.text(callee);
            self.graph.add_edge(caller, callee);
        }
    }

    /// `import … from "x"` / `export … from "x"` as a node named by its
    /// source with one specifier child per imported binding.
    fn import(&self, node: Node<'_>) -> Option<NormalizedNode> {
        let source = node.child_by_field_name("source")?;
        let mut specifiers = Vec::new();
        self.collect_specifiers(node, &mut specifiers);
        Some(
            NormalizedNode::with_children(NodeKind::syntax(node.kind()), specifiers)
                .named(tree::unquote(self.text(source))),
        )
    }

    fn collect_specifiers(&self, node: Node<'_>, out: &mut Vec<NormalizedNode>) {
        let specifier = |name: &str| NormalizedNode::syntax(IMPORT_SPECIFIER).named(name);
        for child in tree::children(node) {
            match child.kind() {
                "import_clause" | "named_imports" | "export_clause" => {
                    self.collect_specifiers(child, out);
                }
                "identifier" if node.kind() == "import_clause" => out.push(specifier("default")),
                "namespace_import" | "namespace_export" | "*" => out.push(specifier("*")),
                "import_specifier" | "export_specifier" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        out.push(specifier(tree::unquote(self.text(name))));
                    }
                }
                _ => {}
            }
        }
    }
}

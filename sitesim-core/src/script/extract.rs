//! Typed views over a normalized script AST: functions, imports, classes and
//! control-flow statements.
//!
//! The extractors rely on the shape produced by the script normalizer:
//! function and class nodes carry their declared name in `name`, import and
//! re-export statements carry their source in `name` with one
//! `import_specifier` child per imported binding.

use std::collections::BTreeSet;

use crate::node::NormalizedNode;

pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
];

/// Function-like nodes that open a new call-graph scope.
pub const SCOPE_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
];

pub const CLASS_KINDS: &[&str] = &["class_declaration", "class"];

pub const IMPORT_KINDS: &[&str] = &["import_statement", "export_statement"];

pub const IMPORT_SPECIFIER: &str = "import_specifier";

pub const CONTROL_FLOW_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
];

fn is_one_of(node: &NormalizedNode, kinds: &[&str]) -> bool {
    kinds.iter().any(|k| node.kind.is(k))
}

/// First `statement_block` child, else the last child.
fn body_of(node: &NormalizedNode) -> Option<&NormalizedNode> {
    node.children
        .iter()
        .find(|c| c.kind.is("statement_block"))
        .or_else(|| node.children.last())
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo<'a> {
    pub name: &'a str,
    pub params: usize,
    pub body: Option<&'a NormalizedNode>,
}

impl<'a> FunctionInfo<'a> {
    fn from_node(node: &'a NormalizedNode) -> Self {
        let params = node
            .children
            .iter()
            .find(|c| c.kind.is("formal_parameters"))
            .map_or_else(
                // `x => …` has a bare identifier parameter.
                || usize::from(node.kind.is("arrow_function")),
                |p| p.children.len(),
            );
        Self {
            name: node.name.as_deref().unwrap_or_default(),
            params,
            body: body_of(node),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportInfo<'a> {
    pub source: &'a str,
    pub names: BTreeSet<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo<'a> {
    pub name: &'a str,
    pub methods: Vec<FunctionInfo<'a>>,
}

#[derive(Debug, Clone)]
pub struct ControlFlowInfo<'a> {
    pub kind: &'a str,
    /// Rendered condition / header.
    pub condition: String,
    pub body: Option<&'a NormalizedNode>,
}

fn collect<'a>(root: &'a NormalizedNode, kinds: &[&str]) -> Vec<&'a NormalizedNode> {
    let mut found = Vec::new();
    root.walk(&mut |node| {
        if is_one_of(node, kinds) {
            found.push(node);
        }
        true
    });
    found
}

pub fn functions(root: &NormalizedNode) -> Vec<FunctionInfo<'_>> {
    collect(root, FUNCTION_KINDS)
        .into_iter()
        .map(FunctionInfo::from_node)
        .collect()
}

pub fn imports(root: &NormalizedNode) -> Vec<ImportInfo<'_>> {
    collect(root, IMPORT_KINDS)
        .into_iter()
        .filter_map(|node| {
            let source = node.name.as_deref()?;
            let names = node
                .children
                .iter()
                .filter(|c| c.kind.is(IMPORT_SPECIFIER))
                .filter_map(|c| c.name.as_deref())
                .collect();
            Some(ImportInfo { source, names })
        })
        .collect()
}

pub fn classes(root: &NormalizedNode) -> Vec<ClassInfo<'_>> {
    collect(root, CLASS_KINDS)
        .into_iter()
        .map(|node| {
            let methods = node
                .children
                .iter()
                .filter(|c| c.kind.is("class_body"))
                .flat_map(|body| &body.children)
                .filter(|c| c.kind.is("method_definition"))
                .map(FunctionInfo::from_node)
                .collect();
            ClassInfo {
                name: node.name.as_deref().unwrap_or_default(),
                methods,
            }
        })
        .collect()
}

pub fn control_flow(root: &NormalizedNode) -> Vec<ControlFlowInfo<'_>> {
    collect(root, CONTROL_FLOW_KINDS)
        .into_iter()
        .map(|node| {
            let body = body_of(node);
            let condition = node
                .children
                .iter()
                .filter(|c| !body.is_some_and(|b| std::ptr::eq(b, *c)))
                .filter(|c| !c.kind.is("else_clause"))
                // bare keyword tokens
                .filter(|c| !(c.children.is_empty() && c.text_content().is_none() && c.name.is_none()))
                .map(NormalizedNode::render)
                .collect::<Vec<_>>()
                .join(" ");
            ControlFlowInfo {
                kind: node.kind.as_str(),
                condition,
                body,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn syn(kind: &str, children: Vec<NormalizedNode>) -> NormalizedNode {
        NormalizedNode::with_children(NodeKind::syntax(kind), children)
    }

    fn ident(alias: &str) -> NormalizedNode {
        NormalizedNode::syntax("identifier").named(alias)
    }

    fn function(name: &str, params: usize) -> NormalizedNode {
        syn(
            "function_declaration",
            vec![
                NormalizedNode::syntax("function"),
                ident("id0"),
                syn("formal_parameters", (0..params).map(|i| ident(&format!("id{}", i + 1))).collect()),
                syn("statement_block", vec![syn("return_statement", vec![])]),
            ],
        )
        .named(name)
    }

    #[test]
    fn functions_report_name_params_and_body() {
        let program = syn("program", vec![function("add", 2), function("noop", 0)]);
        let found = functions(&program);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "add");
        assert_eq!(found[0].params, 2);
        assert!(found[0].body.is_some_and(|b| b.kind.is("statement_block")));
        assert_eq!(found[1].params, 0);
    }

    #[test]
    fn nested_functions_are_found() {
        let outer = syn(
            "function_declaration",
            vec![syn("statement_block", vec![function("inner", 1)])],
        )
        .named("outer");
        let program = syn("program", vec![outer]);
        let names: Vec<_> = functions(&program).iter().map(|f| f.name).collect();
        assert_eq!(names, ["outer", "inner"]);
    }

    #[test]
    fn imports_need_a_source() {
        let program = syn(
            "program",
            vec![
                syn(
                    "import_statement",
                    vec![
                        NormalizedNode::syntax(IMPORT_SPECIFIER).named("default"),
                        NormalizedNode::syntax(IMPORT_SPECIFIER).named("useState"),
                    ],
                )
                .named("react"),
                syn("export_statement", vec![function("f", 0)]),
            ],
        );
        let found = imports(&program);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "react");
        assert_eq!(found[0].names, BTreeSet::from(["default", "useState"]));
    }

    #[test]
    fn class_methods_come_from_class_body() {
        let method = syn(
            "method_definition",
            vec![
                NormalizedNode::syntax("property_identifier").with_text("render"),
                syn("formal_parameters", vec![]),
                syn("statement_block", vec![]),
            ],
        )
        .named("render");
        let class = syn(
            "class_declaration",
            vec![NormalizedNode::syntax("class"), ident("id0"), syn("class_body", vec![method])],
        )
        .named("App");
        let program = syn("program", vec![class]);
        let found = classes(&program);
        assert_eq!(found[0].name, "App");
        assert_eq!(found[0].methods.len(), 1);
        assert_eq!(found[0].methods[0].name, "render");
    }

    #[test]
    fn control_flow_splits_condition_and_body() {
        let stmt = syn(
            "if_statement",
            vec![
                NormalizedNode::syntax("if"),
                syn(
                    "parenthesized_expression",
                    vec![syn(
                        "binary_expression",
                        vec![ident("id0"), NormalizedNode::syntax(">"), NormalizedNode::syntax("number").valued("lit0")],
                    )],
                ),
                syn("statement_block", vec![]),
                syn("else_clause", vec![syn("statement_block", vec![])]),
            ],
        );
        let program = syn("program", vec![stmt]);
        let found = control_flow(&program);
        assert_eq!(found[0].kind, "if_statement");
        assert_eq!(found[0].condition, "(parenthesized_expression (binary_expression id0 > lit0))");
        assert!(found[0].body.is_some_and(|b| b.kind.is("statement_block")));
    }
}

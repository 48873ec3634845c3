use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The kind of a normalized node.
///
/// Markup trees use `Fragment`, `Element`, `Text` and `Expression`; script trees
/// carry the grammar's node type verbatim in `Syntax` (e.g. `call_expression`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Synthetic root holding several top-level siblings.
    Fragment,
    Element,
    Text,
    /// `{expression}` embedded in component markup.
    Expression,
    Syntax(String),
}

impl NodeKind {
    pub fn syntax(kind: &str) -> Self {
        Self::Syntax(kind.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fragment => "fragment",
            Self::Element => "element",
            Self::Text => "text",
            Self::Expression => "expression",
            Self::Syntax(kind) => kind,
        }
    }

    /// True for a script node of the given grammar type.
    #[must_use]
    pub fn is(&self, syntax_kind: &str) -> bool {
        matches!(self, Self::Syntax(k) if k == syntax_kind)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized markup attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    /// Whitespace-separated token list (`class`).
    Tokens(Vec<String>),
    /// Inline style declarations, property -> value.
    Style(BTreeMap<String, String>),
}

impl AttrValue {
    pub fn tokens(raw: &str) -> Self {
        Self::Tokens(raw.split_whitespace().map(str::to_string).collect())
    }

    /// Parse an inline `prop: value; prop: value` declaration list.
    pub fn style(raw: &str) -> Self {
        let map = raw
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(prop, _)| !prop.trim().is_empty())
            .map(|(prop, value)| (prop.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        Self::Style(map)
    }

    /// Canonical string form used for equality and alignment signatures.
    ///
    /// Token lists are sorted and de-duplicated, style maps are rendered as
    /// sorted `prop: value` pairs, so attribute order never matters.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Tokens(tokens) => {
                let mut sorted: Vec<&str> = tokens.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                sorted.dedup();
                sorted.join(" ")
            }
            Self::Style(map) => map
                .iter()
                .map(|(prop, value)| format!("{prop}: {value}"))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// A node of a normalized tree, shared by markup and script comparators.
///
/// Leaves carry at most one of `value` (aliased literal) or `text` (raw leaf
/// text); a node with children carries no standalone text. `attrs` is only
/// populated for markup elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedNode {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub value: Option<String>,
    pub text: Option<String>,
    pub attrs: BTreeMap<String, AttrValue>,
    pub children: Vec<NormalizedNode>,
}

impl NormalizedNode {
    /// Create a leaf node (no children).
    pub fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            text: None,
            attrs: BTreeMap::new(),
            children: vec![],
        }
    }

    /// Create a node with children.
    pub fn with_children(kind: NodeKind, children: Vec<NormalizedNode>) -> Self {
        Self {
            children,
            ..Self::leaf(kind)
        }
    }

    pub fn element(
        tag: impl Into<String>,
        attrs: BTreeMap<String, AttrValue>,
        children: Vec<NormalizedNode>,
    ) -> Self {
        Self {
            name: Some(tag.into()),
            attrs,
            ..Self::with_children(NodeKind::Element, children)
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text).with_text(content)
    }

    pub fn fragment(children: Vec<NormalizedNode>) -> Self {
        Self::with_children(NodeKind::Fragment, children)
    }

    pub fn expression(source: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Expression).with_text(source)
    }

    pub fn syntax(kind: &str) -> Self {
        Self::leaf(NodeKind::syntax(kind))
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn valued(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Tag used in diff paths: the element/function name, else the kind.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.as_str())
    }

    /// Same kind and same name (names compared case-insensitively, since
    /// HTML tags and component names differ only by convention).
    #[must_use]
    pub fn same_tag(&self, other: &Self) -> bool {
        self.kind == other.kind
            && match (&self.name, &other.name) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }

    /// Text standing in for the node's content: its own text or value when it
    /// is a leaf, or the text of a sole text child.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match self.children.as_slice() {
            [] => self.text.as_deref().or(self.value.as_deref()),
            [only] if only.is_text() => only.text.as_deref(),
            _ => None,
        }
    }

    /// Number of top-level nodes that carry content. A fragment or `<body>`
    /// root counts its children, any other root counts as one.
    #[must_use]
    pub fn meaningful_top_level_count(&self) -> usize {
        let is_body = self.kind == NodeKind::Element
            && self.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case("body"));
        if self.kind == NodeKind::Fragment || is_body {
            self.children.len()
        } else {
            1
        }
    }

    /// Whole-subtree equality on canonical attribute forms.
    #[must_use]
    pub fn structurally_equal(&self, other: &Self) -> bool {
        self.same_tag(other)
            && self.value == other.value
            && self.text == other.text
            && self.attrs.len() == other.attrs.len()
            && self
                .attrs
                .iter()
                .zip(&other.attrs)
                .all(|((ka, va), (kb, vb))| ka == kb && va.canonical() == vb.canonical())
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.structurally_equal(b))
    }

    /// Compact s-expression rendering, used for fuzzy comparison of small
    /// subtrees such as loop conditions.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        let leaf = self
            .name
            .as_deref()
            .or(self.value.as_deref())
            .or(self.text.as_deref());
        if self.children.is_empty() {
            match leaf {
                Some(label) => out.push_str(label),
                None => out.push_str(self.kind.as_str()),
            }
            return;
        }
        out.push('(');
        out.push_str(self.kind.as_str());
        if let Some(name) = &self.name {
            out.push(':');
            out.push_str(name);
        }
        for child in &self.children {
            out.push(' ');
            child.render_into(out);
        }
        out.push(')');
    }

    /// Visit nodes in pre-order. Returning `false` from `visit` skips the
    /// node's descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NormalizedNode) -> bool) {
        if visit(self) {
            for child in &self.children {
                child.walk(visit);
            }
        }
    }
}

// -- Identifier / literal aliasing --------------------------------------------

/// What an alias stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKind {
    Identifier,
    Literal,
}

impl AliasKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Identifier => "id",
            Self::Literal => "lit",
        }
    }
}

/// Assigns positional aliases (`id0`, `id1`, …, `lit0`, …) to identifiers
/// and literals, in first-occurrence order, for one normalization scope.
#[derive(Debug, Default)]
pub struct NormalizationContext {
    /// Maps (raw text, kind) -> alias index
    mappings: HashMap<(String, AliasKind), usize>,
    /// Per-kind counters
    counters: HashMap<AliasKind, usize>,
}

impl NormalizationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign the alias index for the given raw text and kind.
    pub fn index(&mut self, raw: &str, kind: AliasKind) -> usize {
        let key = (raw.to_string(), kind);
        if let Some(&idx) = self.mappings.get(&key) {
            return idx;
        }
        let counter = self.counters.entry(kind).or_insert(0);
        let idx = *counter;
        *counter += 1;
        self.mappings.insert(key, idx);
        idx
    }

    /// Get or assign the alias string (`id3`, `lit0`).
    pub fn alias(&mut self, raw: &str, kind: AliasKind) -> String {
        format!("{}{}", kind.prefix(), self.index(raw, kind))
    }

    /// The alias already assigned to `raw`, if any.
    #[must_use]
    pub fn lookup(&self, raw: &str, kind: AliasKind) -> Option<String> {
        self.mappings
            .get(&(raw.to_string(), kind))
            .map(|idx| format!("{}{idx}", kind.prefix()))
    }
}

/// Count the number of nodes in a normalized tree.
pub fn count_nodes(node: &NormalizedNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_attr(raw: &str) -> BTreeMap<String, AttrValue> {
        BTreeMap::from([("class".to_string(), AttrValue::tokens(raw))])
    }

    #[test]
    fn aliases_are_assigned_in_first_occurrence_order() {
        let mut ctx = NormalizationContext::new();
        assert_eq!(ctx.alias("total", AliasKind::Identifier), "id0");
        assert_eq!(ctx.alias("item", AliasKind::Identifier), "id1");
        assert_eq!(ctx.alias("total", AliasKind::Identifier), "id0");
        assert_eq!(ctx.alias("'hello'", AliasKind::Literal), "lit0");
        assert_eq!(ctx.alias("42", AliasKind::Literal), "lit1");
    }

    #[test]
    fn alias_kinds_have_independent_counters() {
        let mut ctx = NormalizationContext::new();
        assert_eq!(ctx.alias("x", AliasKind::Literal), "lit0");
        assert_eq!(ctx.alias("x", AliasKind::Identifier), "id0");
        assert_eq!(ctx.lookup("x", AliasKind::Identifier).as_deref(), Some("id0"));
        assert_eq!(ctx.lookup("y", AliasKind::Identifier), None);
    }

    #[test]
    fn token_canonical_form_ignores_order_and_duplicates() {
        let a = AttrValue::tokens("b a  a");
        let b = AttrValue::tokens("a b");
        assert_eq!(a.canonical(), "a b");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn style_parsing_lowercases_properties_and_trims_values() {
        let style = AttrValue::style("Color: red ;margin:0; ;bogus");
        assert_eq!(style.canonical(), "color: red; margin: 0");
    }

    #[test]
    fn text_content_of_leaf_and_sole_text_child() {
        let p = NormalizedNode::element("p", BTreeMap::new(), vec![NormalizedNode::text("Hi")]);
        assert_eq!(p.text_content(), Some("Hi"));

        let literal = NormalizedNode::syntax("number").valued("lit0");
        assert_eq!(literal.text_content(), Some("lit0"));

        let div = NormalizedNode::element("div", BTreeMap::new(), vec![p.clone(), p]);
        assert_eq!(div.text_content(), None);
    }

    #[test]
    fn meaningful_count_for_fragment_body_and_single_root() {
        let leaf = || NormalizedNode::element("p", BTreeMap::new(), vec![]);
        let fragment = NormalizedNode::fragment(vec![leaf(), leaf(), leaf()]);
        assert_eq!(fragment.meaningful_top_level_count(), 3);

        let body = NormalizedNode::element("BODY", BTreeMap::new(), vec![leaf()]);
        assert_eq!(body.meaningful_top_level_count(), 1);

        let div = NormalizedNode::element("div", BTreeMap::new(), vec![leaf(), leaf()]);
        assert_eq!(div.meaningful_top_level_count(), 1);
    }

    #[test]
    fn structural_equality_uses_canonical_attributes() {
        let a = NormalizedNode::element("div", class_attr("a b"), vec![NormalizedNode::text("x")]);
        let b = NormalizedNode::element("DIV", class_attr("b a"), vec![NormalizedNode::text("x")]);
        let c = NormalizedNode::element("div", class_attr("a"), vec![NormalizedNode::text("x")]);
        assert!(a.structurally_equal(&b));
        assert!(!a.structurally_equal(&c));
    }

    #[test]
    fn render_is_compact_sexpr() {
        let node = NormalizedNode::with_children(
            NodeKind::syntax("binary_expression"),
            vec![
                NormalizedNode::syntax("identifier").named("id0"),
                NormalizedNode::syntax("<"),
                NormalizedNode::syntax("number").valued("lit0"),
            ],
        );
        assert_eq!(node.render(), "(binary_expression id0 < lit0)");
    }

    #[test]
    fn walk_can_prune_subtrees() {
        let tree = NormalizedNode::fragment(vec![
            NormalizedNode::element("div", BTreeMap::new(), vec![NormalizedNode::text("a")]),
            NormalizedNode::text("b"),
        ]);
        let mut seen = Vec::new();
        tree.walk(&mut |n| {
            seen.push(n.tag().to_string());
            n.kind != NodeKind::Element
        });
        assert_eq!(seen, ["fragment", "div", "text"]);
    }

    #[test]
    fn count_nodes_basic() {
        let node = NormalizedNode::fragment(vec![
            NormalizedNode::text("a"),
            NormalizedNode::element("b", BTreeMap::new(), vec![NormalizedNode::text("c")]),
        ]);
        assert_eq!(count_nodes(&node), 4);
    }
}

//! Artifact kinds and the per-kind comparators behind one [`Comparator`] trait.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::align::{ComparisonResult, TreeComparator};
use crate::analyzer::{FrontendRegistry, MarkupParser, ParseError, ParseOptions, ScriptParser, StyleParser};
use crate::config::Config;
use crate::css::{CssComparison, RuleTable, compare_tables};
use crate::node::NormalizedNode;
use crate::script::{Dialect, ScriptComparison, ScriptLogicComparator, ScriptModule};

/// The closed set of file kinds the engine compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Css,
    Jsx,
    Script,
}

impl ArtifactKind {
    pub const ALL: [Self; 4] = [Self::Html, Self::Css, Self::Jsx, Self::Script];

    /// File extensions (without the dot) of this kind.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Html => &["html", "htm"],
            Self::Css => &["css"],
            Self::Jsx => &["jsx", "tsx"],
            Self::Script => &["js", "mjs", "cjs", "ts"],
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Jsx => "jsx",
            Self::Script => "script",
        }
    }

    /// Heading used in text reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::Jsx => "JSX/TSX",
            Self::Script => "JS/TS",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed form of one file.
#[derive(Debug, Clone)]
pub enum Artifact {
    Markup(Option<NormalizedNode>),
    Style(RuleTable),
    Script(ScriptModule),
    /// Unreadable or unparsable; scores 0 against everything.
    Failed(String),
}

/// A scanned file with its source and parsed artifact.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub source: Option<String>,
    pub artifact: Artifact,
}

impl LoadedFile {
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match &self.artifact {
            Artifact::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Comparison detail for one matched pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairDetail {
    Markup(ComparisonResult),
    Style(CssComparison),
    Script(ScriptComparison),
    Failed { reason: String },
}

impl PairDetail {
    #[must_use]
    pub fn score(&self) -> f64 {
        match self {
            Self::Markup(r) => r.similarity,
            Self::Style(r) => r.similarity,
            Self::Script(r) => r.similarity,
            Self::Failed { .. } => 0.0,
        }
    }
}

fn failed_pair(a: &LoadedFile, b: &LoadedFile) -> Option<PairDetail> {
    let reason = match (a.failure(), b.failure()) {
        (Some(ra), Some(rb)) => format!("{ra}; {rb}"),
        (Some(r), None) | (None, Some(r)) => r.to_string(),
        (None, None) => return None,
    };
    Some(PairDetail::Failed { reason })
}

/// One comparator per artifact kind.
pub trait Comparator: Sync {
    fn kind(&self) -> ArtifactKind;

    /// Parse a file's source into this kind's artifact.
    fn load(&self, path: &Path, source: &str) -> Result<Artifact, ParseError>;

    /// Score used by the structural matching stage.
    fn structural_score(&self, a: &LoadedFile, b: &LoadedFile) -> f64;

    /// Full comparison of a matched pair.
    fn compare(&self, a: &LoadedFile, b: &LoadedFile) -> PairDetail;
}

/// Pick the comparator for `kind`.
pub fn comparator_for<'r>(
    kind: ArtifactKind,
    registry: &'r FrontendRegistry,
    config: &Config,
) -> Box<dyn Comparator + 'r> {
    let options = ParseOptions {
        timeout: config.parse_timeout(),
    };
    match kind {
        ArtifactKind::Html | ArtifactKind::Jsx => Box::new(MarkupComparator {
            kind,
            parser: if kind == ArtifactKind::Html {
                registry.html.as_ref()
            } else {
                registry.jsx.as_ref()
            },
            tree: TreeComparator::new(config.ignore_attributes.clone()),
            min_meaningful_nodes: config.min_meaningful_nodes,
            options,
        }),
        ArtifactKind::Css => Box::new(StyleComparator {
            parser: registry.style.as_ref(),
            options,
        }),
        ArtifactKind::Script => Box::new(ScriptComparator {
            parser: registry.script.as_ref(),
            logic: ScriptLogicComparator::new(config.script_weights),
            options,
        }),
    }
}

// -- Markup ---------------------------------------------------------------------

pub struct MarkupComparator<'r> {
    kind: ArtifactKind,
    parser: &'r dyn MarkupParser,
    tree: TreeComparator,
    min_meaningful_nodes: usize,
    options: ParseOptions,
}

impl Comparator for MarkupComparator<'_> {
    fn kind(&self) -> ArtifactKind {
        self.kind
    }

    fn load(&self, path: &Path, source: &str) -> Result<Artifact, ParseError> {
        self.parser
            .parse_markup(path, source, &self.options)
            .map(Artifact::Markup)
    }

    /// Trees with fewer than `min_meaningful_nodes` top-level nodes only
    /// match a tree with the same count under strict whole-subtree equality;
    /// an empty tree never matches.
    fn structural_score(&self, a: &LoadedFile, b: &LoadedFile) -> f64 {
        let (Artifact::Markup(ta), Artifact::Markup(tb)) = (&a.artifact, &b.artifact) else {
            return 0.0;
        };
        let count = |t: &Option<NormalizedNode>| {
            t.as_ref()
                .map_or(0, NormalizedNode::meaningful_top_level_count)
        };
        let (ca, cb) = (count(ta), count(tb));
        if ca < self.min_meaningful_nodes || cb < self.min_meaningful_nodes {
            return match (ta, tb) {
                (Some(x), Some(y)) if ca == cb && ca > 0 && x.structurally_equal(y) => 1.0,
                _ => 0.0,
            };
        }
        self.tree.compare(ta.as_ref(), tb.as_ref()).similarity
    }

    fn compare(&self, a: &LoadedFile, b: &LoadedFile) -> PairDetail {
        if let Some(failed) = failed_pair(a, b) {
            return failed;
        }
        match (&a.artifact, &b.artifact) {
            (Artifact::Markup(ta), Artifact::Markup(tb)) => {
                PairDetail::Markup(self.tree.compare(ta.as_ref(), tb.as_ref()))
            }
            _ => PairDetail::Failed {
                reason: "artifact kind mismatch".to_string(),
            },
        }
    }
}

// -- Style ----------------------------------------------------------------------

pub struct StyleComparator<'r> {
    parser: &'r dyn StyleParser,
    options: ParseOptions,
}

impl Comparator for StyleComparator<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Css
    }

    fn load(&self, path: &Path, source: &str) -> Result<Artifact, ParseError> {
        let sheet = self.parser.parse_stylesheet(path, source, &self.options)?;
        Ok(Artifact::Style(RuleTable::from_stylesheet(&sheet)))
    }

    fn structural_score(&self, a: &LoadedFile, b: &LoadedFile) -> f64 {
        match (&a.artifact, &b.artifact) {
            (Artifact::Style(x), Artifact::Style(y)) => compare_tables(x, y).similarity,
            _ => 0.0,
        }
    }

    fn compare(&self, a: &LoadedFile, b: &LoadedFile) -> PairDetail {
        if let Some(failed) = failed_pair(a, b) {
            return failed;
        }
        match (&a.artifact, &b.artifact) {
            (Artifact::Style(x), Artifact::Style(y)) => PairDetail::Style(compare_tables(x, y)),
            _ => PairDetail::Failed {
                reason: "artifact kind mismatch".to_string(),
            },
        }
    }
}

// -- Script ---------------------------------------------------------------------

pub struct ScriptComparator<'r> {
    parser: &'r dyn ScriptParser,
    logic: ScriptLogicComparator,
    options: ParseOptions,
}

impl Comparator for ScriptComparator<'_> {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Script
    }

    fn load(&self, path: &Path, source: &str) -> Result<Artifact, ParseError> {
        self.parser
            .parse_script(path, source, Dialect::from_path(path), &self.options)
            .map(Artifact::Script)
    }

    fn structural_score(&self, a: &LoadedFile, b: &LoadedFile) -> f64 {
        match (&a.artifact, &b.artifact) {
            (Artifact::Script(x), Artifact::Script(y)) => self.logic.compare(x, y).similarity,
            _ => 0.0,
        }
    }

    fn compare(&self, a: &LoadedFile, b: &LoadedFile) -> PairDetail {
        if let Some(failed) = failed_pair(a, b) {
            return failed;
        }
        match (&a.artifact, &b.artifact) {
            (Artifact::Script(x), Artifact::Script(y)) => {
                PairDetail::Script(self.logic.compare(x, y))
            }
            _ => PairDetail::Failed {
                reason: "artifact kind mismatch".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::testing;

    fn load(cmp: &dyn Comparator, path: &str, source: &str) -> LoadedFile {
        let artifact = cmp
            .load(Path::new(path), source)
            .unwrap_or_else(|e| Artifact::Failed(e.to_string()));
        LoadedFile {
            path: path.to_string(),
            source: Some(source.to_string()),
            artifact,
        }
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ArtifactKind::from_path(Path::new("a/index.HTML")), Some(ArtifactKind::Html));
        assert_eq!(ArtifactKind::from_path(Path::new("App.tsx")), Some(ArtifactKind::Jsx));
        assert_eq!(ArtifactKind::from_path(Path::new("util.ts")), Some(ArtifactKind::Script));
        assert_eq!(ArtifactKind::from_path(Path::new("site.css")), Some(ArtifactKind::Css));
        assert_eq!(ArtifactKind::from_path(Path::new("README.md")), None);
        assert_eq!(ArtifactKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn basename_of_nested_path() {
        let file = LoadedFile {
            path: "src/pages/about.html".to_string(),
            source: None,
            artifact: Artifact::Failed("x".to_string()),
        };
        assert_eq!(file.basename(), "about.html");
    }

    #[test]
    fn single_node_markup_needs_strict_equality() {
        let registry = testing::registry();
        let cmp = comparator_for(ArtifactKind::Html, &registry, &Config::default());
        let a = load(cmp.as_ref(), "a.html", "p hello");
        let same = load(cmp.as_ref(), "b.html", "p hello");
        let near = load(cmp.as_ref(), "c.html", "p hello!");
        let big = load(cmp.as_ref(), "d.html", "p hello\np world");
        assert!((cmp.structural_score(&a, &same) - 1.0).abs() < f64::EPSILON);
        assert!(cmp.structural_score(&a, &near) < f64::EPSILON);
        assert!(cmp.structural_score(&a, &big) < f64::EPSILON);
    }

    #[test]
    fn empty_markup_never_matches_structurally() {
        let registry = testing::registry();
        let cmp = comparator_for(ArtifactKind::Html, &registry, &Config::default());
        let a = load(cmp.as_ref(), "a.html", "");
        let b = load(cmp.as_ref(), "b.html", "  \n");
        assert!(cmp.structural_score(&a, &b) < f64::EPSILON);
    }

    #[test]
    fn multi_node_markup_uses_tree_alignment() {
        let registry = testing::registry();
        let cmp = comparator_for(ArtifactKind::Html, &registry, &Config::default());
        let a = load(cmp.as_ref(), "a.html", "h1 Title\np body");
        let b = load(cmp.as_ref(), "b.html", "h1 Title\np body");
        assert!((cmp.structural_score(&a, &b) - 1.0).abs() < f64::EPSILON);
        assert!((cmp.compare(&a, &b).score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_artifact_scores_zero() {
        let registry = testing::registry();
        let cmp = comparator_for(ArtifactKind::Html, &registry, &Config::default());
        let a = load(cmp.as_ref(), "a.html", "<<broken");
        let b = load(cmp.as_ref(), "b.html", "h1 x\np y");
        assert!(a.failure().is_some());
        assert!(cmp.structural_score(&a, &a.clone()) < f64::EPSILON);
        let detail = cmp.compare(&a, &b);
        assert!(matches!(detail, PairDetail::Failed { .. }));
        assert!(detail.score() < f64::EPSILON);
    }

    #[test]
    fn style_comparator_scores_rule_tables() {
        let registry = testing::registry();
        let cmp = comparator_for(ArtifactKind::Css, &registry, &Config::default());
        let a = load(cmp.as_ref(), "a.css", ".foo { color: #fff; margin: 0 }");
        let b = load(cmp.as_ref(), "b.css", ".foo { color: #FFF }");
        match cmp.compare(&a, &b) {
            PairDetail::Style(r) => {
                assert!((r.similarity - 0.5).abs() < f64::EPSILON);
                assert_eq!(r.partial_selectors, 1);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn pair_detail_serializes_with_kind_tag() {
        let detail = PairDetail::Failed {
            reason: "boom".to_string(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}

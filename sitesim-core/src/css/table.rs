use std::collections::BTreeMap;

use super::value::{normalize_key, normalize_value, resolve_vars};
use super::{CssRule, Declaration, KeyframeStep, Stylesheet};

/// A declaration's normalized value and `!important` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub value: String,
    pub important: bool,
}

/// Normalized property name -> value.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Flattened rule maps of one stylesheet.
///
/// Selector, query, condition and property keys are case-folded and
/// whitespace-normalized; values have `var()` references resolved against
/// `root_vars` and are normalized with [`normalize_value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    pub rules: BTreeMap<String, PropertyMap>,
    /// media query -> selector -> properties
    pub media: BTreeMap<String, BTreeMap<String, PropertyMap>>,
    /// animation name -> step (`0%`, `100%`, …) -> properties
    pub keyframes: BTreeMap<String, BTreeMap<String, PropertyMap>>,
    /// supports condition -> selector -> properties
    pub supports: BTreeMap<String, BTreeMap<String, PropertyMap>>,
    /// Custom properties declared on `:root`.
    pub root_vars: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Default)]
struct Context<'a> {
    media: Option<&'a str>,
    supports: Option<&'a str>,
}

impl RuleTable {
    pub fn from_stylesheet(sheet: &Stylesheet) -> Self {
        let mut table = Self {
            root_vars: collect_root_vars(&sheet.rules),
            ..Self::default()
        };
        table.add_rules(&sheet.rules, Context::default());
        table
    }

    /// Number of top-level selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
            && self.media.is_empty()
            && self.keyframes.is_empty()
            && self.supports.is_empty()
    }

    fn add_rules(&mut self, rules: &[CssRule], ctx: Context<'_>) {
        for rule in rules {
            match rule {
                CssRule::Style {
                    selector,
                    declarations,
                } => self.add_style(selector, declarations, ctx),
                CssRule::Media { query, rules } => {
                    let joined;
                    let query = match ctx.media {
                        Some(outer) => {
                            joined = format!("{outer} and {query}");
                            joined.as_str()
                        }
                        None => query.as_str(),
                    };
                    self.add_rules(
                        rules,
                        Context {
                            media: Some(query),
                            ..ctx
                        },
                    );
                }
                CssRule::Supports { condition, rules } => {
                    let joined;
                    let condition = match ctx.supports {
                        Some(outer) => {
                            joined = format!("{outer} and {condition}");
                            joined.as_str()
                        }
                        None => condition.as_str(),
                    };
                    self.add_rules(
                        rules,
                        Context {
                            supports: Some(condition),
                            ..ctx
                        },
                    );
                }
                CssRule::Keyframes { name, steps } => self.add_keyframes(name, steps),
            }
        }
    }

    fn add_style(&mut self, selector: &str, declarations: &[Declaration], ctx: Context<'_>) {
        let selector = normalize_key(selector);
        let props = self.property_map(declarations);
        if let Some(query) = ctx.media {
            self.media
                .entry(normalize_key(query))
                .or_default()
                .entry(selector.clone())
                .or_default()
                .extend(props.clone());
        }
        // A rule nested in both @supports and @media lands in both buckets.
        if let Some(condition) = ctx.supports {
            self.supports
                .entry(normalize_key(condition))
                .or_default()
                .entry(selector.clone())
                .or_default()
                .extend(props.clone());
        }
        if ctx.media.is_none() && ctx.supports.is_none() {
            self.rules.entry(selector).or_default().extend(props);
        }
    }

    fn add_keyframes(&mut self, name: &str, steps: &[KeyframeStep]) {
        let mut by_step: BTreeMap<String, PropertyMap> = BTreeMap::new();
        for step in steps {
            let props = self.property_map(&step.declarations);
            for part in step.selector.split(',') {
                let key = match normalize_key(part).as_str() {
                    "from" => "0%".to_string(),
                    "to" => "100%".to_string(),
                    other => normalize_value(other),
                };
                by_step.entry(key).or_default().extend(props.clone());
            }
        }
        self.keyframes
            .entry(normalize_key(name))
            .or_default()
            .extend(by_step);
    }

    /// Later declarations of the same property override earlier ones.
    fn property_map(&self, declarations: &[Declaration]) -> PropertyMap {
        declarations
            .iter()
            .map(|decl| {
                let value = normalize_value(&resolve_vars(&decl.value, &self.root_vars));
                (
                    normalize_key(&decl.property),
                    PropertyValue {
                        value,
                        important: decl.important,
                    },
                )
            })
            .collect()
    }
}

/// `--name: value` declarations of top-level `:root` rules (raw values).
fn collect_root_vars(rules: &[CssRule]) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for rule in rules {
        if let CssRule::Style {
            selector,
            declarations,
        } = rule
            && normalize_key(selector).split(',').any(|s| s == ":root")
        {
            for decl in declarations {
                let name = normalize_key(&decl.property);
                if name.starts_with("--") {
                    vars.insert(name, decl.value.trim().to_string());
                }
            }
        }
    }
    vars
}

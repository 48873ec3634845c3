//! Stylesheet model, rule tables and the rule comparator.

pub mod compare;
pub mod table;
pub mod value;

pub use compare::{BucketComparison, CssComparison, KeyframesComparison, compare_tables};
pub use table::{PropertyMap, PropertyValue, RuleTable};

/// A parsed stylesheet as produced by a [`StyleParser`](crate::analyzer::StyleParser).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style {
        selector: String,
        declarations: Vec<Declaration>,
    },
    Media {
        query: String,
        rules: Vec<CssRule>,
    },
    Supports {
        condition: String,
        rules: Vec<CssRule>,
    },
    Keyframes {
        name: String,
        steps: Vec<KeyframeStep>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }

    #[must_use]
    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeStep {
    /// `from`, `to`, or a percentage list such as `0%, 50%`.
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

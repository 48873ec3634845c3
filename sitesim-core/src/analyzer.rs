use std::path::Path;
use std::time::Duration;

use crate::css::Stylesheet;
use crate::node::NormalizedNode;
use crate::script::{Dialect, ScriptModule};

/// Failure of an external parser on one file. Never aborts an analysis: the
/// pipeline turns it into a zero-scoring artifact and a warning.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{path}: syntax error: {message}")]
    Syntax { path: String, message: String },
    #[error("{path}: parser timed out after {} ms", timeout.as_millis())]
    Timeout { path: String, timeout: Duration },
    #[error("failed to load grammar: {0}")]
    Language(String),
    #[error("{path}: source is not valid UTF-8")]
    Encoding { path: String },
}

/// Options handed to every parser call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub timeout: Option<Duration>,
}

/// Turns HTML or component markup into a normalized element tree.
///
/// `Ok(None)` means the source holds no elements at all.
pub trait MarkupParser: Send + Sync {
    fn parse_markup(
        &self,
        path: &Path,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Option<NormalizedNode>, ParseError>;
}

/// Turns script source into a normalized AST plus call graph.
pub trait ScriptParser: Send + Sync {
    fn parse_script(
        &self,
        path: &Path,
        source: &str,
        dialect: Dialect,
        options: &ParseOptions,
    ) -> Result<ScriptModule, ParseError>;

    /// Read the object literal exported by a config module
    /// (`module.exports = {…}` / `export default {…}`) as JSON without
    /// executing it.
    fn evaluate_config(
        &self,
        source: &str,
        dialect: Dialect,
    ) -> Result<serde_json::Value, ParseError>;
}

pub trait StyleParser: Send + Sync {
    fn parse_stylesheet(
        &self,
        path: &Path,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Stylesheet, ParseError>;
}

/// The set of parsers used by an analysis, built once at startup.
pub struct FrontendRegistry {
    pub html: Box<dyn MarkupParser>,
    pub jsx: Box<dyn MarkupParser>,
    pub script: Box<dyn ScriptParser>,
    pub style: Box<dyn StyleParser>,
}

impl std::fmt::Debug for FrontendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendRegistry").finish_non_exhaustive()
    }
}

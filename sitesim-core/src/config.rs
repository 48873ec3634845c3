use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::script::ScriptWeights;

/// Name of the config file looked up by [`Config::load`].
pub const CONFIG_FILE: &str = "sitesim.toml";

/// Configuration for a similarity analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum basename edit ratio for a fuzzy filename match.
    pub fuzzy_threshold: f64,
    /// Minimum comparator score for a structural match.
    pub structural_threshold: f64,
    /// Minimum folder/neighbor score for a contextual match.
    pub contextual_threshold: f64,
    /// Minimum raw-text ratio for a stylesheet content match.
    pub content_threshold: f64,
    /// Markup trees with fewer meaningful top-level nodes only match an
    /// exact structural copy.
    pub min_meaningful_nodes: usize,
    /// Weights of the script sub-scores.
    pub script_weights: ScriptWeights,
    /// Attribute names left out of markup comparison (`data-*` style
    /// trailing wildcards allowed).
    pub ignore_attributes: Vec<String>,
    /// Path substrings to exclude from scanning.
    pub exclude: Vec<String>,
    /// Per-file parser timeout in milliseconds (0 disables it).
    pub parse_timeout_ms: u64,
    /// Worker threads; 0 uses the rayon default.
    pub threads: usize,
    /// Include the class-usage and config-file signals in the overall score.
    pub include_auxiliary: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.75,
            structural_threshold: 0.5,
            contextual_threshold: 0.5,
            content_threshold: 0.6,
            min_meaningful_nodes: 2,
            script_weights: ScriptWeights::default(),
            ignore_attributes: Vec::new(),
            exclude: vec![
                "node_modules".to_string(),
                "dist".to_string(),
                "build".to_string(),
            ],
            parse_timeout_ms: 5000,
            threads: 0,
            include_auxiliary: true,
        }
    }
}

/// Config as stored in sitesim.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    fuzzy_threshold: Option<f64>,
    structural_threshold: Option<f64>,
    contextual_threshold: Option<f64>,
    content_threshold: Option<f64>,
    min_meaningful_nodes: Option<usize>,
    script_weights: Option<ScriptWeights>,
    ignore_attributes: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    parse_timeout_ms: Option<u64>,
    threads: Option<usize>,
    include_auxiliary: Option<bool>,
}

impl Config {
    /// Load `sitesim.toml` from `dir`, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::try_load_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Load an explicit config file; a missing or malformed file is an error.
    pub fn try_load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file_config: FileConfig = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::default();
        config.apply_file_config(file_config);
        Ok(config)
    }

    fn apply_file_config(&mut self, fc: FileConfig) {
        if let Some(v) = fc.fuzzy_threshold {
            self.fuzzy_threshold = v;
        }
        if let Some(v) = fc.structural_threshold {
            self.structural_threshold = v;
        }
        if let Some(v) = fc.contextual_threshold {
            self.contextual_threshold = v;
        }
        if let Some(v) = fc.content_threshold {
            self.content_threshold = v;
        }
        if let Some(v) = fc.min_meaningful_nodes {
            self.min_meaningful_nodes = v;
        }
        if let Some(v) = fc.script_weights {
            self.script_weights = v;
        }
        if let Some(v) = fc.ignore_attributes {
            self.ignore_attributes = v;
        }
        if let Some(v) = fc.exclude {
            self.exclude = v;
        }
        if let Some(v) = fc.parse_timeout_ms {
            self.parse_timeout_ms = v;
        }
        if let Some(v) = fc.threads {
            self.threads = v;
        }
        if let Some(v) = fc.include_auxiliary {
            self.include_auxiliary = v;
        }
    }

    /// Parser timeout, `None` when disabled.
    #[must_use]
    pub fn parse_timeout(&self) -> Option<Duration> {
        (self.parse_timeout_ms > 0).then(|| Duration::from_millis(self.parse_timeout_ms))
    }
}

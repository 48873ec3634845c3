use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::comparator::ArtifactKind;

const TAILWIND_CONFIG_STEM: &str = "tailwind.config";
const TAILWIND_CONFIG_EXTENSIONS: &[&str] = &["js", "cjs", "mjs", "ts"];

/// Configuration for scanning one project tree.
pub struct ScanConfig {
    /// Root directory of the project.
    pub root: PathBuf,
    /// Substrings of the root-relative path that exclude a file.
    pub exclude_patterns: Vec<String>,
}

impl ScanConfig {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            exclude_patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_excludes(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }
}

/// The classified contents of a project tree. Paths are absolute; use
/// [`relative_path`] for display and matching.
#[derive(Debug, Default)]
pub struct ProjectFiles {
    pub root: PathBuf,
    pub files: BTreeMap<ArtifactKind, Vec<PathBuf>>,
    pub package_json: Option<PathBuf>,
    pub tsconfig: Option<PathBuf>,
    pub tailwind_config: Option<PathBuf>,
}

impl ProjectFiles {
    #[must_use]
    pub fn of_kind(&self, kind: ArtifactKind) -> &[PathBuf] {
        self.files.get(&kind).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn total_files(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

fn is_tailwind_config(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(TAILWIND_CONFIG_STEM)
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TAILWIND_CONFIG_EXTENSIONS.contains(&e))
}

/// Keep the shallowest candidate for a config file.
fn keep_shallowest(slot: &mut Option<PathBuf>, path: &Path) {
    let depth = path.components().count();
    if slot.as_ref().is_none_or(|p| depth < p.components().count()) {
        *slot = Some(path.to_path_buf());
    }
}

/// Walk the project and classify every file. Hidden directories and
/// `node_modules` are always skipped.
#[must_use]
pub fn scan_project(config: &ScanConfig) -> ProjectFiles {
    let mut project = ProjectFiles {
        root: config.root.clone(),
        ..ProjectFiles::default()
    };

    for entry in WalkDir::new(&config.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let path = e.path();
            if e.file_type().is_dir()
                && path != config.root.as_path()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                return name != "node_modules" && !name.starts_with('.');
            }
            true
        })
        .flatten()
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_path(&config.root, path);
        if is_excluded(&relative, &config.exclude_patterns) {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some("package.json") => keep_shallowest(&mut project.package_json, path),
            Some("tsconfig.json") => keep_shallowest(&mut project.tsconfig, path),
            _ if is_tailwind_config(path) => keep_shallowest(&mut project.tailwind_config, path),
            _ => {
                if let Some(kind) = ArtifactKind::from_path(path) {
                    project.files.entry(kind).or_default().push(path.to_path_buf());
                }
            }
        }
    }

    project
}

/// `path` relative to `root`, with `/` separators.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a relative path should be excluded based on exclusion patterns.
#[must_use]
pub fn is_excluded(relative: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pattern| relative.contains(pattern.as_str()))
}

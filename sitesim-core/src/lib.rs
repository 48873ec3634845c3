pub mod aggregate;
pub mod align;
pub mod analyzer;
pub mod archive;
pub mod classes;
pub mod cli;
pub mod comparator;
pub mod config;
pub mod config_signal;
pub mod css;
pub mod error;
pub mod matcher;
pub mod node;
pub mod output;
pub mod scanner;
pub mod script;
pub mod similarity;

use std::fs;
use std::io;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use aggregate::AnalysisReport;
use analyzer::{FrontendRegistry, ParseError};
use archive::ProjectSource;
use classes::ClassCounts;
use comparator::{Artifact, ArtifactKind, Comparator, LoadedFile, PairDetail, comparator_for};
use config::Config;
use error::{Error, Result};
use matcher::{FileMatcher, TypeMatches};
use scanner::{ProjectFiles, ScanConfig};

/// Result of comparing two single files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileComparison {
    pub original: String,
    pub candidate: String,
    pub kind: ArtifactKind,
    pub similarity: f64,
    pub detail: PairDetail,
}

/// Everything produced for one artifact kind.
struct KindOutcome {
    matches: TypeMatches,
    classes: (ClassCounts, ClassCounts),
    warnings: Vec<String>,
}

/// Compare two projects (directories or archives).
///
/// Unreadable or unparsable files score 0 and add a warning; only an
/// unusable input path or a pair of projects without any recognized file is
/// an error.
pub fn analyze(
    registry: &FrontendRegistry,
    original: &Path,
    candidate: &Path,
    config: &Config,
) -> Result<AnalysisReport> {
    let original = ProjectSource::open(original)?;
    let candidate = ProjectSource::open(candidate)?;

    if config.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;
        pool.install(|| analyze_roots(registry, original.root(), candidate.root(), config))
    } else {
        analyze_roots(registry, original.root(), candidate.root(), config)
    }
}

/// Run the pipeline on two project directories.
pub fn analyze_roots(
    registry: &FrontendRegistry,
    original: &Path,
    candidate: &Path,
    config: &Config,
) -> Result<AnalysisReport> {
    let scan = |root: &Path| {
        scanner::scan_project(
            &ScanConfig::new(root.to_path_buf()).with_excludes(config.exclude.clone()),
        )
    };
    let (project_a, project_b) = (scan(original), scan(candidate));
    if project_a.total_files() == 0 && project_b.total_files() == 0 {
        return Err(Error::NoRecognizedFiles {
            original: original.to_path_buf(),
            candidate: candidate.to_path_buf(),
        });
    }
    info!(
        original = project_a.total_files(),
        candidate = project_b.total_files(),
        "scanned projects"
    );

    let outcomes: Vec<KindOutcome> = ArtifactKind::ALL
        .par_iter()
        .map(|&kind| {
            let comparator = comparator_for(kind, registry, config);
            analyze_kind(comparator.as_ref(), config, &project_a, &project_b)
        })
        .collect();

    let mut warnings = Vec::new();
    let mut classes_a = ClassCounts::new();
    let mut classes_b = ClassCounts::new();
    let mut per_kind = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        warnings.extend(outcome.warnings);
        merge_counts(&mut classes_a, outcome.classes.0);
        merge_counts(&mut classes_b, outcome.classes.1);
        per_kind.push(outcome.matches);
    }

    let class_usage = classes::compare_class_usage(&classes_a, &classes_b);
    let config_similarity = config_signal::compare_project_configs(
        registry.script.as_ref(),
        &project_a,
        &project_b,
        &mut warnings,
    );

    Ok(aggregate::build_report(
        per_kind,
        class_usage,
        config_similarity,
        config.include_auxiliary,
        warnings,
    ))
}

fn merge_counts(into: &mut ClassCounts, from: ClassCounts) {
    for (class, count) in from {
        *into.entry(class).or_insert(0) += count;
    }
}

fn analyze_kind(
    comparator: &dyn Comparator,
    config: &Config,
    project_a: &ProjectFiles,
    project_b: &ProjectFiles,
) -> KindOutcome {
    let kind = comparator.kind();
    let (originals, mut warnings) = load_all(comparator, project_a);
    let (candidates, more) = load_all(comparator, project_b);
    warnings.extend(more);

    let classes = if matches!(kind, ArtifactKind::Html | ArtifactKind::Jsx) {
        let count = |files: &[LoadedFile]| {
            classes::count_classes(files.iter().filter_map(|f| f.source.as_deref()))
        };
        (count(&originals), count(&candidates))
    } else {
        (ClassCounts::new(), ClassCounts::new())
    };

    let matches = FileMatcher::new(comparator, config).match_files(&originals, &candidates);
    debug!(
        %kind,
        pairs = matches.matches.len(),
        score = matches.aggregate_score(),
        "matched files"
    );
    KindOutcome {
        matches,
        classes,
        warnings,
    }
}

/// Read and parse every file of the comparator's kind, in parallel.
fn load_all(comparator: &dyn Comparator, project: &ProjectFiles) -> (Vec<LoadedFile>, Vec<String>) {
    let loaded: Vec<(LoadedFile, Option<String>)> = project
        .of_kind(comparator.kind())
        .par_iter()
        .map(|path| load_file(comparator, &project.root, path))
        .collect();
    let mut files = Vec::with_capacity(loaded.len());
    let mut warnings = Vec::new();
    for (file, warning) in loaded {
        files.push(file);
        warnings.extend(warning);
    }
    (files, warnings)
}

/// Load one file. A read or parse failure yields a failed artifact plus the
/// warning describing it.
fn load_file(
    comparator: &dyn Comparator,
    root: &Path,
    path: &Path,
) -> (LoadedFile, Option<String>) {
    let relative = scanner::relative_path(root, path);
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            let reason = if e.kind() == io::ErrorKind::InvalidData {
                ParseError::Encoding {
                    path: relative.clone(),
                }
                .to_string()
            } else {
                format!("Failed to read {relative}: {e}")
            };
            warn!(path = %relative, "unreadable file");
            let file = LoadedFile {
                path: relative,
                source: None,
                artifact: Artifact::Failed(reason.clone()),
            };
            return (file, Some(reason));
        }
    };
    let (artifact, warning) = match comparator.load(path, &source) {
        Ok(artifact) => (artifact, None),
        Err(e) => {
            warn!(path = %relative, error = %e, "parse failed");
            let reason = e.to_string();
            (Artifact::Failed(reason.clone()), Some(reason))
        }
    };
    let file = LoadedFile {
        path: relative,
        source: Some(source),
        artifact,
    };
    (file, warning)
}

/// Compare two single files of the same kind.
pub fn compare_files(
    registry: &FrontendRegistry,
    config: &Config,
    original: &Path,
    candidate: &Path,
) -> Result<FileComparison> {
    let kind_of = |path: &Path| {
        ArtifactKind::from_path(path).ok_or_else(|| Error::UnsupportedFile(path.to_path_buf()))
    };
    let (kind, candidate_kind) = (kind_of(original)?, kind_of(candidate)?);
    if kind != candidate_kind {
        return Err(Error::MixedKinds {
            original: kind,
            candidate: candidate_kind,
        });
    }
    let comparator = comparator_for(kind, registry, config);
    let load = |path: &Path| -> Result<LoadedFile> {
        let source = fs::read_to_string(path)?;
        let artifact = comparator
            .load(path, &source)
            .unwrap_or_else(|e| Artifact::Failed(e.to_string()));
        Ok(LoadedFile {
            path: path.display().to_string(),
            source: Some(source),
            artifact,
        })
    };
    let (a, b) = (load(original)?, load(candidate)?);
    let detail = comparator.compare(&a, &b);
    Ok(FileComparison {
        original: a.path,
        candidate: b.path,
        kind,
        similarity: detail.score(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::PredictionLabel;
    use crate::analyzer::testing;
    use crate::matcher::MatchType;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        tmp
    }

    #[test]
    fn identical_projects_score_one() {
        let files = [
            ("index.html", "h1 Title\np Body"),
            ("css/site.css", ".a { color: red; margin: 0 }"),
            ("js/app.js", "function main\nfunction helper"),
        ];
        let (a, b) = (project(&files), project(&files));
        let report =
            analyze_roots(&testing::registry(), a.path(), b.path(), &Config::default()).unwrap();
        assert!((report.overall_similarity - 1.0).abs() < 1e-9);
        assert_eq!(report.prediction.label, PredictionLabel::High);
        assert_eq!(report.types.len(), 3);
        let html = &report.types[&ArtifactKind::Html];
        assert_eq!(html.matched_pairs[0].match_type, MatchType::Exact);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unmatched_candidate_file_lowers_type_score() {
        let a = project(&[("index.html", "h1 Title\np Body")]);
        let b = project(&[
            ("index.html", "h1 Title\np Body"),
            ("zzz.html", "table\nform\nul"),
        ]);
        let report =
            analyze_roots(&testing::registry(), a.path(), b.path(), &Config::default()).unwrap();
        let html = &report.types[&ArtifactKind::Html];
        assert_eq!(html.files_matched, 1);
        assert_eq!(html.unmatched_candidate, ["zzz.html"]);
        assert!(html.aggregate_score < 1.0);
        // one pair at 1.0, one unmatched file at 0
        assert!((html.aggregate_score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_failure_is_a_warning_not_an_error() {
        let a = project(&[("index.html", "h1 Title\np Body")]);
        let b = project(&[("index.html", "<<broken")]);
        let report =
            analyze_roots(&testing::registry(), a.path(), b.path(), &Config::default()).unwrap();
        assert_eq!(report.warnings.len(), 1);
        let pair = &report.types[&ArtifactKind::Html].matched_pairs[0];
        assert!(matches!(pair.detail, PairDetail::Failed { .. }));
        assert!(pair.score.abs() < f64::EPSILON);
    }

    #[test]
    fn no_recognized_files_is_an_error() {
        let a = project(&[("README.md", "# a")]);
        let b = project(&[]);
        assert!(matches!(
            analyze_roots(&testing::registry(), a.path(), b.path(), &Config::default()),
            Err(Error::NoRecognizedFiles { .. })
        ));
    }

    #[test]
    fn class_usage_is_collected_from_markup_sources() {
        let a = project(&[("index.html", "div class=\"flex p-4\"\np x")]);
        let b = project(&[("index.html", "div class=\"flex\"\np x")]);
        let report =
            analyze_roots(&testing::registry(), a.path(), b.path(), &Config::default()).unwrap();
        let usage = report.class_usage.unwrap();
        assert_eq!(usage.shared_classes, ["flex"]);
        assert_eq!(usage.only_in_original, ["p-4"]);
    }

    #[test]
    fn auxiliary_signals_can_be_excluded() {
        let files = [
            ("index.html", "h1 Title\np Body"),
            ("tsconfig.json", r#"{"compilerOptions": {"strict": true}}"#),
        ];
        let a = project(&files);
        let b = project(&[
            ("index.html", "h1 Title\np Body"),
            ("tsconfig.json", r#"{"compilerOptions": {"strict": false}}"#),
        ]);
        let registry = testing::registry();
        let with = analyze_roots(&registry, a.path(), b.path(), &Config::default()).unwrap();
        // (1.0 + 0.0) / 2
        assert!((with.overall_similarity - 0.5).abs() < f64::EPSILON);

        let config = Config {
            include_auxiliary: false,
            ..Config::default()
        };
        let without = analyze_roots(&registry, a.path(), b.path(), &config).unwrap();
        assert!((without.overall_similarity - 1.0).abs() < f64::EPSILON);
        assert!(without.config.tsconfig.is_some());
    }

    #[test]
    fn analyze_runs_on_a_dedicated_pool() {
        let files = [("a.css", ".a { color: red }")];
        let (a, b) = (project(&files), project(&files));
        let config = Config {
            threads: 2,
            ..Config::default()
        };
        let report = analyze(&testing::registry(), a.path(), b.path(), &config).unwrap();
        assert!((report.overall_similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn compare_files_requires_matching_kinds() {
        let dir = project(&[("a.html", "p x"), ("b.css", ".a { color: red }")]);
        let result = compare_files(
            &testing::registry(),
            &Config::default(),
            &dir.path().join("a.html"),
            &dir.path().join("b.css"),
        );
        assert!(matches!(result, Err(Error::MixedKinds { .. })));

        let result = compare_files(
            &testing::registry(),
            &Config::default(),
            &dir.path().join("a.html"),
            &dir.path().join("a.txt"),
        );
        assert!(matches!(result, Err(Error::UnsupportedFile(_))));
    }

    #[test]
    fn compare_files_scores_pair() {
        let dir = project(&[
            ("a.css", ".foo { color: #fff; margin: 0 }"),
            ("b.css", ".foo { color: #ffffff }"),
        ]);
        let result = compare_files(
            &testing::registry(),
            &Config::default(),
            &dir.path().join("a.css"),
            &dir.path().join("b.css"),
        )
        .unwrap();
        assert_eq!(result.kind, ArtifactKind::Css);
        assert!(result.similarity < 1.0);
        let PairDetail::Style(css) = result.detail else {
            panic!("expected a stylesheet comparison");
        };
        assert_eq!(css.partial_selectors, 1);
        assert_eq!(css.missing_selectors, 0);
    }
}

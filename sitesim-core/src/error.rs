use std::path::PathBuf;

use crate::comparator::ArtifactKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Not a directory or supported archive: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to extract archive: {0}")]
    Archive(String),

    #[error(
        "No HTML, CSS, JSX or script files found in {} or {}",
        original.display(),
        candidate.display()
    )]
    NoRecognizedFiles {
        original: PathBuf,
        candidate: PathBuf,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Cannot compare a {original} file with a {candidate} file")]
    MixedKinds {
        original: ArtifactKind,
        candidate: ArtifactKind,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

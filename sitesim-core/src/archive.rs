//! Project ingest: a directory as-is, or an archive unpacked in-process into
//! a temporary directory.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;
use tracing::info;
use zip::ZipArchive;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Unpack `archive` into `dest`. Entries escaping `dest` are skipped by
    /// both readers.
    fn extract(self, archive: &Path, dest: &Path) -> io::Result<()> {
        let file = BufReader::new(File::open(archive)?);
        match self {
            Self::Zip => ZipArchive::new(file)
                .and_then(|mut zip| zip.extract(dest))
                .map_err(io::Error::other),
            Self::Tar => tar::Archive::new(file).unpack(dest),
            Self::TarGz => tar::Archive::new(GzDecoder::new(file)).unpack(dest),
        }
    }
}

/// One side of an analysis, ready to scan. Holds the extraction directory
/// (if any) alive for as long as the value lives.
#[derive(Debug)]
pub struct ProjectSource {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl ProjectSource {
    /// Open a directory or unpack a `.zip` / `.tar` / `.tar.gz` / `.tgz`.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Self {
                root: path.to_path_buf(),
                _extracted: None,
            });
        }
        let format = ArchiveFormat::detect(path)
            .filter(|_| path.is_file())
            .ok_or_else(|| Error::NotADirectory(path.to_path_buf()))?;

        let dir = TempDir::new()?;
        format
            .extract(path, dir.path())
            .map_err(|e| Error::Archive(format!("{}: {e}", path.display())))?;
        info!(archive = %path.display(), "extracted project archive");

        let root = single_top_level_dir(dir.path())?.unwrap_or_else(|| dir.path().to_path_buf());
        Ok(Self {
            root,
            _extracted: Some(dir),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// The sole entry of `dir` when it is a directory.
fn single_top_level_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| !e.file_name().to_string_lossy().starts_with("__MACOSX"));
    match (entries.next(), entries.next()) {
        (Some(only), None) if only.path().is_dir() => Ok(Some(only.path())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_archive_formats() {
        assert_eq!(ArchiveFormat::detect(Path::new("site.zip")), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect(Path::new("site.TAR")), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::detect(Path::new("site.tar.gz")), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect(Path::new("site.tgz")), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect(Path::new("site.rar")), None);
    }

    #[test]
    fn directory_is_used_in_place() {
        let tmp = TempDir::new().unwrap();
        let source = ProjectSource::open(tmp.path()).unwrap();
        assert_eq!(source.root(), tmp.path());
    }

    #[test]
    fn unsupported_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("notes.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            ProjectSource::open(&file),
            Err(Error::NotADirectory(_))
        ));
    }

    #[test]
    fn missing_archive_is_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(ProjectSource::open(&tmp.path().join("gone.zip")).is_err());
    }

    #[test]
    fn single_directory_becomes_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("site")).unwrap();
        assert_eq!(
            single_top_level_dir(tmp.path()).unwrap(),
            Some(tmp.path().join("site"))
        );
        fs::write(tmp.path().join("index.html"), "").unwrap();
        assert_eq!(single_top_level_dir(tmp.path()).unwrap(), None);
    }

    fn write_site(dir: &Path) -> PathBuf {
        let src = dir.join("site");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::write(src.join("index.html"), "<p>hi</p>").unwrap();
        fs::write(src.join("css/site.css"), ".a { color: red; }").unwrap();
        src
    }

    #[test]
    fn extracts_zip_archive() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("site.zip");
        let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
        zip.add_directory("site/", SimpleFileOptions::default()).unwrap();
        zip.start_file("site/index.html", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<p>hi</p>").unwrap();
        zip.finish().unwrap();

        let source = ProjectSource::open(&archive).unwrap();
        assert!(source.root().ends_with("site"));
        assert_eq!(
            fs::read_to_string(source.root().join("index.html")).unwrap(),
            "<p>hi</p>"
        );
    }

    #[test]
    fn extracts_tar_archive() {
        let tmp = TempDir::new().unwrap();
        let src = write_site(tmp.path());
        let archive = tmp.path().join("site.tar");
        let mut builder = tar::Builder::new(File::create(&archive).unwrap());
        builder.append_dir_all("site", &src).unwrap();
        builder.finish().unwrap();

        let source = ProjectSource::open(&archive).unwrap();
        assert!(source.root().join("index.html").is_file());
        assert!(source.root().join("css/site.css").is_file());
    }

    #[test]
    fn extracts_gzipped_tar_archive() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let tmp = TempDir::new().unwrap();
        let src = write_site(tmp.path());
        let archive = tmp.path().join("site.tgz");
        let encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all("site", &src).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let source = ProjectSource::open(&archive).unwrap();
        assert!(source.root().join("index.html").is_file());
    }

    #[test]
    fn corrupt_archive_is_an_archive_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        assert!(matches!(
            ProjectSource::open(&archive),
            Err(Error::Archive(_))
        ));
    }
}

//! Archive format detection and extraction.
//!
//! The format is inferred from the file name, so `backup.tar.gz` unpacks as
//! a gzip-compressed tar while `notes.txt.gz` is a single gzip stream.
//! Extraction never writes outside the destination: zip entries go through
//! `enclosed_name` and tar entries through `unpack`, both of which reject
//! `..` and absolute paths.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors produced while unpacking an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file name does not map to a supported format.
    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The zip container is malformed.
    #[error("invalid zip archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Reading the archive or writing its contents failed.
    #[error("failed to unpack {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Supported archive layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    /// A lone gzip stream, decompressed to a single file.
    Gzip,
}

impl ArchiveFormat {
    /// Infers the format from the file name, case-insensitively.
    ///
    /// ```
    /// use dirsort::archive::ArchiveFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(ArchiveFormat::detect(Path::new("a.ZIP")), Some(ArchiveFormat::Zip));
    /// assert_eq!(ArchiveFormat::detect(Path::new("a.tar.gz")), Some(ArchiveFormat::TarGz));
    /// assert_eq!(ArchiveFormat::detect(Path::new("a.txt")), None);
    /// ```
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".gz") {
            Some(ArchiveFormat::Gzip)
        } else {
            None
        }
    }
}

/// Unpacks `archive` into `destination`, which must already exist.
///
/// On error the destination may hold a partial extraction; the caller owns
/// cleaning it up. The archive itself is never modified.
pub fn extract(archive: &Path, destination: &Path) -> Result<ArchiveFormat, ArchiveError> {
    let format = ArchiveFormat::detect(archive)
        .ok_or_else(|| ArchiveError::UnsupportedFormat(archive.to_path_buf()))?;
    let io_err = |source| ArchiveError::Io {
        path: archive.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(archive).map_err(io_err)?);
    debug!(archive = %archive.display(), ?format, "unpacking");

    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(reader).map_err(|source| ArchiveError::Zip {
                path: archive.to_path_buf(),
                source,
            })?;
            zip.extract(destination)
                .map_err(|source| ArchiveError::Zip {
                    path: archive.to_path_buf(),
                    source,
                })?;
        }
        ArchiveFormat::Tar => {
            tar::Archive::new(reader).unpack(destination).map_err(io_err)?;
        }
        ArchiveFormat::TarGz => {
            tar::Archive::new(GzDecoder::new(reader))
                .unpack(destination)
                .map_err(io_err)?;
        }
        ArchiveFormat::Gzip => {
            let inner_name = archive
                .file_stem()
                .ok_or_else(|| ArchiveError::UnsupportedFormat(archive.to_path_buf()))?;
            let mut decoder = GzDecoder::new(reader);
            let mut out = File::create(destination.join(inner_name)).map_err(io_err)?;
            io::copy(&mut decoder, &mut out).map_err(io_err)?;
        }
    }

    Ok(format)
}

/// Removes a partially populated extraction directory.
pub(crate) fn discard_partial(destination: &Path) {
    if let Err(e) = fs::remove_dir_all(destination) {
        debug!(path = %destination.display(), error = %e, "could not discard partial extraction");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, name: &str, content: &[u8]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(
            ArchiveFormat::detect(Path::new("x.zip")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::detect(Path::new("x.TAR")),
            Some(ArchiveFormat::Tar)
        );
        assert_eq!(
            ArchiveFormat::detect(Path::new("x.tgz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::detect(Path::new("x.Tar.Gz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::detect(Path::new("notes.txt.gz")),
            Some(ArchiveFormat::Gzip)
        );
        assert_eq!(ArchiveFormat::detect(Path::new("x.rar")), None);
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bundle.zip");
        write_zip(&archive, &[("a.txt", "alpha"), ("nested/b.txt", "beta")]);
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();

        let format = extract(&archive, &dest).unwrap();

        assert_eq!(format, ArchiveFormat::Zip);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "alpha");
        assert_eq!(
            fs::read_to_string(dest.join("nested").join("b.txt")).unwrap(),
            "beta"
        );
        assert!(archive.exists());
    }

    #[test]
    fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("backup.tar.gz");
        write_tar_gz(&archive, "inner/c.txt", b"gamma");
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();

        assert_eq!(extract(&archive, &dest).unwrap(), ArchiveFormat::TarGz);
        assert_eq!(
            fs::read_to_string(dest.join("inner").join("c.txt")).unwrap(),
            "gamma"
        );
    }

    #[test]
    fn test_extract_plain_gzip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("notes.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(b"delta").unwrap();
        encoder.finish().unwrap();
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();

        assert_eq!(extract(&archive, &dest).unwrap(), ArchiveFormat::Gzip);
        assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "delta");
    }

    #[test]
    fn test_corrupt_zip_is_an_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();
        let dest = temp.path().join("out");
        fs::create_dir(&dest).unwrap();

        let err = extract(&archive, &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::Zip { .. }));
        assert!(archive.exists());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.rar");
        fs::write(&file, b"x").unwrap();
        let err = extract(&file, temp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedFormat(_)));
    }
}

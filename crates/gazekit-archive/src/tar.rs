//! TAR archive extraction
//!
//! Handles uncompressed, gzip and bzip2 compressed tarballs.

use crate::error::Result;
use crate::{sanitize_path, write_entry, FileInfo, MAX_FILE_SIZE};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use log::warn;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive;

/// Gzip magic bytes (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Bzip2 magic bytes, 'B' 'Z'
const BZIP2_MAGIC: [u8; 2] = [0x42, 0x5a];

/// Stream compression wrapped around a TAR archive or a single file.
///
/// Defaults to `None` (uncompressed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TarCompression {
    /// Uncompressed
    #[default]
    None,
    /// Gzip compressed (.tar.gz, .tgz, .gz)
    Gzip,
    /// Bzip2 compressed (.tar.bz2, .tbz2, .tbz, .bz2)
    Bzip2,
}

impl TarCompression {
    /// Detect compression from the file extension
    #[inline]
    #[must_use = "returns the detected compression type"]
    pub fn from_extension(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "tgz" | "gz" => Self::Gzip,
            "tbz2" | "tbz" | "bz2" => Self::Bzip2,
            _ => Self::None,
        }
    }

    /// Detect compression from file magic bytes
    #[inline]
    #[must_use = "returns the detected compression type"]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.len() < 4 {
            return Self::None;
        }

        if bytes[..2] == GZIP_MAGIC {
            return Self::Gzip;
        }

        if bytes[..2] == BZIP2_MAGIC {
            return Self::Bzip2;
        }

        Self::None
    }

    /// Wrap `reader` in the matching decoder.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            Self::Bzip2 => Box::new(BzDecoder::new(reader)),
        }
    }
}

impl std::fmt::Display for TarCompression {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TarCompression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" | "plain" | "tar" => Ok(Self::None),
            "gzip" | "gz" | "tgz" => Ok(Self::Gzip),
            "bzip2" | "bz2" | "tbz2" | "tbz" => Ok(Self::Bzip2),
            _ => Err(format!(
                "Unknown compression '{s}'. Expected: none, gzip, bzip2"
            )),
        }
    }
}

fn open_archive(path: &Path, compression: TarCompression) -> Result<Archive<Box<dyn Read>>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(Archive::new(compression.decoder(reader)))
}

/// Extract all regular files of a TAR archive below `destination`.
///
/// Directories, links and macOS resource forks (`._name`) are skipped,
/// entry paths are sanitized, and entries larger than [`MAX_FILE_SIZE`] are
/// skipped with a warning.
///
/// # Examples
///
/// ```no_run
/// use gazekit_archive::tar::{extract_tar, TarCompression};
/// use std::path::Path;
///
/// let files = extract_tar(
///     Path::new("archive.tar.gz"),
///     Path::new("out"),
///     TarCompression::Gzip,
///     false,
/// )?;
/// # Ok::<(), gazekit_archive::ArchiveError>(())
/// ```
pub fn extract_tar(
    source: &Path,
    destination: &Path,
    compression: TarCompression,
    resume: bool,
) -> Result<Vec<PathBuf>> {
    let mut archive = open_archive(source, compression)?;
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let raw_path = entry.path()?.to_path_buf();
        let size = entry.header().size()?;

        let Some(sanitized_path) = sanitize_path(&raw_path) else {
            let raw_name = raw_path.to_string_lossy();
            warn!("Skipping invalid path: {raw_name} (path traversal attempt or empty)");
            continue;
        };

        if sanitized_path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("._"))
        {
            continue;
        }

        if size > MAX_FILE_SIZE {
            warn!(
                "Skipping large file: {} ({size} bytes exceeds {MAX_FILE_SIZE} bytes limit)",
                sanitized_path.display()
            );
            continue;
        }

        let target = destination.join(sanitized_path);
        write_entry(&mut entry, &target, Some(size), resume)?;
        files.push(target);
    }

    Ok(files)
}

/// List regular files in a TAR archive without extracting contents
pub fn list_tar_contents(path: &Path, compression: TarCompression) -> Result<Vec<FileInfo>> {
    let mut archive = open_archive(path, compression)?;
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        files.push(FileInfo {
            name: entry.path()?.to_string_lossy().to_string(),
            size: Some(entry.header().size()?),
        });
    }

    Ok(files)
}

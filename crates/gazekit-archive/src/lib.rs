//! Archive extraction for gazekit datasets
//!
//! Dataset resources are published as ZIP files, tarballs, or single
//! compressed files. This crate extracts them to disk, optionally descending
//! into archives nested inside archives.
//!
//! # Features
//!
//! - **ZIP archives**: extraction and listing
//! - **TAR archives**: uncompressed, gzip and bzip2 compressed
//! - **Compressed files**: single `.gz` and `.bz2` files
//! - **Recursive extraction**: nested archives are extracted next to themselves
//! - **Resume**: files already on disk with the expected size are skipped
//!
//! # Usage
//!
//! ```no_run
//! use gazekit_archive::{extract_archive, ExtractOptions};
//! use std::path::Path;
//!
//! let files = extract_archive(
//!     Path::new("downloads/GazeBase_v2_0.zip"),
//!     Path::new("raw"),
//!     &ExtractOptions::default(),
//! )?;
//! println!("{} files extracted", files.len());
//! # Ok::<(), gazekit_archive::ArchiveError>(())
//! ```

pub mod compressed;
pub mod error;
pub mod extract;
pub mod tar;
pub mod zip;

use log::debug;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

// =============================================================================
// Archive Constants
// =============================================================================

/// Maximum size for a single file within an archive (10 GB).
///
/// Entries exceeding this limit are skipped during extraction.
pub const MAX_FILE_SIZE: u64 = 10_000_000_000;

/// Maximum nesting depth for recursive archive extraction.
pub const MAX_NESTING_DEPTH: usize = 10;

pub use self::error::{ArchiveError, Result};
pub use self::extract::{extract_archive, list_contents, ArchiveFormat, ExtractOptions};
pub use self::tar::TarCompression;

/// Information about a file inside an archive, without extracting it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileInfo {
    /// Path within the archive
    pub name: String,
    /// Uncompressed size, when the format records it
    pub size: Option<u64>,
}

/// Sanitize an entry path to prevent path traversal (e.g. `../../etc/passwd`).
///
/// Only normal components are kept, so parent references, current directory
/// markers, roots and drive prefixes are dropped. Returns `None` when nothing
/// is left.
#[inline]
pub(crate) fn sanitize_path(path: &Path) -> Option<PathBuf> {
    let sanitized: PathBuf = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Stream `reader` into `target`, creating parent directories.
///
/// With `resume` set and a known `size`, an existing file of exactly that
/// size is left alone. Returns whether the file was written.
pub(crate) fn write_entry<R: Read>(
    reader: &mut R,
    target: &Path,
    size: Option<u64>,
    resume: bool,
) -> io::Result<bool> {
    if resume {
        if let (Some(size), Ok(metadata)) = (size, fs::metadata(target)) {
            if metadata.is_file() && metadata.len() == size {
                debug!("Skipping existing file {}", target.display());
                return Ok(false);
            }
        }
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(target)?;
    io::copy(reader, &mut file)?;
    Ok(true)
}

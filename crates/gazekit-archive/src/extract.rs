//! Format dispatch, recursive extraction and top-level directory removal

use crate::compressed::decompress_file;
use crate::error::{ArchiveError, Result};
use crate::tar::{extract_tar, list_tar_contents, TarCompression};
use crate::zip::{extract_zip, list_zip_contents};
use crate::{FileInfo, MAX_NESTING_DEPTH};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Container format, detected from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar`, `.tar.gz`, `.tgz`, `.tar.bz2`, `.tbz2`, `.tbz`
    Tar(TarCompression),
    /// A single compressed file, `.gz` or `.bz2`
    Compressed(TarCompression),
}

impl ArchiveFormat {
    /// Detect the format from the (case-insensitive) file name.
    ///
    /// Returns `None` for anything that is not a supported archive.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Tar(TarCompression::Gzip))
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz")
        {
            Some(Self::Tar(TarCompression::Bzip2))
        } else if name.ends_with(".tar") {
            Some(Self::Tar(TarCompression::None))
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".gz") {
            Some(Self::Compressed(TarCompression::Gzip))
        } else if name.ends_with(".bz2") {
            Some(Self::Compressed(TarCompression::Bzip2))
        } else {
            None
        }
    }
}

/// Options for [`extract_archive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Extract archives found among the extracted files
    pub recursive: bool,
    /// Remove archives once they have been extracted
    pub remove_finished: bool,
    /// Collapse a single top-level directory into the destination
    pub remove_top_level: bool,
    /// Skip files that already exist with the expected size
    pub resume: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            remove_finished: false,
            remove_top_level: true,
            resume: true,
        }
    }
}

/// Extract `source` into `destination` and return the paths of the files
/// written (or kept, with `resume`).
///
/// With `recursive`, nested archives are extracted into the directory that
/// contains them, down to [`MAX_NESTING_DEPTH`] levels. A nested archive stays
/// in the returned list unless `remove_finished` deletes it.
///
/// # Errors
///
/// - [`ArchiveError::NotFound`] if `source` does not exist
/// - [`ArchiveError::UnknownFileType`] if the file name has no supported suffix
/// - [`ArchiveError::TooDeep`] if nesting exceeds [`MAX_NESTING_DEPTH`]
/// - format and I/O errors from the individual extractors
///
/// # Examples
///
/// ```no_run
/// use gazekit_archive::{extract_archive, ExtractOptions};
/// use std::path::Path;
///
/// let options = ExtractOptions {
///     remove_finished: true,
///     ..ExtractOptions::default()
/// };
/// extract_archive(Path::new("data.tar.gz"), Path::new("raw"), &options)?;
/// # Ok::<(), gazekit_archive::ArchiveError>(())
/// ```
pub fn extract_archive(
    source: &Path,
    destination: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    if !source.is_file() {
        return Err(ArchiveError::NotFound {
            path: source.to_path_buf(),
        });
    }
    let format = detect(source)?;

    info!(
        "Extracting {} to {}",
        source.display(),
        destination.display()
    );
    let mut files = extract_nested(source, destination, format, options, 0)?;

    if options.remove_top_level {
        files = remove_top_level(destination, files)?;
    }
    if options.remove_finished {
        fs::remove_file(source)?;
    }

    debug!("{} files extracted from {}", files.len(), source.display());
    Ok(files)
}

/// List the files inside an archive without extracting them.
///
/// A single compressed file lists as its decompressed name with unknown size.
pub fn list_contents(path: &Path) -> Result<Vec<FileInfo>> {
    if !path.is_file() {
        return Err(ArchiveError::NotFound {
            path: path.to_path_buf(),
        });
    }
    match detect(path)? {
        ArchiveFormat::Zip => list_zip_contents(path),
        ArchiveFormat::Tar(compression) => list_tar_contents(path, compression),
        ArchiveFormat::Compressed(_) => Ok(path
            .file_stem()
            .map(|stem| FileInfo {
                name: stem.to_string_lossy().to_string(),
                size: None,
            })
            .into_iter()
            .collect()),
    }
}

fn detect(path: &Path) -> Result<ArchiveFormat> {
    ArchiveFormat::from_path(path).ok_or_else(|| ArchiveError::UnknownFileType {
        path: path.to_path_buf(),
    })
}

fn extract_single(
    source: &Path,
    destination: &Path,
    format: ArchiveFormat,
    resume: bool,
) -> Result<Vec<PathBuf>> {
    match format {
        ArchiveFormat::Zip => extract_zip(source, destination, resume),
        ArchiveFormat::Tar(compression) => extract_tar(source, destination, compression, resume),
        ArchiveFormat::Compressed(compression) => {
            Ok(vec![decompress_file(source, destination, compression)?])
        }
    }
}

fn extract_nested(
    source: &Path,
    destination: &Path,
    format: ArchiveFormat,
    options: &ExtractOptions,
    depth: usize,
) -> Result<Vec<PathBuf>> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ArchiveError::TooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    let extracted = extract_single(source, destination, format, options.resume)?;
    if !options.recursive {
        return Ok(extracted);
    }

    let mut files = Vec::with_capacity(extracted.len());
    for path in extracted {
        let Some(nested) = ArchiveFormat::from_path(&path) else {
            files.push(path);
            continue;
        };

        debug!("Extracting nested archive {} (depth {})", path.display(), depth + 1);
        let parent = path.parent().unwrap_or(destination).to_path_buf();
        let inner = extract_nested(&path, &parent, nested, options, depth + 1)?;

        if options.remove_finished {
            fs::remove_file(&path)?;
        } else {
            files.push(path);
        }
        files.extend(inner);
    }

    Ok(files)
}

/// Move the contents of a lone top-level directory up into `destination`.
fn remove_top_level(destination: &Path, files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(destination)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;

    let [top] = entries.as_slice() else {
        return Ok(files);
    };
    if !top.is_dir() {
        return Ok(files);
    }

    // The directory may contain an entry with its own name.
    let staging = destination.join(format!(
        ".{}.collapse",
        top.file_name().unwrap_or_default().to_string_lossy()
    ));
    fs::rename(top, &staging)?;
    for entry in fs::read_dir(&staging)? {
        let entry = entry?;
        fs::rename(entry.path(), destination.join(entry.file_name()))?;
    }
    fs::remove_dir(&staging)?;

    debug!("Removed top-level directory {}", top.display());
    Ok(files
        .into_iter()
        .map(|file| match file.strip_prefix(top) {
            Ok(relative) => destination.join(relative),
            Err(_) => file,
        })
        .collect())
}

//! ZIP archive extraction
//!
//! Entries are streamed straight to disk; nothing is buffered in memory.

use crate::error::{ArchiveError, Result};
use crate::{sanitize_path, write_entry, FileInfo, MAX_FILE_SIZE};
use log::warn;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extract all files of a ZIP archive below `destination`.
///
/// Directory entries are skipped, entry paths are sanitized, and entries
/// larger than [`MAX_FILE_SIZE`] are skipped with a warning. Returns the
/// paths of all extracted files, including those kept by `resume`.
///
/// # Errors
///
/// Returns `ArchiveError` if:
/// - Archive cannot be opened
/// - Archive is invalid or corrupted
/// - Archive is password-protected
///
/// # Examples
///
/// ```no_run
/// use gazekit_archive::zip::extract_zip;
/// use std::path::Path;
///
/// let files = extract_zip(Path::new("archive.zip"), Path::new("out"), false)?;
/// for file in files {
///     println!("Extracted: {}", file.display());
/// }
/// # Ok::<(), gazekit_archive::ArchiveError>(())
/// ```
pub fn extract_zip(source: &Path, destination: &Path, resume: bool) -> Result<Vec<PathBuf>> {
    let file = File::open(source)?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader)?;

    let mut files = Vec::new();

    for i in 0..archive.len() {
        let mut zip_file = archive.by_index(i)?;

        if zip_file.is_dir() {
            continue;
        }

        if zip_file.encrypted() {
            return Err(ArchiveError::PasswordProtected);
        }

        let raw_name = zip_file.name().to_string();
        let size = zip_file.size();

        let Some(sanitized_path) = sanitize_path(Path::new(&raw_name)) else {
            warn!("Skipping invalid path: {raw_name} (path traversal attempt or empty)");
            continue;
        };

        if size > MAX_FILE_SIZE {
            warn!(
                "Skipping large file: {raw_name} ({size} bytes exceeds {MAX_FILE_SIZE} bytes limit)"
            );
            continue;
        }

        let target = destination.join(sanitized_path);
        write_entry(&mut zip_file, &target, Some(size), resume)?;
        files.push(target);
    }

    Ok(files)
}

/// List files in a ZIP archive without extracting contents
///
/// Reads only the central directory.
pub fn list_zip_contents(path: &Path) -> Result<Vec<FileInfo>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader)?;

    let mut files = Vec::new();

    for i in 0..archive.len() {
        let zip_file = archive.by_index_raw(i)?;

        if zip_file.is_dir() {
            continue;
        }

        files.push(FileInfo {
            name: zip_file.name().to_string(),
            size: Some(zip_file.size()),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    /// Helper: Create a simple test ZIP file
    fn create_test_zip(dir: &TempDir) -> Result<PathBuf> {
        let path = dir.path().join("data.zip");
        let mut zip = ZipWriter::new(File::create(&path)?);
        let options: FileOptions<()> = FileOptions::default();

        zip.add_directory("subdir/", options)?;

        zip.start_file("file1.csv", options)?;
        zip.write_all(b"time,x,y\n0,1,2\n")?;

        zip.start_file("subdir/file2.csv", options)?;
        zip.write_all(b"time,x,y\n1,2,3\n")?;

        zip.finish()?;
        Ok(path)
    }

    #[test]
    fn test_extract_zip_basic() {
        let dir = TempDir::new().unwrap();
        let zip = create_test_zip(&dir).unwrap();
        let out = dir.path().join("out");

        let files = extract_zip(&zip, &out, false).unwrap();

        assert_eq!(files, vec![out.join("file1.csv"), out.join("subdir/file2.csv")]);
        assert_eq!(
            std::fs::read_to_string(out.join("subdir/file2.csv")).unwrap(),
            "time,x,y\n1,2,3\n"
        );
    }

    #[test]
    fn test_list_zip_contents() {
        let dir = TempDir::new().unwrap();
        let zip = create_test_zip(&dir).unwrap();

        let files = list_zip_contents(&zip).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["file1.csv", "subdir/file2.csv"]);
        assert_eq!(files[0].size, Some(15));
    }

    #[test]
    fn test_invalid_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();

        let err = extract_zip(&path, dir.path(), false).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidZip(_)));
    }

    #[test]
    fn test_nonexistent_file() {
        let err = extract_zip(Path::new("/nonexistent/data.zip"), Path::new("out"), false)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
    }
}

//! Error types for archive operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during archive operations
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// IO error during archive operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid ZIP archive format
    #[error("Invalid ZIP archive: {0}")]
    InvalidZip(#[from] zip::result::ZipError),

    /// Archive is password-protected
    #[error("Archive is password-protected")]
    PasswordProtected,

    /// File name does not end in a supported archive or compression suffix
    #[error("unsupported file type: {}", path.display())]
    UnknownFileType {
        /// Path of the offending file
        path: PathBuf,
    },

    /// Archive nesting exceeds depth limit
    #[error("Archive nesting too deep (max depth {max})")]
    TooDeep {
        /// Maximum allowed nesting depth
        max: usize,
    },

    /// Source archive does not exist
    #[error("archive not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

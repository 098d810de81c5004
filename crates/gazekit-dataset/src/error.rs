//! Error types for dataset operations

use crate::content::ContentType;
use gazekit_archive::ArchiveError;
use gazekit_core::GazekitError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while defining, fetching or loading a dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Table, gaze or event error from `gazekit-core`
    #[error(transparent)]
    Core(#[from] GazekitError),

    /// Extraction error from `gazekit-archive`
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// IO error while reading or writing dataset files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed dataset definition
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid filename format
    #[error("invalid filename format: {0}")]
    Regex(#[from] regex::Error),

    /// Directory could not be turned into a search pattern
    #[error("invalid search pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// The definition lists no resources at all
    #[error("resources must be specified to download dataset.")]
    NoResources,

    /// A content type marked as present has no resources
    #[error("'{0}' resources must be specified to download dataset.")]
    MissingResources(ContentType),

    /// HTTP request failed or returned an error status
    #[error("request to {url} failed: {reason}")]
    Http {
        /// Requested URL
        url: String,
        /// Transport or status error
        reason: String,
    },

    /// Downloaded file does not have the expected checksum
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        /// Downloaded file
        path: PathBuf,
        /// MD5 from the definition
        expected: String,
        /// MD5 of the file on disk
        actual: String,
    },

    /// Fetching a resource failed
    #[error("downloading resource {resource} failed.")]
    DownloadFailed {
        /// Resource identifier from the definition
        resource: String,
        /// Underlying failure
        #[source]
        source: Box<DatasetError>,
    },

    /// Scanning found no files matching the filename format
    #[error("no {content} files found in {} matching '{pattern}'", path.display())]
    NoFilesFound {
        /// Content type that was scanned
        content: ContentType,
        /// Scanned directory
        path: PathBuf,
        /// Filename format
        pattern: String,
    },

    /// The definition has no filename format for a content type it loads
    #[error("no filename_format given for {0}")]
    MissingFilenameFormat(ContentType),

    /// Gaze file with an extension no loader reads
    #[error("unsupported file format '{extension}' of {}. Supported formats are: csv, tsv, txt, feather, ipc, arrow, asc", path.display())]
    UnsupportedFileFormat {
        /// File that was to be loaded
        path: PathBuf,
        /// Its extension, empty when it has none
        extension: String,
    },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

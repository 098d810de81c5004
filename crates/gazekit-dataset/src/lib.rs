//! # gazekit-dataset
//!
//! Declarative eye-tracking datasets: a YAML [`DatasetDefinition`] says where
//! the files come from and how they are laid out, and this crate downloads,
//! extracts, scans and loads them.
//!
//! ## Workflow
//!
//! 1. [`download_dataset`] fetches every resource into `downloads/`, checking
//!    MD5 checksums, and extracts archives into `raw/`,
//!    `precomputed_events/` and `precomputed_reading_measures/`
//! 2. [`scan_dataset`] matches file names against the definition's
//!    `filename_format` and collects the named groups into a fileinfo frame
//! 3. [`load_gaze_files`] / [`load_event_files`] read every matching file
//!
//! ```no_run
//! use gazekit_dataset::{ContentType, Dataset, DatasetDefinition, DownloadOptions};
//!
//! let definition = DatasetDefinition::from_yaml("datasets/GazeBase.yaml")?;
//! let mut dataset = Dataset::new(definition, "data");
//! dataset.download(&DownloadOptions::default())?;
//! dataset.scan()?;
//! let fileinfo = dataset.fileinfo(ContentType::Gaze).unwrap();
//! println!("{} gaze files", fileinfo.height());
//! # Ok::<(), gazekit_dataset::DatasetError>(())
//! ```

pub mod content;
pub mod dataset;
pub mod definition;
pub mod download;
pub mod error;
pub mod filename;
pub mod paths;

pub use content::ContentType;
pub use dataset::{load_event_files, load_gaze_files, scan_dataset, Dataset};
pub use definition::{DatasetDefinition, HasFiles, ResourceDefinition};
pub use download::{download_dataset, download_file, extract_dataset, md5_file, DownloadOptions};
pub use error::{DatasetError, Result};
pub use paths::{DatasetPaths, DirNames};

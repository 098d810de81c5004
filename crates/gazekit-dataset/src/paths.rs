//! On-disk layout of a dataset

use crate::content::ContentType;
use std::path::{Path, PathBuf};

/// Names of the directories below the dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNames {
    pub downloads: String,
    pub raw: String,
    pub precomputed_events: String,
    pub precomputed_reading_measures: String,
    pub events: String,
    pub preprocessed: String,
}

impl Default for DirNames {
    fn default() -> Self {
        Self {
            downloads: "downloads".to_string(),
            raw: "raw".to_string(),
            precomputed_events: "precomputed_events".to_string(),
            precomputed_reading_measures: "precomputed_reading_measures".to_string(),
            events: "events".to_string(),
            preprocessed: "preprocessed".to_string(),
        }
    }
}

/// Directory layout of one dataset.
///
/// The dataset directory is `root/<name>`, or `root` itself for the name
/// `"."`, unless set explicitly with [`DatasetPaths::with_dataset_dir`].
///
/// # Examples
///
/// ```
/// use gazekit_dataset::DatasetPaths;
/// use std::path::Path;
///
/// let paths = DatasetPaths::new("data", "GazeBase");
/// assert_eq!(paths.raw(), Path::new("data/GazeBase/raw"));
/// assert_eq!(paths.downloads(), Path::new("data/GazeBase/downloads"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    root: PathBuf,
    dataset: PathBuf,
    names: DirNames,
}

impl DatasetPaths {
    pub fn new(root: impl Into<PathBuf>, name: &str) -> Self {
        let root = root.into();
        let dataset = if name == "." {
            root.clone()
        } else {
            root.join(name)
        };
        Self {
            root,
            dataset,
            names: DirNames::default(),
        }
    }

    /// Use `dataset` as the dataset directory, relative to the root unless
    /// absolute.
    #[must_use]
    pub fn with_dataset_dir(mut self, dataset: impl AsRef<Path>) -> Self {
        self.dataset = self.root.join(dataset);
        self
    }

    #[must_use]
    pub fn with_dir_names(mut self, names: DirNames) -> Self {
        self.names = names;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    pub fn downloads(&self) -> PathBuf {
        self.dataset.join(&self.names.downloads)
    }

    pub fn raw(&self) -> PathBuf {
        self.dataset.join(&self.names.raw)
    }

    pub fn precomputed_events(&self) -> PathBuf {
        self.dataset.join(&self.names.precomputed_events)
    }

    pub fn precomputed_reading_measures(&self) -> PathBuf {
        self.dataset.join(&self.names.precomputed_reading_measures)
    }

    pub fn events(&self) -> PathBuf {
        self.dataset.join(&self.names.events)
    }

    pub fn preprocessed(&self) -> PathBuf {
        self.dataset.join(&self.names.preprocessed)
    }

    /// Directory that holds the extracted files of a content type
    pub fn content_dir(&self, content: ContentType) -> PathBuf {
        match content {
            ContentType::Gaze => self.raw(),
            ContentType::PrecomputedEvents => self.precomputed_events(),
            ContentType::PrecomputedReadingMeasures => self.precomputed_reading_measures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_name_uses_root() {
        let paths = DatasetPaths::new("/data", ".");
        assert_eq!(paths.dataset(), Path::new("/data"));
        assert_eq!(paths.events(), Path::new("/data/events"));
    }

    #[test]
    fn test_explicit_dataset_dir() {
        let paths = DatasetPaths::new("/data", "GazeBase").with_dataset_dir("gb");
        assert_eq!(paths.preprocessed(), Path::new("/data/gb/preprocessed"));

        let absolute = DatasetPaths::new("/data", "GazeBase").with_dataset_dir("/mnt/gb");
        assert_eq!(absolute.dataset(), Path::new("/mnt/gb"));
    }

    #[test]
    fn test_custom_dir_names() {
        let names = DirNames {
            raw: "gaze".to_string(),
            ..DirNames::default()
        };
        let paths = DatasetPaths::new("/data", "Toy").with_dir_names(names);

        assert_eq!(paths.content_dir(ContentType::Gaze), Path::new("/data/Toy/gaze"));
        assert_eq!(
            paths.content_dir(ContentType::PrecomputedReadingMeasures),
            Path::new("/data/Toy/precomputed_reading_measures")
        );
    }
}

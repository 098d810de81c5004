//! Scanning and loading dataset files

use crate::content::ContentType;
use crate::definition::DatasetDefinition;
use crate::download::{download_dataset, extract_dataset, DownloadOptions};
use crate::error::{DatasetError, Result};
use crate::filename::{filename_regex, scan_files};
use crate::paths::DatasetPaths;
use gazekit_archive::ExtractOptions;
use gazekit_core::gaze::io::{from_asc, from_csv, from_ipc};
use gazekit_core::{DataFrame, EventFrame, FrameExt, GazeFrame, GazekitError, Value};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Scan the content directory of every content type the dataset ships.
///
/// # Errors
///
/// - [`DatasetError::MissingFilenameFormat`] if a shipped content type has no format
/// - [`DatasetError::NoFilesFound`] if a content directory has no matching file
pub fn scan_dataset(
    definition: &DatasetDefinition,
    paths: &DatasetPaths,
) -> Result<BTreeMap<ContentType, DataFrame>> {
    let mut fileinfo = BTreeMap::new();

    for content in definition.has_files.contents() {
        let format = definition
            .filename_format
            .get(&content)
            .ok_or(DatasetError::MissingFilenameFormat(content))?;
        let regex = filename_regex(format)?;
        let overrides = definition
            .filename_format_schema_overrides
            .get(&content)
            .cloned()
            .unwrap_or_default();

        let directory = paths.content_dir(content);
        let frame = scan_files(&directory, &regex, &overrides)?;
        if frame.height() == 0 {
            return Err(DatasetError::NoFilesFound {
                content,
                path: directory,
                pattern: format.clone(),
            });
        }

        info!("Found {} {content} files", frame.height());
        fileinfo.insert(content, frame);
    }
    Ok(fileinfo)
}

/// Metadata columns of one fileinfo row, everything except `filepath`.
fn row_values(fileinfo: &DataFrame, row: usize) -> Result<Vec<(String, Value)>> {
    fileinfo
        .get_columns()
        .iter()
        .filter(|column| column.name() != "filepath")
        .map(|column| {
            let value = column.get(row).map_err(GazekitError::from)?;
            Ok((column.name().to_string(), Value::from_any(&value)))
        })
        .collect()
}

fn row_path(fileinfo: &DataFrame, row: usize, directory: &Path) -> Result<PathBuf> {
    let filepath = fileinfo
        .require("filepath")?
        .str()
        .map_err(GazekitError::from)?
        .get(row)
        .ok_or_else(|| GazekitError::invalid("filepath", "null file path"))?;
    Ok(directory.join(filepath))
}

/// Gaze loaders, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GazeFormat {
    Csv,
    Ipc,
    Asc,
}

impl GazeFormat {
    fn of(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            "feather" | "ipc" | "arrow" => Ok(Self::Ipc),
            "asc" => Ok(Self::Asc),
            _ => Err(DatasetError::UnsupportedFileFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

fn load_gaze_file(
    definition: &DatasetDefinition,
    path: &Path,
    add_columns: Vec<(String, Value)>,
) -> Result<GazeFrame> {
    let format = GazeFormat::of(path)?;
    debug!("Loading gaze file {} as {format:?}", path.display());
    let gaze = match format {
        GazeFormat::Csv => {
            let mut options = definition.gaze_csv_options();
            options.add_columns = add_columns;
            from_csv(path, &options)?
        }
        GazeFormat::Ipc => {
            let mut options = definition.gaze_ipc_options();
            options.add_columns = add_columns;
            from_ipc(path, &options)?
        }
        GazeFormat::Asc => {
            let mut options = definition.gaze_asc_options();
            options.add_columns = add_columns;
            from_asc(path, &options)?
        }
    };
    Ok(gaze)
}

/// Load one gaze frame per fileinfo row from the raw directory.
///
/// The loader follows the file extension: delimited text (`csv`, `tsv`,
/// `txt`), Arrow IPC (`feather`, `ipc`, `arrow`) or EyeLink `asc`.
/// Fileinfo values become constant columns unless the file already has a
/// column of that name.
///
/// # Errors
///
/// - [`DatasetError::UnsupportedFileFormat`] for any other extension
pub fn load_gaze_files(
    definition: &DatasetDefinition,
    paths: &DatasetPaths,
    fileinfo: &DataFrame,
) -> Result<Vec<GazeFrame>> {
    let directory = paths.raw();

    (0..fileinfo.height())
        .map(|row| {
            let path = row_path(fileinfo, row, &directory)?;
            load_gaze_file(definition, &path, row_values(fileinfo, row)?)
        })
        .collect()
}

/// Load one event frame per fileinfo row from the precomputed events
/// directory.
pub fn load_event_files(
    definition: &DatasetDefinition,
    paths: &DatasetPaths,
    fileinfo: &DataFrame,
) -> Result<Vec<EventFrame>> {
    let directory = paths.precomputed_events();
    let options = definition.read_options(ContentType::PrecomputedEvents);

    (0..fileinfo.height())
        .map(|row| {
            let path = row_path(fileinfo, row, &directory)?;
            debug!("Loading event file {}", path.display());
            let mut events = EventFrame::from_csv(&path, &options)?;
            for (name, value) in row_values(fileinfo, row)? {
                events.add_literal(&name, &value)?;
            }
            Ok(events)
        })
        .collect()
}

/// A dataset on disk: its definition, its directories and whatever has been
/// loaded so far.
///
/// # Examples
///
/// ```no_run
/// use gazekit_dataset::{Dataset, DatasetDefinition};
///
/// let definition = DatasetDefinition::from_yaml("GazeBase.yaml")?;
/// let mut dataset = Dataset::new(definition, "data");
/// dataset.download(&Default::default())?;
/// dataset.scan()?;
/// dataset.load_gaze()?;
/// println!("{} recordings", dataset.gaze().len());
/// # Ok::<(), gazekit_dataset::DatasetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    definition: DatasetDefinition,
    paths: DatasetPaths,
    fileinfo: BTreeMap<ContentType, DataFrame>,
    gaze: Vec<GazeFrame>,
    events: Vec<EventFrame>,
}

impl Dataset {
    pub fn new(definition: DatasetDefinition, root: impl Into<PathBuf>) -> Self {
        let paths = DatasetPaths::new(root, &definition.name);
        Self::with_paths(definition, paths)
    }

    pub fn with_paths(definition: DatasetDefinition, paths: DatasetPaths) -> Self {
        Self {
            definition,
            paths,
            fileinfo: BTreeMap::new(),
            gaze: Vec::new(),
            events: Vec::new(),
        }
    }

    pub const fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    pub const fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    pub fn download(&self, options: &DownloadOptions) -> Result<()> {
        download_dataset(&self.definition, &self.paths, options)
    }

    pub fn extract(&self, options: &ExtractOptions) -> Result<Vec<PathBuf>> {
        extract_dataset(&self.definition, &self.paths, options)
    }

    /// Scan all content directories, replacing earlier scan results.
    pub fn scan(&mut self) -> Result<&BTreeMap<ContentType, DataFrame>> {
        self.fileinfo = scan_dataset(&self.definition, &self.paths)?;
        Ok(&self.fileinfo)
    }

    pub fn fileinfo(&self, content: ContentType) -> Option<&DataFrame> {
        self.fileinfo.get(&content)
    }

    /// Load raw gaze files, scanning first if needed.
    pub fn load_gaze(&mut self) -> Result<&[GazeFrame]> {
        let fileinfo = self.fileinfo_for(ContentType::Gaze)?;
        self.gaze = load_gaze_files(&self.definition, &self.paths, &fileinfo)?;
        Ok(&self.gaze)
    }

    /// Load precomputed event files, scanning first if needed.
    pub fn load_events(&mut self) -> Result<&[EventFrame]> {
        let fileinfo = self.fileinfo_for(ContentType::PrecomputedEvents)?;
        self.events = load_event_files(&self.definition, &self.paths, &fileinfo)?;
        Ok(&self.events)
    }

    pub fn gaze(&self) -> &[GazeFrame] {
        &self.gaze
    }

    pub fn events(&self) -> &[EventFrame] {
        &self.events
    }

    fn fileinfo_for(&mut self, content: ContentType) -> Result<DataFrame> {
        if !self.fileinfo.contains_key(&content) {
            self.scan()?;
        }
        self.fileinfo
            .get(&content)
            .cloned()
            .ok_or(DatasetError::MissingFilenameFormat(content))
    }
}

//! Declarative dataset descriptions, stored as YAML
//!
//! A [`DatasetDefinition`] names where a dataset's files come from, how the
//! files are named on disk, and how their columns map onto gaze frames.
//!
//! ```yaml
//! name: ToyDataset
//! has_files:
//!   gaze: true
//! resources:
//!   gaze:
//!     - resource: https://example.org/toy.zip
//!       filename: toy.zip
//!       md5: 256872b8f1d8d3ce65ba13ee1a0f7adb
//! filename_format:
//!   gaze: trial_{text_id:d}_{page_id:d}.csv
//! pixel_columns: [x, y]
//! time_column: timestamp
//! ```

use crate::content::ContentType;
use crate::error::Result;
use gazekit_core::gaze::io::{GazeAscOptions, GazeCsvOptions, GazeIpcOptions};
use gazekit_core::{AscPatterns, CsvOptions, DType, Experiment, GazeColumns, TimeUnit};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Which kinds of files a dataset ships.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasFiles {
    pub gaze: bool,
    pub precomputed_events: bool,
    pub precomputed_reading_measures: bool,
}

impl HasFiles {
    #[must_use]
    pub const fn get(&self, content: ContentType) -> bool {
        match content {
            ContentType::Gaze => self.gaze,
            ContentType::PrecomputedEvents => self.precomputed_events,
            ContentType::PrecomputedReadingMeasures => self.precomputed_reading_measures,
        }
    }

    /// Content types marked as present, in download order
    pub fn contents(&self) -> impl Iterator<Item = ContentType> + '_ {
        ContentType::ALL
            .into_iter()
            .filter(|content| self.get(*content))
    }
}

/// One downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// URL, or URL suffix appended to the first mirror
    pub resource: String,
    /// Name under which the file is stored in the downloads directory
    pub filename: String,
    /// Expected MD5 checksum (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

/// Everything needed to download, extract, scan and load a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetDefinition {
    pub name: String,
    pub long_name: Option<String>,
    pub has_files: HasFiles,
    pub mirrors: BTreeMap<ContentType, Vec<String>>,
    pub resources: BTreeMap<ContentType, Vec<ResourceDefinition>>,
    pub experiment: Option<Experiment>,
    /// Deprecated, ignored apart from a warning when loaded
    pub extract: Option<BTreeMap<ContentType, bool>>,
    /// `{name}` / `{name:d}` patterns or raw regexes with named groups
    pub filename_format: BTreeMap<ContentType, String>,
    pub filename_format_schema_overrides: BTreeMap<ContentType, BTreeMap<String, DType>>,
    pub custom_read_kwargs: BTreeMap<ContentType, CsvOptions>,
    /// Extra columns parsed from EyeLink ASC messages
    pub asc_patterns: Option<AscPatterns>,
    /// Dtypes of the `asc_patterns` columns
    pub asc_schema: BTreeMap<String, DType>,
    pub column_map: BTreeMap<String, String>,
    pub trial_columns: Option<Vec<String>>,
    pub time_column: Option<String>,
    pub time_unit: Option<TimeUnit>,
    pub pixel_columns: Option<Vec<String>>,
    pub position_columns: Option<Vec<String>>,
    pub velocity_columns: Option<Vec<String>>,
    pub acceleration_columns: Option<Vec<String>>,
    pub distance_column: Option<String>,
}

impl Default for DatasetDefinition {
    fn default() -> Self {
        Self {
            name: ".".to_string(),
            long_name: None,
            has_files: HasFiles::default(),
            mirrors: BTreeMap::new(),
            resources: BTreeMap::new(),
            experiment: None,
            extract: None,
            filename_format: BTreeMap::new(),
            filename_format_schema_overrides: BTreeMap::new(),
            custom_read_kwargs: BTreeMap::new(),
            asc_patterns: None,
            asc_schema: BTreeMap::new(),
            column_map: BTreeMap::new(),
            trial_columns: None,
            time_column: None,
            time_unit: None,
            pixel_columns: None,
            position_columns: None,
            velocity_columns: None,
            acceleration_columns: None,
            distance_column: None,
        }
    }
}

impl DatasetDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a definition from a YAML file.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, malformed YAML and invalid experiment values.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parse a definition from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let definition: Self = serde_yaml::from_str(text)?;

        if definition.extract.is_some() {
            warn!(
                "DatasetDefinition.extract is deprecated and ignored; \
                 archives are always extracted after download"
            );
        }
        if let Some(experiment) = &definition.experiment {
            experiment.validate()?;
        }
        Ok(definition)
    }

    /// Generic YAML representation.
    ///
    /// With `exclude_none`, top-level fields that are null or empty (strings,
    /// lists, mappings) are dropped. Booleans and numbers are always kept.
    pub fn to_value(&self, exclude_none: bool) -> Result<Value> {
        let mut value = serde_yaml::to_value(self)?;
        if exclude_none {
            if let Value::Mapping(mapping) = &mut value {
                mapping.retain(|_, field| !is_empty_value(field));
            }
        }
        Ok(value)
    }

    pub fn to_yaml_string(&self, exclude_none: bool) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_value(exclude_none)?)?)
    }

    /// Save the definition as YAML.
    pub fn to_yaml(&self, path: impl AsRef<Path>, exclude_none: bool) -> Result<()> {
        fs::write(path.as_ref(), self.to_yaml_string(exclude_none)?)?;
        Ok(())
    }

    /// Whether any content type lists resources.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        self.resources.values().any(|resources| !resources.is_empty())
    }

    #[must_use]
    pub fn has_resources_for(&self, content: ContentType) -> bool {
        !self.resources_for(content).is_empty()
    }

    #[must_use]
    pub fn resources_for(&self, content: ContentType) -> &[ResourceDefinition] {
        self.resources.get(&content).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn mirrors_for(&self, content: ContentType) -> &[String] {
        self.mirrors.get(&content).map(Vec::as_slice).unwrap_or_default()
    }

    /// Column roles for raw gaze files.
    #[must_use]
    pub fn gaze_columns(&self) -> GazeColumns {
        GazeColumns {
            trial_columns: self.trial_columns.clone(),
            time_column: self.time_column.clone(),
            time_unit: self.time_unit.unwrap_or_default(),
            pixel_columns: self.pixel_columns.clone(),
            position_columns: self.position_columns.clone(),
            velocity_columns: self.velocity_columns.clone(),
            acceleration_columns: self.acceleration_columns.clone(),
            distance_column: self.distance_column.clone(),
        }
    }

    /// Reader options for a content type, defaults when none are configured.
    #[must_use]
    pub fn read_options(&self, content: ContentType) -> CsvOptions {
        self.custom_read_kwargs
            .get(&content)
            .cloned()
            .unwrap_or_default()
    }

    /// Options for loading one raw gaze file; per-file columns are added by
    /// the caller.
    #[must_use]
    pub fn gaze_csv_options(&self) -> GazeCsvOptions {
        GazeCsvOptions {
            experiment: self.experiment.clone(),
            columns: self.gaze_columns(),
            column_map: self.column_map.clone(),
            csv: self.read_options(ContentType::Gaze),
            ..GazeCsvOptions::default()
        }
    }

    /// Options for loading one raw gaze feather file.
    #[must_use]
    pub fn gaze_ipc_options(&self) -> GazeIpcOptions {
        GazeIpcOptions {
            experiment: self.experiment.clone(),
            column_map: self.column_map.clone(),
            ..GazeIpcOptions::default()
        }
    }

    /// Options for loading one raw EyeLink ASC file.
    #[must_use]
    pub fn gaze_asc_options(&self) -> GazeAscOptions {
        GazeAscOptions {
            experiment: self.experiment.clone(),
            patterns: self.asc_patterns.clone().unwrap_or_default(),
            schema: self.asc_schema.clone(),
            ..GazeAscOptions::default()
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(mapping) => mapping.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::Tagged(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAZE_ON_FACES: &str = r"
name: GazeOnFaces
long_name: GazeOnFaces dataset
has_files:
  gaze: true
  precomputed_events: false
  precomputed_reading_measures: false
resources:
  gaze:
    - resource: https://uncloud.univ-nantes.fr/index.php/s/8KW6dEdyBJqxpmo/download?path=%2F&files=gaze_csv.zip
      filename: gaze_csv.zip
      md5: fe219f07c9253cd9aaee6bd50233c034
experiment:
  screen_width_px: 1280
  screen_height_px: 1024
  screen_width_cm: 38
  screen_height_cm: 30
  distance_cm: 57
  origin: center
  sampling_rate: 60
filename_format:
  gaze: gaze_sub{sub_id:d}_trial{trial_id:d}.csv
filename_format_schema_overrides:
  gaze:
    sub_id: int
    trial_id: int
pixel_columns: [x, y]
custom_read_kwargs:
  gaze:
    separator: ','
    has_header: false
    new_columns: [x, y]
    schema_overrides:
      x: float
      y: float
";

    #[test]
    fn test_parse_gaze_on_faces() {
        let definition = DatasetDefinition::from_yaml_str(GAZE_ON_FACES).unwrap();

        assert_eq!(definition.name, "GazeOnFaces");
        assert!(definition.has_files.gaze);
        assert!(!definition.has_files.precomputed_events);
        assert_eq!(
            definition.resources_for(ContentType::Gaze)[0].filename,
            "gaze_csv.zip"
        );
        let experiment = definition.experiment.as_ref().unwrap();
        assert_eq!(experiment.screen.width_px, Some(1280));
        assert_eq!(experiment.sampling_rate, Some(60.0));

        let options = definition.read_options(ContentType::Gaze);
        assert!(!options.has_header);
        assert_eq!(options.schema_overrides.get("x"), Some(&DType::Float));
        assert_eq!(
            definition.gaze_columns().pixel_columns,
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn test_defaults() {
        let definition = DatasetDefinition::default();
        assert_eq!(definition.name, ".");
        assert!(!definition.has_resources());
        assert!(definition.mirrors_for(ContentType::Gaze).is_empty());
        assert_eq!(definition.gaze_columns().time_unit, TimeUnit::Ms);
    }

    #[test]
    fn test_has_resources_per_content() {
        let mut definition = DatasetDefinition::new("Toy");
        definition.resources.insert(
            ContentType::Gaze,
            vec![ResourceDefinition {
                resource: "toy.zip".to_string(),
                filename: "toy.zip".to_string(),
                md5: None,
            }],
        );
        definition
            .resources
            .insert(ContentType::PrecomputedEvents, Vec::new());

        assert!(definition.has_resources());
        assert!(definition.has_resources_for(ContentType::Gaze));
        assert!(!definition.has_resources_for(ContentType::PrecomputedEvents));
        assert!(!definition.has_resources_for(ContentType::PrecomputedReadingMeasures));
    }

    #[test]
    fn test_to_value_exclude_none() {
        let definition = DatasetDefinition::new("Toy");

        let full = definition.to_value(false).unwrap();
        let full = full.as_mapping().unwrap();
        assert!(full.contains_key("long_name"));
        assert!(full.contains_key("mirrors"));

        let trimmed = definition.to_value(true).unwrap();
        let trimmed = trimmed.as_mapping().unwrap();
        assert!(!trimmed.contains_key("long_name"));
        assert!(!trimmed.contains_key("mirrors"));
        assert_eq!(trimmed.get("name"), Some(&Value::from("Toy")));
        assert!(trimmed.contains_key("has_files"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let definition = DatasetDefinition::from_yaml_str(GAZE_ON_FACES).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaze_on_faces.yaml");

        definition.to_yaml(&path, true).unwrap();
        let reloaded = DatasetDefinition::from_yaml(&path).unwrap();

        assert_eq!(reloaded, definition);
    }

    #[test]
    fn test_deprecated_extract_still_loads() {
        let definition =
            DatasetDefinition::from_yaml_str("name: Toy\nextract:\n  gaze: true\n").unwrap();
        assert_eq!(
            definition.extract,
            Some(BTreeMap::from([(ContentType::Gaze, true)]))
        );
    }

    #[test]
    fn test_asc_settings() {
        let definition = DatasetDefinition::from_yaml_str(
            "name: Asc\nasc_patterns:\n  - 'TRIALID (?P<trial_id>\\d+)'\nasc_schema:\n  trial_id: int\n",
        )
        .unwrap();
        let options = definition.gaze_asc_options();
        assert!(matches!(&options.patterns, AscPatterns::Custom(patterns) if patterns.len() == 1));
        assert_eq!(options.schema.get("trial_id"), Some(&DType::Int));

        let options = DatasetDefinition::new("Toy").gaze_asc_options();
        assert_eq!(options.patterns, AscPatterns::default());
    }

    #[test]
    fn test_invalid_experiment_is_rejected() {
        let err = DatasetDefinition::from_yaml_str("experiment:\n  sampling_rate: -1\n")
            .unwrap_err();
        assert!(err.to_string().contains("sampling_rate"));
    }
}

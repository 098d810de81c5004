//! Loading gaze recordings from delimited, Arrow IPC and EyeLink ASC files.

use super::asc::{parse_eyelink, AscPatterns};
use super::frame::{GazeColumns, GazeFrame, TimeUnit};
use crate::error::Result;
use crate::experiment::Experiment;
use crate::frame::{read_csv, read_ipc, CsvOptions, DType, FrameExt, Value};
use polars::prelude::{DataFrame, DataType};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything [`from_csv`] needs besides the path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeCsvOptions {
    pub experiment: Option<Experiment>,
    pub columns: GazeColumns,
    /// Renames applied after reading; keys missing from the file are ignored
    pub column_map: BTreeMap<String, String>,
    /// Constant columns, added only when the file lacks a column of that name
    pub add_columns: Vec<(String, Value)>,
    /// Casts applied after renaming
    pub column_schema_overrides: BTreeMap<String, DType>,
    pub csv: CsvOptions,
}

/// Options of [`from_ipc`]. IPC files already carry their schema, so there
/// are no read options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeIpcOptions {
    pub experiment: Option<Experiment>,
    pub column_map: BTreeMap<String, String>,
    pub add_columns: Vec<(String, Value)>,
    pub column_schema_overrides: BTreeMap<String, DType>,
}

/// Options of [`from_asc`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeAscOptions {
    pub experiment: Option<Experiment>,
    /// Additional columns parsed from non-sample lines
    pub patterns: AscPatterns,
    /// Dtypes of the pattern columns, text by default
    pub schema: BTreeMap<String, DType>,
    pub add_columns: Vec<(String, Value)>,
    pub column_schema_overrides: BTreeMap<String, DType>,
}

fn rename_columns(frame: &mut DataFrame, column_map: &BTreeMap<String, String>) -> Result<()> {
    for (from, to) in column_map {
        if frame.has_column(from) {
            frame.rename(from, to.into())?;
        }
    }
    Ok(())
}

fn add_missing(mut frame: DataFrame, add_columns: &[(String, Value)]) -> Result<DataFrame> {
    for (name, value) in add_columns {
        if !frame.has_column(name) {
            frame = frame.with_literal(name, value)?;
        }
    }
    Ok(frame)
}

fn apply_overrides(frame: &mut DataFrame, overrides: &BTreeMap<String, DType>) -> Result<()> {
    for (name, dtype) in overrides {
        frame.cast_column(name, &DataType::from(*dtype))?;
    }
    Ok(())
}

/// Read a gaze file and normalize it into a [`GazeFrame`].
///
/// # Examples
///
/// ```no_run
/// use gazekit_core::gaze::io::{from_csv, GazeCsvOptions};
/// use gazekit_core::GazeColumns;
///
/// let options = GazeCsvOptions {
///     columns: GazeColumns {
///         time_column: Some("time".to_string()),
///         pixel_columns: Some(vec!["x_left_pix".to_string(), "y_left_pix".to_string()]),
///         ..GazeColumns::default()
///     },
///     ..GazeCsvOptions::default()
/// };
/// let gaze = from_csv("monocular_example.csv", &options)?;
/// assert_eq!(gaze.n_components(), Some(2));
/// # Ok::<(), gazekit_core::GazekitError>(())
/// ```
pub fn from_csv(path: impl AsRef<Path>, options: &GazeCsvOptions) -> Result<GazeFrame> {
    let path = path.as_ref();
    let mut frame = read_csv(path, &options.csv)?;
    rename_columns(&mut frame, &options.column_map)?;
    let mut frame = add_missing(frame, &options.add_columns)?;

    // Coordinate columns inferred as text get one strict parse as floats.
    for name in options.columns.numeric_columns() {
        if frame.require(name)?.dtype().is_string() {
            frame.cast_column(name, &DataType::Float64)?;
        }
    }
    apply_overrides(&mut frame, &options.column_schema_overrides)?;

    log::debug!(
        "Loaded {} gaze samples from {}",
        frame.height(),
        path.display()
    );
    GazeFrame::new(frame, options.experiment.clone(), &options.columns)
}

/// Read an Arrow IPC (feather) file whose coordinates are already nested.
///
/// # Examples
///
/// ```no_run
/// use gazekit_core::gaze::io::{from_ipc, GazeIpcOptions};
///
/// let gaze = from_ipc("monocular_example.feather", &GazeIpcOptions::default())?;
/// assert_eq!(gaze.n_components(), Some(2));
/// # Ok::<(), gazekit_core::GazekitError>(())
/// ```
pub fn from_ipc(path: impl AsRef<Path>, options: &GazeIpcOptions) -> Result<GazeFrame> {
    let path = path.as_ref();
    let mut frame = read_ipc(path)?;
    rename_columns(&mut frame, &options.column_map)?;
    let mut frame = add_missing(frame, &options.add_columns)?;
    apply_overrides(&mut frame, &options.column_schema_overrides)?;

    log::debug!(
        "Loaded {} gaze samples from {}",
        frame.height(),
        path.display()
    );
    GazeFrame::new(frame, options.experiment.clone(), &GazeColumns::default())
}

/// Read the samples of an EyeLink ASC file.
///
/// The result has a millisecond `time` column, `pupil`, a two component
/// `pixel` column and one column per pattern column.
///
/// # Examples
///
/// ```no_run
/// use gazekit_core::gaze::io::{from_asc, GazeAscOptions};
///
/// let gaze = from_asc("eyelink_monocular_example.asc", &GazeAscOptions::default())?;
/// assert_eq!(gaze.frame().get_column_names_str(), vec!["time", "pupil", "pixel"]);
/// # Ok::<(), gazekit_core::GazekitError>(())
/// ```
pub fn from_asc(path: impl AsRef<Path>, options: &GazeAscOptions) -> Result<GazeFrame> {
    let path = path.as_ref();
    let frame = parse_eyelink(path, &options.patterns, &options.schema)?;
    let mut frame = add_missing(frame, &options.add_columns)?;
    apply_overrides(&mut frame, &options.column_schema_overrides)?;

    let columns = GazeColumns {
        time_column: Some("time".to_string()),
        time_unit: TimeUnit::Ms,
        pixel_columns: Some(vec!["x_pix".to_string(), "y_pix".to_string()]),
        ..GazeColumns::default()
    };
    GazeFrame::new(frame, options.experiment.clone(), &columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GazekitError;
    use polars::prelude::{Column, IpcWriter, NamedFrom, SerWriter, Series};
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_monocular_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "monocular.csv",
            "time,x_left_pix,y_left_pix\n0,0,0\n1,0,0\n2,0,0\n",
        );
        let options = GazeCsvOptions {
            columns: GazeColumns {
                time_column: Some("time".to_string()),
                pixel_columns: Some(vec!["x_left_pix".to_string(), "y_left_pix".to_string()]),
                ..GazeColumns::default()
            },
            ..GazeCsvOptions::default()
        };
        let gaze = from_csv(&path, &options).unwrap();
        assert_eq!(gaze.frame().get_column_names_str(), vec!["time", "pixel"]);
        assert_eq!(gaze.height(), 3);
        assert_eq!(
            gaze.frame().list_rows("pixel").unwrap()[0],
            Some(vec![0.0, 0.0])
        );
    }

    #[test]
    fn test_column_map_and_add_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "gaze.csv", "n,x,y,subject_id\n5,1.5,2.5,3\n");
        let options = GazeCsvOptions {
            columns: GazeColumns {
                time_column: Some("time".to_string()),
                position_columns: Some(vec!["x_dva".to_string(), "y_dva".to_string()]),
                ..GazeColumns::default()
            },
            column_map: [("n", "time"), ("x", "x_dva"), ("y", "y_dva"), ("missing", "m")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            add_columns: vec![
                ("subject_id".to_string(), Value::Int(99)),
                ("session_id".to_string(), Value::Int(1)),
            ],
            ..GazeCsvOptions::default()
        };
        let gaze = from_csv(&path, &options).unwrap();
        let frame = gaze.frame();
        assert_eq!(frame.f64_values("subject_id").unwrap(), vec![Some(3.0)]);
        assert_eq!(frame.f64_values("session_id").unwrap(), vec![Some(1.0)]);
        assert!(frame.has_column("position"));
        assert!(!frame.has_column("m"));
    }

    #[test]
    fn test_schema_overrides_cast_after_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "gaze.csv", "a\n1\n");
        let options = GazeCsvOptions {
            column_map: BTreeMap::from([("a".to_string(), "b".to_string())]),
            column_schema_overrides: BTreeMap::from([("b".to_string(), DType::Str)]),
            ..GazeCsvOptions::default()
        };
        let gaze = from_csv(&path, &options).unwrap();
        let column = gaze.frame().require("b").unwrap();
        assert_eq!(column.str().unwrap().get(0), Some("1"));
    }

    #[test]
    fn test_non_numeric_component_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "gaze.csv", "x,y\nleft,1\n");
        let options = GazeCsvOptions {
            columns: GazeColumns {
                pixel_columns: Some(vec!["x".to_string(), "y".to_string()]),
                ..GazeColumns::default()
            },
            ..GazeCsvOptions::default()
        };
        let err = from_csv(&path, &options).unwrap_err();
        assert!(matches!(err, GazekitError::Cast { .. }));
    }

    fn write_feather(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let rows: Vec<Series> = (0..3_i64)
            .map(|i| Series::new("".into(), [i, i + 1]))
            .collect();
        let mut frame = DataFrame::new(vec![
            Column::new("t".into(), [0_i64, 1, 2]),
            Column::new("pixel".into(), &rows),
        ])
        .unwrap();
        let path = dir.path().join("monocular_example.feather");
        let mut file = std::fs::File::create(&path).unwrap();
        IpcWriter::new(&mut file).finish(&mut frame).unwrap();
        path
    }

    #[test]
    fn test_from_ipc() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_feather(&dir);
        let options = GazeIpcOptions {
            column_map: BTreeMap::from([("t".to_string(), "time".to_string())]),
            add_columns: vec![("subject_id".to_string(), Value::Int(4))],
            column_schema_overrides: BTreeMap::from([("pixel".to_string(), DType::List)]),
            ..GazeIpcOptions::default()
        };
        let gaze = from_ipc(&path, &options).unwrap();
        let frame = gaze.frame();
        assert_eq!(
            frame.get_column_names_str(),
            vec!["time", "pixel", "subject_id"]
        );
        assert_eq!(gaze.n_components(), Some(2));
        assert_eq!(frame.require("pixel").unwrap().dtype(), &DataType::from(DType::List));
        assert_eq!(frame.list_rows("pixel").unwrap()[2], Some(vec![2.0, 3.0]));
    }

    #[test]
    fn test_from_ipc_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = from_ipc(dir.path().join("none.feather"), &GazeIpcOptions::default())
            .unwrap_err();
        assert!(matches!(err, GazekitError::Io(_)));
    }

    #[test]
    fn test_from_asc_adds_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sub_1.asc", "MSG\t10 START\n10\t1.0\t2.0\t300.0\t...\n");
        let options = GazeAscOptions {
            add_columns: vec![("subject_id".to_string(), Value::Str("1".to_string()))],
            column_schema_overrides: BTreeMap::from([("subject_id".to_string(), DType::Int)]),
            ..GazeAscOptions::default()
        };
        let gaze = from_asc(&path, &options).unwrap();
        let frame = gaze.frame();
        assert_eq!(
            frame.get_column_names_str(),
            vec!["time", "pupil", "subject_id", "pixel"]
        );
        assert_eq!(frame.require("subject_id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(frame.list_rows("pixel").unwrap()[0], Some(vec![1.0, 2.0]));
    }
}

//! Text stimuli and their area-of-interest tables.

use crate::error::{GazekitError, Result};
use crate::frame::{read_csv, CsvOptions, DType, FrameExt};
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column configuration of an AOI table.
///
/// Each AOI row needs a start corner and either a width/height pair or an
/// end corner. When both pairs are configured, width/height is used.
///
/// # Examples
///
/// ```
/// use gazekit_core::AoiColumns;
///
/// let columns = AoiColumns::new(["word"], "top_left_x", "top_left_y")
///     .with_size("width", "height")
///     .with_page("page");
/// assert_eq!(columns.page_column.as_deref(), Some("page"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AoiColumns {
    /// Label columns written to the mapped table
    pub aoi_columns: Vec<String>,
    pub start_x_column: String,
    pub start_y_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_column: Option<String>,
}

/// How the extent of each AOI is encoded in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary<'a> {
    Size { width: &'a str, height: &'a str },
    End { end_x: &'a str, end_y: &'a str },
}

impl AoiColumns {
    pub fn new<I, S>(aoi_columns: I, start_x_column: &str, start_y_column: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aoi_columns: aoi_columns.into_iter().map(Into::into).collect(),
            start_x_column: start_x_column.to_string(),
            start_y_column: start_y_column.to_string(),
            width_column: None,
            height_column: None,
            end_x_column: None,
            end_y_column: None,
            page_column: None,
        }
    }

    #[must_use = "returns the columns with width and height set"]
    pub fn with_size(mut self, width_column: &str, height_column: &str) -> Self {
        self.width_column = Some(width_column.to_string());
        self.height_column = Some(height_column.to_string());
        self
    }

    #[must_use = "returns the columns with the end corner set"]
    pub fn with_end(mut self, end_x_column: &str, end_y_column: &str) -> Self {
        self.end_x_column = Some(end_x_column.to_string());
        self.end_y_column = Some(end_y_column.to_string());
        self
    }

    #[must_use = "returns the columns with the page column set"]
    pub fn with_page(mut self, page_column: &str) -> Self {
        self.page_column = Some(page_column.to_string());
        self
    }

    /// Resolve the boundary encoding. Width/height takes precedence.
    pub fn boundary(&self) -> Result<Boundary<'_>> {
        match (
            &self.width_column,
            &self.height_column,
            &self.end_x_column,
            &self.end_y_column,
        ) {
            (Some(width), Some(height), _, _) => Ok(Boundary::Size {
                width: width.as_str(),
                height: height.as_str(),
            }),
            (_, _, Some(end_x), Some(end_y)) => Ok(Boundary::End {
                end_x: end_x.as_str(),
                end_y: end_y.as_str(),
            }),
            _ => Err(GazekitError::MissingBoundaryColumns),
        }
    }
}

/// A stimulus page layout: an AOI table plus the configuration to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStimulus {
    aois: DataFrame,
    columns: AoiColumns,
}

impl TextStimulus {
    /// Wrap an already loaded AOI table. Label columns are converted to strings.
    pub fn new(mut aois: DataFrame, columns: AoiColumns) -> Result<Self> {
        if columns.aoi_columns.is_empty() {
            return Err(GazekitError::invalid(
                "aoi_columns",
                "at least one label column is required",
            ));
        }
        for label in &columns.aoi_columns {
            aois.cast_column(label, &DataType::String)?;
        }
        Ok(Self { aois, columns })
    }

    /// Load an AOI table from a delimited file.
    pub fn from_file(
        path: impl AsRef<Path>,
        columns: AoiColumns,
        options: &CsvOptions,
    ) -> Result<Self> {
        let mut options = options.clone();
        for label in &columns.aoi_columns {
            options.schema_overrides.insert(label.clone(), DType::Str);
        }
        let aois = read_csv(path, &options)?;
        log::debug!("Loaded {} AOIs", aois.height());
        Self::new(aois, columns)
    }

    pub const fn aois(&self) -> &DataFrame {
        &self.aois
    }

    pub const fn columns(&self) -> &AoiColumns {
        &self.columns
    }

    /// Number of AOI rows.
    pub fn len(&self) -> usize {
        self.aois.height()
    }

    pub fn is_empty(&self) -> bool {
        self.aois.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::df;

    #[test]
    fn test_boundary_prefers_size() {
        let columns = AoiColumns::new(["word"], "x", "y")
            .with_end("ex", "ey")
            .with_size("w", "h");
        assert_eq!(
            columns.boundary().unwrap(),
            Boundary::Size {
                width: "w",
                height: "h"
            }
        );
    }

    #[test]
    fn test_boundary_end() {
        let columns = AoiColumns::new(["word"], "x", "y").with_end("ex", "ey");
        assert_eq!(
            columns.boundary().unwrap(),
            Boundary::End {
                end_x: "ex",
                end_y: "ey"
            }
        );
    }

    #[test]
    fn test_boundary_missing() {
        let err = AoiColumns::new(["word"], "x", "y").boundary().unwrap_err();
        assert!(matches!(err, GazekitError::MissingBoundaryColumns));
    }

    #[test]
    fn test_new_casts_labels_to_str() {
        let frame = df!("digit" => [1_i64, 2], "x" => [0.0, 1.0]).unwrap();
        let stimulus = TextStimulus::new(frame, AoiColumns::new(["digit"], "x", "x")).unwrap();
        let digits = stimulus.aois().require("digit").unwrap().str().unwrap();
        assert_eq!(digits.get(0), Some("1"));
        assert_eq!(digits.get(1), Some("2"));
        assert_eq!(stimulus.len(), 2);
    }

    #[test]
    fn test_new_missing_label() {
        let frame = df!("x" => [0.0]).unwrap();
        let err = TextStimulus::new(frame, AoiColumns::new(["word"], "x", "x")).unwrap_err();
        assert!(matches!(err, GazekitError::ColumnNotFound(name) if name == "word"));
    }

    #[test]
    fn test_from_file_keeps_numeric_labels_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aois.csv");
        std::fs::write(&path, "char,x,y,w,h\n7,0,0,1,1\n").unwrap();
        let columns = AoiColumns::new(["char"], "x", "y").with_size("w", "h");
        let stimulus = TextStimulus::from_file(&path, columns, &CsvOptions::default()).unwrap();
        let chars = stimulus.aois().require("char").unwrap().str().unwrap();
        assert_eq!(chars.get(0), Some("7"));
    }
}

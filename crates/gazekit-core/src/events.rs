//! Event tables (fixations, saccades, ...).

use crate::aoi::{map_to_aois, LocationSource};
use crate::error::Result;
use crate::frame::{read_csv, CsvOptions, DType, FrameExt, Value};
use crate::stimulus::TextStimulus;
use polars::prelude::{col, DataFrame, IntoLazy};
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 3] = ["name", "onset", "offset"];

/// How event rows are matched against a stimulus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMapping {
    pub location: LocationSource,
    /// Event column holding the page of each row
    pub page_column: Option<String>,
}

impl EventMapping {
    #[must_use = "returns the mapping with the page column set"]
    pub fn with_page(mut self, page_column: &str) -> Self {
        self.page_column = Some(page_column.to_string());
        self
    }
}

/// A table of events with `name`, `onset`, `offset` and `duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    frame: DataFrame,
}

impl EventFrame {
    /// Wrap a frame. `duration` is derived from onset and offset when absent.
    pub fn new(mut frame: DataFrame) -> Result<Self> {
        for name in REQUIRED_COLUMNS {
            frame.require(name)?;
        }
        if !frame.has_column("duration") {
            // Checks both columns are numeric.
            frame.f64_values("onset")?;
            frame.f64_values("offset")?;
            frame = frame
                .lazy()
                .with_column((col("offset") - col("onset")).alias("duration"))
                .collect()?;
        }
        Ok(Self { frame })
    }

    pub fn from_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        let mut options = options.clone();
        options
            .schema_overrides
            .entry("name".to_string())
            .or_insert(DType::Str);
        Self::new(read_csv(path, &options)?)
    }

    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Append a constant column unless one of that name exists already.
    pub fn add_literal(&mut self, name: &str, value: &Value) -> Result<bool> {
        if self.frame.has_column(name) {
            return Ok(false);
        }
        self.frame = std::mem::take(&mut self.frame).with_literal(name, value)?;
        Ok(true)
    }

    /// Add one label column per stimulus label column, replacing columns
    /// written by an earlier mapping.
    pub fn map_to_aois(&mut self, stimulus: &TextStimulus, mapping: &EventMapping) -> Result<()> {
        self.frame = map_to_aois(
            &self.frame,
            stimulus,
            &mapping.location,
            mapping.page_column.as_deref(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::AoiColumns;
    use crate::GazekitError;
    use polars::prelude::{df, DataType};

    fn events() -> DataFrame {
        df!(
            "name" => ["fixation", "fixation"],
            "onset" => [0_i64, 200],
            "offset" => [150_i64, 320],
            "location_x" => [5.0, 50.0],
            "location_y" => [5.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn test_duration_derived() {
        let events = EventFrame::new(events()).unwrap();
        let duration = events.frame().require("duration").unwrap();
        assert_eq!(duration.dtype(), &DataType::Int64);
        assert_eq!(
            events.frame().f64_values("duration").unwrap(),
            vec![Some(150.0), Some(120.0)]
        );
    }

    #[test]
    fn test_duration_float() {
        let frame = df!(
            "name" => ["saccade"],
            "onset" => [1_i64],
            "offset" => [2.5],
        )
        .unwrap();
        let events = EventFrame::new(frame).unwrap();
        assert_eq!(events.frame().f64_values("duration").unwrap(), vec![Some(1.5)]);
    }

    #[test]
    fn test_duration_needs_numbers() {
        let frame = df!(
            "name" => ["saccade"],
            "onset" => ["start"],
            "offset" => [2.5],
        )
        .unwrap();
        let err = EventFrame::new(frame).unwrap_err();
        assert!(matches!(err, GazekitError::DtypeMismatch { name, .. } if name == "onset"));
    }

    #[test]
    fn test_requires_onset() {
        let frame = df!("name" => ["fixation"]).unwrap();
        let err = EventFrame::new(frame).unwrap_err();
        assert!(matches!(err, GazekitError::ColumnNotFound(name) if name == "onset"));
    }

    #[test]
    fn test_add_literal_keeps_existing() {
        let mut events = EventFrame::new(events()).unwrap();
        assert!(events.add_literal("subject_id", &Value::Int(3)).unwrap());
        assert!(!events.add_literal("onset", &Value::Int(0)).unwrap());
        let frame = events.frame();
        assert_eq!(frame.f64_values("onset").unwrap()[1], Some(200.0));
        assert_eq!(frame.f64_values("subject_id").unwrap()[1], Some(3.0));
    }

    #[test]
    fn test_remap_replaces_label_column() {
        let aois = df!(
            "word" => ["first"],
            "x" => [0.0],
            "y" => [0.0],
            "ex" => [10.0],
            "ey" => [10.0],
        )
        .unwrap();
        let stimulus =
            TextStimulus::new(aois, AoiColumns::new(["word"], "x", "y").with_end("ex", "ey"))
                .unwrap();

        let mut events = EventFrame::new(events()).unwrap();
        events
            .map_to_aois(&stimulus, &EventMapping::default())
            .unwrap();
        let width = events.frame().width();
        events
            .map_to_aois(&stimulus, &EventMapping::default())
            .unwrap();
        assert_eq!(events.frame().width(), width);
        let words: Vec<Option<&str>> = events
            .frame()
            .require("word")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(words, vec![Some("first"), Some("")]);
    }
}

use crate::aoi::{map_points, pick_components};
use crate::error::{GazekitError, Result};
use crate::experiment::Experiment;
use crate::frame::{FrameExt, Value};
use crate::stimulus::TextStimulus;
use polars::prelude::{col, concat_list, lit, DataFrame, DataType, Expr, IntoLazy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit of the raw timestamps. Loaded frames always hold milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    S,
    #[default]
    Ms,
    /// Sample index; converting needs the sampling rate
    Step,
}

impl FromStr for TimeUnit {
    type Err = GazekitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s" => Ok(Self::S),
            "ms" => Ok(Self::Ms),
            "step" => Ok(Self::Step),
            other => Err(GazekitError::invalid(
                "time_unit",
                format!("unsupported unit '{other}', expected s, ms or step"),
            )),
        }
    }
}

/// Which nested coordinate column to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeType {
    Pixel,
    Position,
}

impl GazeType {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Pixel => "pixel",
            Self::Position => "position",
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Pixel => Self::Position,
            Self::Position => Self::Pixel,
        }
    }
}

/// Eye selection for nested coordinate columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    /// Cyclopean if available, else right, else the only pair
    #[default]
    Auto,
    Left,
    Right,
    Cyclops,
    /// Monocular data
    Mono,
}

impl Eye {
    /// Component indices `(x, y)` for data with `components` entries per row.
    ///
    /// Layouts: 2 = `[x, y]`, 4 = `[xl, yl, xr, yr]`, 6 = 4 plus `[xc, yc]`.
    pub fn component_pair(self, components: usize) -> Result<(usize, usize)> {
        match (components, self) {
            (2, Self::Auto | Self::Left | Self::Right | Self::Mono) => Ok((0, 1)),
            (4 | 6, Self::Left) => Ok((0, 1)),
            (4, Self::Auto) | (4 | 6, Self::Right) => Ok((2, 3)),
            (6, Self::Auto | Self::Cyclops) => Ok((4, 5)),
            _ => Err(GazekitError::InvalidEye {
                eye: self.to_string(),
                components,
            }),
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Left => "left",
            Self::Right => "right",
            Self::Cyclops => "cyclops",
            Self::Mono => "mono",
        };
        f.write_str(name)
    }
}

impl FromStr for Eye {
    type Err = GazekitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "cyclops" | "cyclopean" => Ok(Self::Cyclops),
            "mono" | "monocular" => Ok(Self::Mono),
            other => Err(GazekitError::invalid("eye", format!("unknown eye '{other}'"))),
        }
    }
}

/// Column roles of a raw gaze table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeColumns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_column: Option<String>,
    pub time_unit: TimeUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_column: Option<String>,
}

impl GazeColumns {
    /// Component groups paired with the nested column they are merged into.
    pub(crate) fn component_groups(&self) -> [(&'static str, Option<&Vec<String>>); 4] {
        [
            ("pixel", self.pixel_columns.as_ref()),
            ("position", self.position_columns.as_ref()),
            ("velocity", self.velocity_columns.as_ref()),
            ("acceleration", self.acceleration_columns.as_ref()),
        ]
    }

    /// Every flat column that must hold numbers.
    pub(crate) fn numeric_columns(&self) -> Vec<&str> {
        self.component_groups()
            .into_iter()
            .filter_map(|(_, group)| group)
            .flatten()
            .map(String::as_str)
            .chain(self.distance_column.as_deref())
            .collect()
    }
}

/// Gaze samples with nested coordinate columns and times in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct GazeFrame {
    frame: DataFrame,
    experiment: Option<Experiment>,
    trial_columns: Vec<String>,
    n_components: Option<usize>,
}

impl GazeFrame {
    /// Normalize a raw table.
    ///
    /// Component columns are merged into `pixel`, `position`, `velocity` and
    /// `acceleration` list columns, the time column is renamed to `time` and
    /// converted to milliseconds, and the distance column becomes `distance`.
    /// A table that already holds nested columns keeps them.
    pub fn new(
        mut frame: DataFrame,
        experiment: Option<Experiment>,
        columns: &GazeColumns,
    ) -> Result<Self> {
        if let Some(experiment) = &experiment {
            experiment.validate()?;
        }

        let trial_columns = columns.trial_columns.clone().unwrap_or_default();
        for trial_column in &trial_columns {
            frame.require(trial_column)?;
        }

        let mut n_components = None;
        for (nested, group) in columns.component_groups() {
            let Some(group) = group.filter(|g| !g.is_empty()) else {
                continue;
            };
            if !matches!(group.len(), 2 | 4 | 6) {
                return Err(GazekitError::invalid(
                    format!("{nested}_columns"),
                    format!("expected 2, 4 or 6 components, got {}", group.len()),
                ));
            }
            if let Some(previous) = n_components.filter(|&n| n != group.len()) {
                return Err(GazekitError::invalid(
                    format!("{nested}_columns"),
                    format!("has {} components, other columns have {previous}", group.len()),
                ));
            }
            n_components = Some(group.len());
            frame = nest_components(frame, nested, group)?;
        }
        if n_components.is_none() {
            n_components = nested_width(&frame)?;
        }

        if let Some(time_column) = &columns.time_column {
            frame.require(time_column)?;
            frame.rename(time_column, "time".into())?;
            frame = convert_time(frame, columns.time_unit, experiment.as_ref())?;
        }

        if let Some(distance_column) = &columns.distance_column {
            frame.require(distance_column)?;
            frame.rename(distance_column, "distance".into())?;
            frame.cast_column("distance", &DataType::Float64)?;
        }

        Ok(Self {
            frame,
            experiment,
            trial_columns,
            n_components,
        })
    }

    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub const fn experiment(&self) -> Option<&Experiment> {
        self.experiment.as_ref()
    }

    pub fn trial_columns(&self) -> &[String] {
        &self.trial_columns
    }

    /// Components per nested column: 2, 4 or 6.
    pub const fn n_components(&self) -> Option<usize> {
        self.n_components
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Append a column that holds the same value in every row, unless a
    /// column of that name already exists.
    pub fn add_literal(&mut self, name: &str, value: &Value) -> Result<bool> {
        if self.frame.has_column(name) {
            return Ok(false);
        }
        self.frame = std::mem::take(&mut self.frame).with_literal(name, value)?;
        Ok(true)
    }

    /// Label every sample with the AOI its gaze falls into.
    ///
    /// `gaze_type` picks the nested column; `None` uses `position` when
    /// present, else `pixel`. A requested column that is missing falls back
    /// to the other one.
    pub fn map_to_aois(
        &mut self,
        stimulus: &TextStimulus,
        eye: Eye,
        gaze_type: Option<GazeType>,
    ) -> Result<()> {
        let gaze_type = self.resolve_gaze_type(gaze_type)?;
        let rows = self.frame.list_rows(gaze_type.column())?;
        let components = self
            .n_components
            .or_else(|| rows.iter().flatten().map(Vec::len).next())
            .unwrap_or(2);
        let (ix, iy) = eye.component_pair(components)?;
        log::debug!(
            "Mapping {} column, components ({ix}, {iy}) of {components}",
            gaze_type.column()
        );

        let points = pick_components(&rows, ix, iy);
        for column in map_points(&points, None, stimulus)? {
            self.frame.with_column(column)?;
        }
        Ok(())
    }

    fn resolve_gaze_type(&self, requested: Option<GazeType>) -> Result<GazeType> {
        let has = |gaze_type: GazeType| self.frame.has_column(gaze_type.column());
        match requested {
            Some(gaze_type) if has(gaze_type) => Ok(gaze_type),
            Some(gaze_type) if has(gaze_type.other()) => {
                log::warn!(
                    "No {} column in gaze data, mapping {} instead",
                    gaze_type.column(),
                    gaze_type.other().column()
                );
                Ok(gaze_type.other())
            }
            None if has(GazeType::Position) => Ok(GazeType::Position),
            None if has(GazeType::Pixel) => Ok(GazeType::Pixel),
            _ => Err(GazekitError::MissingLocationColumns),
        }
    }
}

/// Components per row of the first nested column already in `frame`.
fn nested_width(frame: &DataFrame) -> Result<Option<usize>> {
    for nested in ["pixel", "position", "velocity", "acceleration"] {
        let is_list = frame
            .require(nested)
            .map_or(false, |column| column.dtype().is_list());
        if is_list {
            let rows = frame.list_rows(nested)?;
            return Ok(rows.iter().flatten().map(Vec::len).next());
        }
    }
    Ok(None)
}

/// Replace the flat `group` columns by one list column named `nested`.
/// Null components become NaN so every row keeps its layout.
fn nest_components(frame: DataFrame, nested: &str, group: &[String]) -> Result<DataFrame> {
    let mut components: Vec<Expr> = Vec::with_capacity(group.len());
    for name in group {
        let column = frame.require(name)?;
        if !column.dtype().is_primitive_numeric() {
            return Err(GazekitError::DtypeMismatch {
                name: name.clone(),
                expected: "numeric".to_string(),
                found: column.dtype().clone(),
            });
        }
        components.push(
            col(name.as_str())
                .cast(DataType::Float64)
                .fill_null(lit(f64::NAN)),
        );
    }
    Ok(frame
        .lazy()
        .with_column(concat_list(components)?.alias(nested))
        .drop(group.iter().map(String::as_str))
        .collect()?)
}

fn convert_time(
    frame: DataFrame,
    unit: TimeUnit,
    experiment: Option<&Experiment>,
) -> Result<DataFrame> {
    let factor = match unit {
        TimeUnit::Ms => return Ok(frame),
        TimeUnit::S => 1000.0,
        TimeUnit::Step => {
            let sampling_rate = experiment.and_then(|e| e.sampling_rate).ok_or_else(|| {
                GazekitError::invalid(
                    "time_unit",
                    "step timestamps need an experiment with a sampling rate",
                )
            })?;
            1000.0 / sampling_rate
        }
    };
    let dtype = frame.require("time")?.dtype();
    if !dtype.is_primitive_numeric() {
        return Err(GazekitError::DtypeMismatch {
            name: "time".to_string(),
            expected: "numeric".to_string(),
            found: dtype.clone(),
        });
    }
    Ok(frame
        .lazy()
        .with_column((col("time").cast(DataType::Float64) * lit(factor)).alias("time"))
        .collect()?)
}

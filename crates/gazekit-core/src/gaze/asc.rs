//! EyeLink ASC parsing.
//!
//! Sample lines (`<time> <x> <y> <pupil> ...`) become rows. Every other line
//! is only checked against the additional patterns, whose matches set
//! columns that the following samples carry.

use crate::error::{GazekitError, Result};
use crate::frame::{DType, FrameExt};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Sample line; missing coordinates during blinks are written as `.`.
static SAMPLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<time>\d+)\s+(?P<x_pix>-?\d*\.?\d+|\.)\s+(?P<y_pix>-?\d*\.?\d+|\.)\s+(?P<pupil>\d*\.?\d+|\.)",
    )
    .expect("regex is compile-time constant")
});

/// A pattern that adds a column to the parsed samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AscPattern {
    /// Each named group becomes a column holding the last captured value
    Regex(String),
    /// Lines matching `pattern` set `column` to `value`
    Fixed {
        pattern: String,
        column: String,
        value: String,
    },
}

/// Additional patterns, either a preset key or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AscPatterns {
    Preset(String),
    Custom(Vec<AscPattern>),
}

impl Default for AscPatterns {
    fn default() -> Self {
        Self::Preset("eyelink".to_string())
    }
}

enum Compiled {
    Groups(Regex),
    Fixed {
        regex: Regex,
        column: String,
        value: String,
    },
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| GazekitError::invalid("patterns", err.to_string()))
}

impl AscPatterns {
    fn compile(&self) -> Result<Vec<Compiled>> {
        match self {
            // The EyeLink preset adds no columns beyond the samples.
            Self::Preset(key) if key == "eyelink" => Ok(Vec::new()),
            Self::Preset(key) => Err(GazekitError::invalid(
                "patterns",
                format!("unknown pattern key '{key}'. Supported keys are: eyelink"),
            )),
            Self::Custom(patterns) => patterns
                .iter()
                .map(|pattern| match pattern {
                    AscPattern::Regex(pattern) => compile(pattern).map(Compiled::Groups),
                    AscPattern::Fixed {
                        pattern,
                        column,
                        value,
                    } => Ok(Compiled::Fixed {
                        regex: compile(pattern)?,
                        column: column.clone(),
                        value: value.clone(),
                    }),
                })
                .collect(),
        }
    }
}

impl Compiled {
    fn columns(&self) -> Vec<String> {
        match self {
            Self::Groups(regex) => regex.capture_names().flatten().map(str::to_string).collect(),
            Self::Fixed { column, .. } => vec![column.clone()],
        }
    }

    fn apply(&self, line: &str, current: &mut BTreeMap<String, Option<String>>) {
        match self {
            Self::Groups(regex) => {
                let Some(captures) = regex.captures(line) else {
                    return;
                };
                for name in regex.capture_names().flatten() {
                    if let Some(value) = captures.name(name) {
                        current.insert(name.to_string(), Some(value.as_str().to_string()));
                    }
                }
            }
            Self::Fixed {
                regex,
                column,
                value,
            } => {
                if regex.is_match(line) {
                    current.insert(column.clone(), Some(value.clone()));
                }
            }
        }
    }
}

fn coordinate(text: &str) -> f64 {
    text.parse().unwrap_or(f64::NAN)
}

/// Parse the samples of an ASC file into `time`, `x_pix`, `y_pix`, `pupil`
/// and one column per pattern column. Pattern columns are text unless
/// `schema` gives a dtype.
pub(crate) fn parse_eyelink(
    path: &Path,
    patterns: &AscPatterns,
    schema: &BTreeMap<String, DType>,
) -> Result<DataFrame> {
    let compiled = patterns.compile()?;
    let mut current: BTreeMap<String, Option<String>> = compiled
        .iter()
        .flat_map(Compiled::columns)
        .map(|column| (column, None))
        .collect();

    let text = fs::read_to_string(path)?;
    let mut time = Vec::new();
    let mut x_pix = Vec::new();
    let mut y_pix = Vec::new();
    let mut pupil = Vec::new();
    let mut extra: BTreeMap<String, Vec<Option<String>>> = current
        .keys()
        .map(|column| (column.clone(), Vec::new()))
        .collect();

    for line in text.lines() {
        for pattern in &compiled {
            pattern.apply(line, &mut current);
        }
        let Some(sample) = SAMPLE_LINE.captures(line) else {
            continue;
        };
        let timestamp: i64 = sample["time"].parse().map_err(|_| {
            GazekitError::invalid("time", format!("'{}' is not a timestamp", &sample["time"]))
        })?;
        time.push(timestamp);
        x_pix.push(coordinate(&sample["x_pix"]));
        y_pix.push(coordinate(&sample["y_pix"]));
        pupil.push(coordinate(&sample["pupil"]));
        for (column, values) in &mut extra {
            values.push(current.get(column).cloned().flatten());
        }
    }
    log::debug!("Parsed {} samples from {}", time.len(), path.display());

    let mut columns = vec![
        Column::new("time".into(), time),
        Column::new("x_pix".into(), x_pix),
        Column::new("y_pix".into(), y_pix),
        Column::new("pupil".into(), pupil),
    ];
    for (column, values) in extra {
        columns.push(Column::new(column.into(), values));
    }
    let mut frame = DataFrame::new(columns)?;
    for (column, dtype) in schema {
        frame.cast_column(column, &DataType::from(*dtype))?;
    }
    Ok(frame)
}

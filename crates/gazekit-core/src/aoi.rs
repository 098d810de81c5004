//! Area-of-interest mapping.
//!
//! Assigns each location in a frame the labels of the AOI rectangle that
//! contains it. AOIs are indexed in one R-tree per page so lookups stay
//! logarithmic in the number of AOIs on a page.
//!
//! Containment is half-open (`start <= v < end` on both axes). When AOIs
//! overlap, the one that comes first in the AOI table wins.

use crate::error::{GazekitError, Result};
use crate::frame::FrameExt;
use crate::geometry::Rect;
use crate::gaze::Eye;
use crate::stimulus::{Boundary, TextStimulus};
use polars::prelude::{Column, DataFrame, NamedFrom};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

/// An `(x, y)` location.
pub type Point = [f64; 2];

/// Where the mapped coordinates come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationSource {
    /// `location_x`/`location_y`, then position, then pixel
    #[default]
    Auto,
    Pixel,
    Position,
    /// Explicit flat coordinate columns
    Columns { x: String, y: String },
}

impl LocationSource {
    pub fn columns(x: &str, y: &str) -> Self {
        Self::Columns {
            x: x.to_string(),
            y: y.to_string(),
        }
    }
}

/// R-tree entry: an AOI rectangle and its row in the AOI table.
#[derive(Debug, Clone, Copy)]
struct AoiEnvelope {
    rect: Rect,
    row: usize,
}

impl RTreeObject for AoiEnvelope {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.rect.start_x, self.rect.start_y],
            [self.rect.end_x, self.rect.end_y],
        )
    }
}

/// Spatial index over the AOIs of a stimulus, one tree per page.
pub struct AoiIndex {
    partitions: HashMap<Option<String>, RTree<AoiEnvelope>>,
    partitioned: bool,
}

impl AoiIndex {
    /// Index the stimulus AOIs.
    ///
    /// With `partitioned` set, AOIs are grouped by the stimulus page column;
    /// otherwise all AOIs share a single tree. Rows with missing or
    /// non-finite coordinates are skipped.
    pub fn build(stimulus: &TextStimulus, partitioned: bool) -> Result<Self> {
        let columns = stimulus.columns();
        let aois = stimulus.aois();
        let boundary = columns.boundary()?;

        let start_x = aois.f64_values(&columns.start_x_column)?;
        let start_y = aois.f64_values(&columns.start_y_column)?;
        let (second_x, second_y, is_size) = match boundary {
            Boundary::Size { width, height } => {
                (aois.f64_values(width)?, aois.f64_values(height)?, true)
            }
            Boundary::End { end_x, end_y } => {
                (aois.f64_values(end_x)?, aois.f64_values(end_y)?, false)
            }
        };
        let pages = match (&columns.page_column, partitioned) {
            (Some(page_column), true) => Some(aois.row_keys(page_column)?),
            _ => None,
        };

        let mut entries: HashMap<Option<String>, Vec<AoiEnvelope>> = HashMap::new();
        let mut skipped = 0_usize;
        for row in 0..aois.height() {
            let coordinates = (start_x[row], start_y[row], second_x[row], second_y[row]);
            let rect = match coordinates {
                (Some(x), Some(y), Some(w), Some(h)) if is_size => Rect::from_size(x, y, w, h),
                (Some(x), Some(y), Some(ex), Some(ey)) => Rect::from_corners(x, y, ex, ey),
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            if !rect.is_finite() {
                skipped += 1;
                continue;
            }
            let key = pages.as_ref().and_then(|pages| pages[row].clone());
            entries
                .entry(key)
                .or_default()
                .push(AoiEnvelope { rect, row });
        }
        if skipped > 0 {
            log::warn!("Skipped {skipped} AOIs with missing or non-finite coordinates");
        }

        let partitions: HashMap<_, _> = entries
            .into_iter()
            .map(|(key, envelopes)| (key, RTree::bulk_load(envelopes)))
            .collect();
        log::debug!(
            "Indexed {} AOIs in {} partitions",
            aois.height() - skipped,
            partitions.len()
        );
        Ok(Self {
            partitions,
            partitioned: pages.is_some(),
        })
    }

    /// Whether lookups are restricted to a page.
    pub const fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    /// Row of the first AOI (in table order) containing `point` on `page`.
    pub fn lookup(&self, point: Point, page: Option<&str>) -> Option<usize> {
        let [x, y] = point;
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let key = if self.partitioned {
            Some(page?.to_string())
        } else {
            None
        };
        let tree = self.partitions.get(&key)?;
        // The envelope query is closed on every edge; the half-open test on
        // the candidates drops points on end edges.
        tree.locate_in_envelope_intersecting(&AABB::from_point(point))
            .filter(|envelope| envelope.rect.contains(x, y))
            .map(|envelope| envelope.row)
            .min()
    }
}

/// Map points to AOI labels.
///
/// Returns one string column per stimulus label column, named after it.
/// Points that are `None`, non-finite or outside every AOI get `""`. When
/// `pages` is given and the stimulus has a page column, only AOIs on the
/// same page are considered.
pub fn map_points(
    points: &[Option<Point>],
    pages: Option<&[Option<String>]>,
    stimulus: &TextStimulus,
) -> Result<Vec<Column>> {
    if let Some(pages) = pages {
        if pages.len() != points.len() {
            return Err(GazekitError::invalid(
                "pages",
                format!("{} page keys for {} points", pages.len(), points.len()),
            ));
        }
    }
    let partitioned = pages.is_some() && stimulus.columns().page_column.is_some();
    let index = AoiIndex::build(stimulus, partitioned)?;

    let rows: Vec<Option<usize>> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let page = pages.and_then(|pages| pages[i].as_deref());
            point.and_then(|point| index.lookup(point, page))
        })
        .collect();
    let matched = rows.iter().filter(|row| row.is_some()).count();
    log::debug!("Mapped {matched} of {} locations to AOIs", rows.len());

    stimulus
        .columns()
        .aoi_columns
        .iter()
        .map(|label| {
            let labels = stimulus.aois().require(label)?.str()?;
            let values: Vec<&str> = rows
                .iter()
                .map(|row| row.and_then(|row| labels.get(row)).unwrap_or_default())
                .collect();
            Ok(Column::new(label.into(), values))
        })
        .collect()
}

/// Map the locations of `frame` and return a copy with the label columns.
///
/// `page_key` names the frame column that holds the page of each row; it is
/// matched against the stimulus page column.
///
/// # Examples
///
/// ```
/// use gazekit_core::{map_to_aois, AoiColumns, LocationSource, TextStimulus};
/// use polars::prelude::*;
///
/// let aois = df!(
///     "word" => ["hello", "world"],
///     "x" => [0.0, 50.0],
///     "y" => [0.0, 0.0],
///     "w" => [50.0, 50.0],
///     "h" => [20.0, 20.0],
/// )?;
/// let stimulus = TextStimulus::new(aois, AoiColumns::new(["word"], "x", "y").with_size("w", "h"))?;
///
/// let events = df!(
///     "location_x" => [10.0, 60.0, 200.0],
///     "location_y" => [5.0, 5.0, 5.0],
/// )?;
/// let mapped = map_to_aois(&events, &stimulus, &LocationSource::Auto, None)?;
/// let words = mapped.column("word")?.str()?;
/// assert_eq!(words.get(0), Some("hello"));
/// assert_eq!(words.get(1), Some("world"));
/// assert_eq!(words.get(2), Some(""));
/// # Ok::<(), gazekit_core::GazekitError>(())
/// ```
pub fn map_to_aois(
    frame: &DataFrame,
    stimulus: &TextStimulus,
    source: &LocationSource,
    page_key: Option<&str>,
) -> Result<DataFrame> {
    let points = resolve_points(frame, source)?;
    let pages = page_key.map(|name| frame.row_keys(name)).transpose()?;
    if page_key.is_some() && stimulus.columns().page_column.is_none() {
        log::debug!("Stimulus has no page column, mapping across all AOIs");
    }

    let mut mapped = frame.clone();
    for column in map_points(&points, pages.as_deref(), stimulus)? {
        mapped.with_column(column)?;
    }
    Ok(mapped)
}

/// Pick the coordinates of every row according to `source`.
fn resolve_points(frame: &DataFrame, source: &LocationSource) -> Result<Vec<Option<Point>>> {
    match source {
        LocationSource::Columns { x, y } => flat_points(frame, x, y),
        LocationSource::Auto => {
            if frame.has_column("location_x") && frame.has_column("location_y") {
                return flat_points(frame, "location_x", "location_y");
            }
            located(frame, "position")
                .or_else(|| located(frame, "pixel"))
                .ok_or(GazekitError::MissingLocationColumns)?
        }
        LocationSource::Pixel | LocationSource::Position => {
            let (requested, fallback) = if matches!(source, LocationSource::Pixel) {
                ("pixel", "position")
            } else {
                ("position", "pixel")
            };
            if let Some(points) = located(frame, requested) {
                return points;
            }
            let points = located(frame, fallback).ok_or(GazekitError::MissingLocationColumns)?;
            log::warn!("No {requested} columns in frame, mapping {fallback} instead");
            points
        }
    }
}

/// Coordinates stored under `base`: flat `{base}_x`/`{base}_y` columns or
/// a nested `{base}` list column. `None` when neither exists.
fn located(frame: &DataFrame, base: &str) -> Option<Result<Vec<Option<Point>>>> {
    let (x, y) = (format!("{base}_x"), format!("{base}_y"));
    if frame.has_column(&x) && frame.has_column(&y) {
        return Some(flat_points(frame, &x, &y));
    }
    if !frame.has_column(base) {
        return None;
    }
    Some(nested_points(frame, base))
}

fn flat_points(frame: &DataFrame, x: &str, y: &str) -> Result<Vec<Option<Point>>> {
    let xs = frame.f64_values(x)?;
    let ys = frame.f64_values(y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Some([x?, y?]))
        .collect())
}

fn nested_points(frame: &DataFrame, name: &str) -> Result<Vec<Option<Point>>> {
    let rows = frame.list_rows(name)?;
    let components = rows.iter().flatten().map(Vec::len).next().unwrap_or(2);
    let (ix, iy) = Eye::Auto.component_pair(components)?;
    Ok(pick_components(&rows, ix, iy))
}

/// Take components `ix` and `iy` of every nested row.
pub(crate) fn pick_components(
    rows: &[Option<Vec<f64>>],
    ix: usize,
    iy: usize,
) -> Vec<Option<Point>> {
    rows.iter()
        .map(|values| {
            let values = values.as_ref()?;
            Some([*values.get(ix)?, *values.get(iy)?])
        })
        .collect()
}

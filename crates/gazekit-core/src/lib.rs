//! # gazekit-core
//!
//! Tables and mapping primitives for eye-tracking data.
//!
//! ## Features
//!
//! - **Tables**: polars [`DataFrame`]s read from CSV or Arrow IPC, with the
//!   [`FrameExt`] accessors shared by the loaders and the mapper
//! - **Gaze samples**: [`GazeFrame`] nests component columns into `pixel`,
//!   `position`, `velocity` and `acceleration` and normalizes time to
//!   milliseconds; loaders for CSV, Arrow IPC and EyeLink ASC live in [`gaze::io`]
//! - **Events**: [`EventFrame`] for fixations and other events
//! - **AOI mapping**: label gaze samples or events with the area of interest
//!   of a [`TextStimulus`] they fall into
//!
//! ## Mapping fixations to words
//!
//! ```no_run
//! use gazekit_core::{AoiColumns, CsvOptions, EventFrame, EventMapping, FrameExt, TextStimulus};
//!
//! let columns = AoiColumns::new(["char", "word"], "top_left_x", "top_left_y")
//!     .with_size("width", "height")
//!     .with_page("page");
//! let stimulus = TextStimulus::from_file("toy_text_1_1_aoi.csv", columns, &CsvOptions::default())?;
//!
//! let mut fixations = EventFrame::from_csv("toy_fixations.csv", &CsvOptions::default())?;
//! fixations.map_to_aois(&stimulus, &EventMapping::default().with_page("page_id"))?;
//! println!("{:?}", fixations.frame().require("word")?);
//! # Ok::<(), gazekit_core::GazekitError>(())
//! ```

pub mod aoi;
pub mod error;
pub mod events;
pub mod experiment;
pub mod frame;
pub mod gaze;
pub mod geometry;
pub mod stimulus;

pub use aoi::{map_points, map_to_aois, AoiIndex, LocationSource, Point};
pub use error::{GazekitError, Result};
pub use events::{EventFrame, EventMapping};
pub use experiment::{EyeTracker, Experiment, Screen};
pub use frame::{
    csv_from_reader, read_csv, read_ipc, write_csv, CsvOptions, DType, FrameExt, Value,
};
pub use gaze::{AscPattern, AscPatterns, Eye, GazeColumns, GazeFrame, GazeType, TimeUnit};
pub use geometry::Rect;
pub use polars::prelude::DataFrame;
pub use stimulus::{AoiColumns, Boundary, TextStimulus};

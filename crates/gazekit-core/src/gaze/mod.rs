//! Gaze sample tables.

mod asc;
mod frame;
pub mod io;

pub use asc::{AscPattern, AscPatterns};
pub use frame::{Eye, GazeColumns, GazeFrame, GazeType, TimeUnit};

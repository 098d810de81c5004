//! Recording setup: screen geometry, sampling rate and eye tracker.
//!
//! These are plain configuration records. They are carried inside dataset
//! definitions and used to normalize time columns; the degree-of-visual-angle
//! transforms that would consume the screen geometry are out of scope.

use crate::error::{GazekitError, Result};
use serde::{Deserialize, Serialize};

fn check_positive<T: Into<f64> + Copy>(name: &str, value: Option<T>) -> Result<()> {
    match value {
        Some(v) if !(v.into() > 0.0) => Err(GazekitError::invalid(
            name,
            format!("must be greater than zero, got {}", v.into()),
        )),
        _ => Ok(()),
    }
}

/// Physical and pixel dimensions of the stimulus screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screen {
    #[serde(alias = "screen_width_px", skip_serializing_if = "Option::is_none")]
    pub width_px: Option<u32>,
    #[serde(alias = "screen_height_px", skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
    #[serde(alias = "screen_width_cm", skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f64>,
    #[serde(alias = "screen_height_cm", skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_cm: Option<f64>,
    /// Location of the pixel origin, e.g. `upper left` or `center`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Screen {
    /// Check that every present dimension is greater than zero.
    pub fn validate(&self) -> Result<()> {
        check_positive("width_px", self.width_px)?;
        check_positive("height_px", self.height_px)?;
        check_positive("width_cm", self.width_cm)?;
        check_positive("height_cm", self.height_cm)?;
        check_positive("distance_cm", self.distance_cm)?;
        Ok(())
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Eye tracker metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeTracker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<bool>,
}

impl EyeTracker {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Recording setup of a dataset.
///
/// The screen fields are flattened so that both `width_px` and the prefixed
/// `screen_width_px` spellings are accepted at the top level.
///
/// # Examples
///
/// ```
/// use gazekit_core::Experiment;
///
/// let experiment = Experiment::default().with_sampling_rate(1000.0).unwrap();
/// assert_eq!(experiment.sampling_rate, Some(1000.0));
/// assert!(Experiment::default().with_sampling_rate(0.0).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experiment {
    #[serde(flatten)]
    pub screen: Screen,
    /// Samples per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling_rate: Option<f64>,
    #[serde(skip_serializing_if = "EyeTracker::is_empty")]
    pub eyetracker: EyeTracker,
}

impl Experiment {
    pub fn new(screen: Screen, sampling_rate: Option<f64>) -> Result<Self> {
        let experiment = Self {
            screen,
            sampling_rate,
            eyetracker: EyeTracker::default(),
        };
        experiment.validate()?;
        Ok(experiment)
    }

    pub fn with_sampling_rate(mut self, sampling_rate: f64) -> Result<Self> {
        self.sampling_rate = Some(sampling_rate);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.screen.validate()?;
        check_positive("sampling_rate", self.sampling_rate)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

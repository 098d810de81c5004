use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of file a dataset resource provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Raw gaze samples
    Gaze,
    /// Fixations and other events computed by the dataset authors
    PrecomputedEvents,
    /// Reading measures computed by the dataset authors
    PrecomputedReadingMeasures,
}

impl ContentType {
    /// All content types in download/extraction order
    pub const ALL: [Self; 3] = [
        Self::Gaze,
        Self::PrecomputedEvents,
        Self::PrecomputedReadingMeasures,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gaze => "gaze",
            Self::PrecomputedEvents => "precomputed_events",
            Self::PrecomputedReadingMeasures => "precomputed_reading_measures",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|content| content.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown content type '{s}'. Expected: gaze, precomputed_events, precomputed_reading_measures"
                )
            })
    }
}

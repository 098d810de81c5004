//! Error types for table, gaze and AOI operations.

use polars::prelude::{DataType, PolarsError};
use thiserror::Error;

/// Errors raised by `gazekit-core`.
///
/// The two mapping errors carry fixed messages: they are input contract
/// violations that the caller fixes by reconfiguring, never by retrying.
///
/// # Examples
///
/// ```
/// use gazekit_core::GazekitError;
///
/// let err = GazekitError::MissingLocationColumns;
/// assert_eq!(
///     err.to_string(),
///     "neither position nor pixel in gaze dataframe, one needed for mapping"
/// );
/// ```
#[derive(Error, Debug)]
pub enum GazekitError {
    /// The frame has neither a pixel nor a position column pair to map from.
    #[error("neither position nor pixel in gaze dataframe, one needed for mapping")]
    MissingLocationColumns,

    /// The AOI table configures neither width/height nor end coordinates.
    #[error("either aoi_dataframe.width or aoi_dataframe.end_x_column have to be not None")]
    MissingBoundaryColumns,

    /// A configured column does not exist in the table.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// A column exists but holds values of the wrong type.
    #[error("column '{name}' has dtype {found}, expected {expected}")]
    DtypeMismatch {
        /// Column name
        name: String,
        /// Human readable description of the accepted types
        expected: String,
        /// Actual dtype of the column
        found: DataType,
    },

    /// A value could not be converted to the requested dtype.
    #[error("cannot cast column '{name}' to {dtype}: {reason}")]
    Cast {
        /// Column name
        name: String,
        /// Target dtype
        dtype: DataType,
        /// What went wrong
        reason: String,
    },

    /// The requested eye is not available for the number of components.
    #[error("eye '{eye}' is not available for data with {components} components")]
    InvalidEye {
        /// Requested eye
        eye: String,
        /// Number of components in the nested column
        components: usize,
    },

    /// A configuration value is out of range or malformed.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        name: String,
        /// What went wrong
        reason: String,
    },

    /// IO error while reading or writing tables.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by polars while reading, writing or transforming a table.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl GazekitError {
    /// Shorthand for [`GazekitError::InvalidValue`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GazekitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_location_message() {
        assert_eq!(
            GazekitError::MissingLocationColumns.to_string(),
            "neither position nor pixel in gaze dataframe, one needed for mapping"
        );
    }

    #[test]
    fn test_missing_boundary_message() {
        assert_eq!(
            GazekitError::MissingBoundaryColumns.to_string(),
            "either aoi_dataframe.width or aoi_dataframe.end_x_column have to be not None"
        );
    }

    #[test]
    fn test_dtype_mismatch_display() {
        let err = GazekitError::DtypeMismatch {
            name: "top_left_x".to_string(),
            expected: "numeric".to_string(),
            found: DataType::String,
        };
        assert_eq!(
            err.to_string(),
            "column 'top_left_x' has dtype str, expected numeric"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GazekitError = io_err.into();

        match err {
            GazekitError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_polars_error_conversion() {
        let err: GazekitError = PolarsError::ColumnNotFound("page".into()).into();
        assert!(matches!(err, GazekitError::Polars(_)));
        assert!(err.to_string().starts_with("Polars error: "));
    }

    #[test]
    fn test_invalid_shorthand() {
        let err = GazekitError::invalid("sampling_rate", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid value for sampling_rate: must be greater than zero"
        );
    }

    #[test]
    fn test_error_size() {
        let size = std::mem::size_of::<GazekitError>();
        assert!(
            size < 256,
            "GazekitError size is {size} bytes, consider boxing large variants"
        );
    }
}

//! Table input and output on top of polars.
//!
//! Every table in gazekit is a [`DataFrame`]. This module holds the
//! configuration types that dataset definitions deserialize into
//! ([`DType`], [`CsvOptions`], [`Value`]), the readers and writers, and the
//! [`FrameExt`] accessors the mapper and the loaders share.

use crate::error::{GazekitError, Result};
use polars::io::mmap::MmapBytesReader;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Column type as written in dataset definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[serde(alias = "int64", alias = "i64", alias = "Int64")]
    Int,
    #[serde(alias = "float64", alias = "f64", alias = "Float64")]
    Float,
    #[serde(alias = "utf8", alias = "string", alias = "Utf8", alias = "String")]
    Str,
    /// Component lists of floats, e.g. `pixel = [x, y]`
    List,
}

impl From<DType> for DataType {
    fn from(dtype: DType) -> Self {
        match dtype {
            DType::Int => Self::Int64,
            DType::Float => Self::Float64,
            DType::Str => Self::String,
            DType::List => Self::List(Box::new(Self::Float64)),
        }
    }
}

/// A constant cell, e.g. a value parsed from a filename.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Literal expression broadcasting this value.
    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Null => lit(NULL),
            Self::Int(v) => lit(*v),
            Self::Float(v) => lit(*v),
            Self::Str(v) => lit(v.as_str()),
        }
    }

    /// Convert a polars cell. Types without a counterpart become text.
    pub fn from_any(value: &AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Self::Null,
            AnyValue::String(s) => Self::Str((*s).to_string()),
            AnyValue::StringOwned(s) => Self::Str(s.to_string()),
            AnyValue::Float32(v) => Self::Float(f64::from(*v)),
            AnyValue::Float64(v) => Self::Float(*v),
            other => other
                .extract::<i64>()
                .map_or_else(|| Self::Str(other.str_value().into_owned()), Self::Int),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Options for reading delimited files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator, must be a single ASCII character
    pub separator: char,
    pub has_header: bool,
    /// Only keep these columns (names in the file), in this order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Rename the kept columns positionally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_columns: Option<Vec<String>>,
    /// Read these columns (final names) as the given dtype instead of inferring
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schema_overrides: BTreeMap<String, DType>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            has_header: true,
            columns: None,
            new_columns: None,
            schema_overrides: BTreeMap::new(),
        }
    }
}

impl CsvOptions {
    #[must_use = "returns the options with the separator set"]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    #[must_use = "returns the options with the override added"]
    pub fn with_override(mut self, column: impl Into<String>, dtype: DType) -> Self {
        self.schema_overrides.insert(column.into(), dtype);
        self
    }

    fn delimiter(&self) -> Result<u8> {
        u8::try_from(self.separator)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                GazekitError::invalid(
                    "separator",
                    format!("'{}' is not a single ASCII character", self.separator),
                )
            })
    }

    /// Name in the file of the column that ends up as `name`, when it is
    /// known before reading.
    fn source_name(&self, name: &str) -> Option<String> {
        let Some(new_columns) = &self.new_columns else {
            return Some(name.to_string());
        };
        let Some(index) = new_columns.iter().position(|n| n == name) else {
            return Some(name.to_string());
        };
        match &self.columns {
            Some(columns) => columns.get(index).cloned(),
            None if !self.has_header => Some(format!("column_{}", index + 1)),
            None => None,
        }
    }

    /// Split overrides into a schema the reader applies and casts done
    /// after renaming.
    fn split_overrides(&self) -> (Schema, Vec<(&str, DataType)>) {
        let mut reader = Vec::new();
        let mut after = Vec::new();
        for (name, dtype) in &self.schema_overrides {
            match self.source_name(name) {
                Some(source) if *dtype != DType::List => {
                    reader.push((PlSmallStr::from(source), DataType::from(*dtype)));
                }
                _ => after.push((name.as_str(), DataType::from(*dtype))),
            }
        }
        (reader.into_iter().collect(), after)
    }

    fn read_options(&self, schema: Schema) -> Result<CsvReadOptions> {
        let separator = self.delimiter()?;
        let mut options = CsvReadOptions::default()
            .with_has_header(self.has_header)
            .with_infer_schema_length(None)
            .map_parse_options(|parse| parse.with_separator(separator));
        if !schema.is_empty() {
            options = options.with_schema_overwrite(Some(Arc::new(schema)));
        }
        if let Some(columns) = &self.columns {
            options = options.with_columns(Some(columns.iter().map(PlSmallStr::from).collect()));
        }
        Ok(options)
    }

    /// Reorder, rename and cast a freshly read frame.
    fn finish(&self, mut frame: DataFrame, after: Vec<(&str, DataType)>) -> Result<DataFrame> {
        if let Some(columns) = &self.columns {
            frame = frame.select(columns.iter().map(String::as_str))?;
        }
        if let Some(new_columns) = &self.new_columns {
            if new_columns.len() > frame.width() {
                return Err(GazekitError::invalid(
                    "new_columns",
                    format!("{} names given for {} columns", new_columns.len(), frame.width()),
                ));
            }
            let names: Vec<PlSmallStr> = frame
                .get_column_names()
                .into_iter()
                .enumerate()
                .map(|(i, name)| new_columns.get(i).map_or_else(|| name.clone(), PlSmallStr::from))
                .collect();
            frame.set_column_names(names)?;
        }
        for (name, dtype) in after {
            frame.cast_column(name, &dtype)?;
        }
        Ok(frame)
    }
}

/// Read a delimited file.
///
/// # Examples
///
/// ```no_run
/// use gazekit_core::{read_csv, CsvOptions, DType};
///
/// let options = CsvOptions::default().with_override("word", DType::Str);
/// let aois = read_csv("toy_text_1_1_aoi.csv", &options)?;
/// println!("{}", aois.height());
/// # Ok::<(), gazekit_core::GazekitError>(())
/// ```
pub fn read_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<DataFrame> {
    let path = path.as_ref();
    log::debug!("Reading {}", path.display());
    let file = File::open(path)?;
    csv_from_reader(file, options)
}

/// Read delimited text from an open file or an in-memory cursor.
pub fn csv_from_reader<R: MmapBytesReader>(reader: R, options: &CsvOptions) -> Result<DataFrame> {
    let (schema, after) = options.split_overrides();
    let frame = options
        .read_options(schema)?
        .into_reader_with_file_handle(reader)
        .finish()?;
    options.finish(frame, after)
}

/// Write `frame` as comma separated text with a header row.
///
/// List columns are written as `[x, y]` text, nulls as empty cells.
pub fn write_csv<W: Write>(frame: &DataFrame, writer: W) -> Result<()> {
    let mut frame = frame.clone();
    let lists: Vec<PlSmallStr> = frame
        .get_columns()
        .iter()
        .filter(|column| column.dtype().is_list())
        .map(|column| column.name().clone())
        .collect();
    for name in lists {
        let text: StringChunked = frame
            .list_rows(&name)?
            .iter()
            .map(|row| row.as_deref().map(format_list))
            .collect();
        frame.with_column(text.with_name(name).into_column())?;
    }
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut frame)?;
    Ok(())
}

/// Read an Arrow IPC (feather) file.
pub fn read_ipc(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    log::debug!("Reading {}", path.display());
    let file = File::open(path)?;
    Ok(IpcReader::new(file).finish()?)
}

fn format_list(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(f64::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Integral numbers render without a decimal part.
fn numeric_key(value: f64) -> String {
    value.to_string()
}

fn text_key(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => numeric_key(number),
        _ => value.to_string(),
    }
}

/// Accessors over [`DataFrame`] with gazekit errors.
pub trait FrameExt {
    fn has_column(&self, name: &str) -> bool;

    /// The named column, or [`GazekitError::ColumnNotFound`].
    fn require(&self, name: &str) -> Result<&Column>;

    /// Values of a numeric column as floats.
    fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>>;

    /// Keys for matching rows across tables, e.g. page numbers.
    ///
    /// Numeric text is normalized like numbers, so `1`, `1.0` and `"1.0"`
    /// all give `"1"`.
    fn row_keys(&self, name: &str) -> Result<Vec<Option<String>>>;

    /// Rows of a list column. Null components become NaN.
    fn list_rows(&self, name: &str) -> Result<Vec<Option<Vec<f64>>>>;

    /// Strictly cast a column in place.
    fn cast_column(&mut self, name: &str, dtype: &DataType) -> Result<()>;

    /// Append a column holding `value` in every row.
    fn with_literal(self, name: &str, value: &Value) -> Result<DataFrame>
    where
        Self: Sized;
}

impl FrameExt for DataFrame {
    fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .map_err(|_| GazekitError::ColumnNotFound(name.to_string()))
    }

    fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.require(name)?;
        if !column.dtype().is_primitive_numeric() {
            return Err(GazekitError::DtypeMismatch {
                name: name.to_string(),
                expected: "int or float".to_string(),
                found: column.dtype().clone(),
            });
        }
        let floats = column.cast(&DataType::Float64)?;
        Ok(floats.f64()?.into_iter().collect())
    }

    fn row_keys(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.require(name)?;
        if column.dtype().is_primitive_numeric() {
            let floats = column.cast(&DataType::Float64)?;
            return Ok(floats.f64()?.into_iter().map(|v| v.map(numeric_key)).collect());
        }
        let text = column.cast(&DataType::String)?;
        Ok(text.str()?.into_iter().map(|v| v.map(text_key)).collect())
    }

    fn list_rows(&self, name: &str) -> Result<Vec<Option<Vec<f64>>>> {
        let column = self.require(name)?;
        let lists = column.list().map_err(|_| GazekitError::DtypeMismatch {
            name: name.to_string(),
            expected: "list".to_string(),
            found: column.dtype().clone(),
        })?;
        lists
            .into_iter()
            .map(|row| {
                row.map(|values| {
                    let values = values.cast(&DataType::Float64)?;
                    Ok(values
                        .f64()?
                        .into_iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect())
                })
                .transpose()
            })
            .collect()
    }

    fn cast_column(&mut self, name: &str, dtype: &DataType) -> Result<()> {
        let cast = self
            .require(name)?
            .strict_cast(dtype)
            .map_err(|err| GazekitError::Cast {
                name: name.to_string(),
                dtype: dtype.clone(),
                reason: err.to_string(),
            })?;
        self.with_column(cast)?;
        Ok(())
    }

    fn with_literal(self, name: &str, value: &Value) -> Result<DataFrame> {
        Ok(self
            .lazy()
            .with_column(value.to_expr().alias(name))
            .collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str, options: &CsvOptions) -> DataFrame {
        csv_from_reader(Cursor::new(text.as_bytes()), options).unwrap()
    }

    #[test]
    fn test_infers_int_float_str() {
        let frame = read("a,b,c\n1,1.5,x\n2,2,y\n", &CsvOptions::default());
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.require("a").unwrap().dtype(), &DataType::Int64);
        assert_eq!(frame.require("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(frame.require("c").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_empty_cells_are_null() {
        let frame = read("a,b\n1,\n,x\n", &CsvOptions::default());
        assert_eq!(frame.f64_values("a").unwrap(), vec![Some(1.0), None]);
        assert_eq!(frame.require("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_quoted_whitespace_is_kept() {
        let frame = read("char\n\" \"\n", &CsvOptions::default());
        let column = frame.require("char").unwrap();
        assert_eq!(column.str().unwrap().get(0), Some(" "));
    }

    #[test]
    fn test_schema_override_forces_str() {
        let options = CsvOptions::default().with_override("word", DType::Str);
        let frame = read("word\n1\n2\n", &options);
        let column = frame.require("word").unwrap();
        assert_eq!(column.str().unwrap().get(1), Some("2"));
    }

    #[test]
    fn test_schema_override_bad_value() {
        let options = CsvOptions::default().with_override("x", DType::Int);
        assert!(csv_from_reader(Cursor::new("x\nabc\n".as_bytes()), &options).is_err());
    }

    #[test]
    fn test_no_header_names_columns() {
        let options = CsvOptions {
            has_header: false,
            ..CsvOptions::default()
        };
        let frame = read("1,2\n3,4\n", &options);
        assert_eq!(frame.get_column_names_str(), vec!["column_1", "column_2"]);
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_columns_and_new_columns() {
        let options = CsvOptions {
            columns: Some(vec!["c".to_string(), "a".to_string()]),
            new_columns: Some(vec!["z".to_string()]),
            ..CsvOptions::default()
        }
        .with_override("z", DType::Float);
        let frame = read("a,b,c\n1,2,3\n", &options);
        assert_eq!(frame.get_column_names_str(), vec!["z", "a"]);
        assert_eq!(frame.require("z").unwrap().dtype(), &DataType::Float64);
        assert_eq!(frame.f64_values("z").unwrap(), vec![Some(3.0)]);
    }

    #[test]
    fn test_renamed_override_with_header() {
        let options = CsvOptions {
            new_columns: Some(vec!["page".to_string()]),
            ..CsvOptions::default()
        }
        .with_override("page", DType::Str);
        let frame = read("p,x\n1,2\n", &options);
        assert_eq!(frame.get_column_names_str(), vec!["page", "x"]);
        assert_eq!(frame.require("page").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_tab_separator() {
        let options = CsvOptions::default().with_separator('\t');
        let frame = read("x\ty\n1\t2\n", &options);
        assert_eq!(frame.width(), 2);
    }

    #[test]
    fn test_non_ascii_separator_rejected() {
        let options = CsvOptions::default().with_separator('→');
        let err = csv_from_reader(Cursor::new("a\n".as_bytes()), &options).unwrap_err();
        assert!(matches!(err, GazekitError::InvalidValue { .. }));
    }

    #[test]
    fn test_with_literal() {
        let frame = df!("a" => [1_i64, 2, 3]).unwrap();
        let frame = frame.with_literal("subject_id", &Value::Int(7)).unwrap();
        assert_eq!(frame.f64_values("subject_id").unwrap(), vec![Some(7.0); 3]);
        assert_eq!(frame.require("subject_id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_cast_column_strict() {
        let mut frame = df!("a" => ["1", "2"]).unwrap();
        frame.cast_column("a", &DataType::Int64).unwrap();
        assert_eq!(frame.require("a").unwrap().dtype(), &DataType::Int64);

        let mut frame = df!("a" => ["1", "left"]).unwrap();
        let err = frame.cast_column("a", &DataType::Float64).unwrap_err();
        assert!(matches!(err, GazekitError::Cast { name, .. } if name == "a"));
    }

    #[test]
    fn test_f64_values_rejects_text() {
        let frame = df!("x" => ["left"]).unwrap();
        let err = frame.f64_values("x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'x' has dtype str, expected int or float"
        );
    }

    #[test]
    fn test_row_keys_int_float_and_text_agree() {
        let frame = df!(
            "int" => [1_i64, 2],
            "float" => [1.0, 2.5],
            "text" => ["1.0", "2.5"],
            "label" => ["intro", " 1 "]
        )
        .unwrap();
        assert_eq!(
            frame.row_keys("int").unwrap(),
            vec![Some("1".to_string()), Some("2".to_string())]
        );
        assert_eq!(frame.row_keys("float").unwrap(), frame.row_keys("text").unwrap());
        assert_eq!(
            frame.row_keys("label").unwrap(),
            vec![Some("intro".to_string()), Some("1".to_string())]
        );
    }

    #[test]
    fn test_list_rows_fill_nan() {
        let rows = [
            Series::new("".into(), [Some(1.0), None]),
            Series::new("".into(), [3.0, 4.0]),
        ];
        let frame = DataFrame::new(vec![Column::new("pixel".into(), &rows)]).unwrap();
        let values = frame.list_rows("pixel").unwrap();
        assert_eq!(values[1], Some(vec![3.0, 4.0]));
        assert!(values[0].as_ref().unwrap()[1].is_nan());
    }

    #[test]
    fn test_write_csv_formats_lists() {
        let rows = [Series::new("".into(), [1.0, 2.5])];
        let frame = DataFrame::new(vec![
            Column::new("time".into(), [1_i64]),
            Column::new("pixel".into(), &rows),
        ])
        .unwrap();
        let mut buffer = Vec::new();
        write_csv(&frame, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("time,pixel\n1,"));
        assert!(text.contains("[1, 2.5]"));
    }

    #[test]
    fn test_write_then_read() {
        let frame = df!("a" => [1_i64, 2], "b" => [Some("x"), None]).unwrap();
        let mut buffer = Vec::new();
        write_csv(&frame, &mut buffer).unwrap();
        let back = read(std::str::from_utf8(&buffer).unwrap(), &CsvOptions::default());
        assert_eq!(back.f64_values("a").unwrap(), vec![Some(1.0), Some(2.0)]);
        assert_eq!(back.require("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_csv_options_yaml() {
        let options: CsvOptions =
            serde_yaml::from_str("separator: \"\\t\"\nschema_overrides:\n  x: float64\n").unwrap();
        assert_eq!(options.separator, '\t');
        assert!(options.has_header);
        assert_eq!(options.schema_overrides.get("x"), Some(&DType::Float));
    }
}

//! Filename formats and directory scanning
//!
//! A filename format such as `S_{subject_id:d}_{task}.csv` describes which
//! files belong to a dataset and which metadata their names carry. Scanning a
//! directory turns every matching file into one row of a fileinfo table.

use crate::error::Result;
use gazekit_core::{DType, FrameExt, GazekitError};
use log::debug;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom};
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path};

/// Convert a curly-brace filename format into an anchored regex.
///
/// - `{name}` matches any non-empty text (lazily)
/// - `{name:d}` matches digits, `{name:2d}` exactly two digits
/// - `{{` and `}}` are literal braces
/// - everything else matches literally
///
/// # Examples
///
/// ```
/// use gazekit_dataset::filename::curly_to_regex;
///
/// let regex = curly_to_regex("gaze_sub{sub_id:d}_trial{trial_id:d}.csv")?;
/// let captures = regex.captures("gaze_sub12_trial3.csv").unwrap();
/// assert_eq!(&captures["sub_id"], "12");
/// assert!(!regex.is_match("gaze_sub12_trial3xcsv"));
/// # Ok::<(), gazekit_dataset::DatasetError>(())
/// ```
pub fn curly_to_regex(format: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                pattern.push_str(r"\{");
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                pattern.push_str(r"\}");
            }
            '{' => {
                let field: String = chars.by_ref().take_while(|c| *c != '}').collect();
                pattern.push_str(&field_pattern(&field));
            }
            _ => pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }

    pattern.push('$');
    Ok(Regex::new(&pattern)?)
}

fn field_pattern(field: &str) -> String {
    let (name, spec) = field.split_once(':').unwrap_or((field, ""));
    let body = match spec.strip_suffix('d') {
        Some("") => "[0-9]+".to_string(),
        Some(width) if width.chars().all(|c| c.is_ascii_digit()) => {
            format!("[0-9]{{{width}}}")
        }
        _ => ".+?".to_string(),
    };
    format!("(?P<{name}>{body})")
}

/// Compile a filename format.
///
/// Formats that already contain named groups (`(?P<name>...)`) are used as
/// regexes anchored at the start; everything else goes through
/// [`curly_to_regex`].
pub fn filename_regex(format: &str) -> Result<Regex> {
    if format.contains("(?P<") || format.contains("(?<") {
        Ok(Regex::new(&format!("^(?:{format})"))?)
    } else {
        curly_to_regex(format)
    }
}

/// Find files below `root` whose file name matches `regex`.
///
/// The result has a `filepath` column (relative to `root`, `/`-separated)
/// followed by one column per named group, as strings unless
/// `schema_overrides` casts them. Rows are sorted by path.
pub fn scan_files(
    root: &Path,
    regex: &Regex,
    schema_overrides: &BTreeMap<String, DType>,
) -> Result<DataFrame> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));
    let groups: Vec<&str> = regex.capture_names().flatten().collect();
    let mut rows: Vec<(String, Vec<Option<String>>)> = Vec::new();

    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(io::Error::from)?;
        if !path.is_file() {
            continue;
        }
        let Some(captures) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| regex.captures(name))
        else {
            continue;
        };

        let values = groups
            .iter()
            .map(|group| captures.name(group).map(|m| m.as_str().to_string()))
            .collect();
        rows.push((relative_path(&path, root), values));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    debug!("{} files in {} match {}", rows.len(), root.display(), regex.as_str());

    let mut filepaths = Vec::with_capacity(rows.len());
    let mut columns: Vec<Vec<Option<String>>> =
        vec![Vec::with_capacity(rows.len()); groups.len()];
    for (filepath, values) in rows {
        filepaths.push(Some(filepath));
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let mut frame = DataFrame::new(
        std::iter::once(Column::new("filepath".into(), filepaths))
            .chain(
                groups
                    .iter()
                    .zip(columns)
                    .map(|(group, values)| Column::new((*group).into(), values)),
            )
            .collect(),
    )
    .map_err(GazekitError::from)?;
    for (group, dtype) in schema_overrides {
        frame.cast_column(group, &DataType::from(*dtype))?;
    }
    Ok(frame)
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case("trial_{text_id:d}_{page_id:d}.csv", "trial_1_2.csv", true)]
    #[case("trial_{text_id:d}_{page_id:d}.csv", "trial_a_2.csv", false)]
    #[case("trial_{text_id:d}_{page_id:d}.csv", "trial_1_2.csv.gz", false)]
    #[case("S_{round_id:1d}{subject_id:d}.csv", "S_1001.csv", true)]
    #[case("{name}.tsv", "anything goes.tsv", true)]
    #[case("{{literal}}_{id:d}.csv", "{literal}_4.csv", true)]
    #[case("a+b_{id}.csv", "aab_x.csv", false)]
    fn test_curly_to_regex(#[case] format: &str, #[case] name: &str, #[case] matches: bool) {
        assert_eq!(curly_to_regex(format).unwrap().is_match(name), matches);
    }

    #[test]
    fn test_width_splits_adjacent_digits() {
        let regex = curly_to_regex("S_{round_id:1d}{subject_id:d}_S{session_id:d}_{task}.csv")
            .unwrap();
        let captures = regex.captures("S_1001_S1_TEX.csv").unwrap();
        assert_eq!(&captures["round_id"], "1");
        assert_eq!(&captures["subject_id"], "001");
        assert_eq!(&captures["task"], "TEX");
    }

    #[test]
    fn test_raw_regex_is_accepted() {
        let regex = filename_regex(
            r"S_(?P<round_id>\d)(?P<subject_id>\d+)_S(?P<session_id>\d+)_(?P<task_name>.+).csv",
        )
        .unwrap();
        let captures = regex.captures("S_1002_S2_RAN.csv").unwrap();
        assert_eq!(&captures["subject_id"], "002");
        assert_eq!(&captures["task_name"], "RAN");
        assert!(!regex.is_match("xS_1002_S2_RAN.csv"));
    }

    #[test]
    fn test_scan_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Round_1").join("Subject_1002");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("S_1002_S1_TEX.csv"), "").unwrap();
        fs::write(dir.path().join("S_1001_S2_RAN.csv"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();

        let regex = curly_to_regex("S_{round_id:1d}{subject_id:d}_S{session_id:d}_{task}.csv")
            .unwrap();
        let overrides = BTreeMap::from([
            ("subject_id".to_string(), DType::Int),
            ("session_id".to_string(), DType::Int),
        ]);
        let fileinfo = scan_files(dir.path(), &regex, &overrides).unwrap();

        assert_eq!(
            fileinfo.get_column_names_str(),
            vec!["filepath", "round_id", "subject_id", "session_id", "task"]
        );
        assert_eq!(fileinfo.height(), 2);
        assert_eq!(
            fileinfo.require("filepath").unwrap().str().unwrap().get(0),
            Some("Round_1/Subject_1002/S_1002_S1_TEX.csv")
        );
        assert_eq!(
            fileinfo.require("subject_id").unwrap().dtype(),
            &DataType::Int64
        );
        assert_eq!(
            fileinfo.f64_values("subject_id").unwrap(),
            vec![Some(2.0), Some(1.0)]
        );
        assert_eq!(
            fileinfo.require("round_id").unwrap().str().unwrap().get(0),
            Some("1")
        );
    }

    #[test]
    fn test_scan_without_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let regex = curly_to_regex("{id:d}.csv").unwrap();
        let fileinfo = scan_files(dir.path(), &regex, &BTreeMap::new()).unwrap();
        assert_eq!(fileinfo.height(), 0);
        assert_eq!(fileinfo.get_column_names_str(), vec!["filepath", "id"]);
        assert_eq!(
            fileinfo.require("id").unwrap().dtype(),
            &DataType::String
        );
    }
}

//! # Event Calendar
//!
//! Reads dated `(key, value)` entries from a directory of TOML files for the
//! Events composer.
//!
//! Every table whose name is a `year-month-day` pattern selects the dates it
//! applies to. Each component is a number or a wildcard (`*` or `0`), so
//! `"*-12-25"` matches Christmas in any year and `"2025-*-1"` the first of
//! every month in 2025. Tables with any other name are ignored.
//!
//! ```toml
//! ["*-12-25"]
//! Holiday = "Christmas"
//!
//! ["2025-3-14"]
//! Birthday = ["Alice", "Bob"]
//! ```
//!
//! Files are read in case-insensitive name order and keys keep their order
//! within a table, so entries sharing a key in one table come out adjacent.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use toml::Value;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("'{0}' is not a year-month-day pattern")]
pub struct DatePatternError(String);

/// Date with optional components; `None` matches anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatePattern {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DatePattern {
    pub fn matches(&self, date: NaiveDate) -> bool {
        self.year.map_or(true, |year| year == date.year())
            && self.month.map_or(true, |month| month == date.month())
            && self.day.map_or(true, |day| day == date.day())
    }
}

fn component<T: FromStr + Default + PartialEq>(part: &str) -> Option<Option<T>> {
    if part == "*" {
        return Some(None);
    }
    let value = part.parse::<T>().ok()?;
    Some((value != T::default()).then_some(value))
}

impl FromStr for DatePattern {
    type Err = DatePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DatePatternError(s.to_string());
        let parts: Vec<&str> = s.split('-').map(str::trim).filter(|p| !p.is_empty()).collect();
        let [year, month, day] = parts.as_slice() else {
            return Err(invalid());
        };
        Ok(Self {
            year: component(year).ok_or_else(invalid)?,
            month: component(month).ok_or_else(invalid)?,
            day: component(day).ok_or_else(invalid)?,
        })
    }
}

/// Directory of event files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSource {
    directory: PathBuf,
}

impl EventSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Entries for `date`, in file order then table order then key order.
    ///
    /// Files are only opened as the iterator reaches them. A missing
    /// directory yields nothing; unreadable files are skipped with a warning.
    pub fn entries(&self, date: NaiveDate) -> impl Iterator<Item = (String, String)> {
        self.files()
            .into_iter()
            .flat_map(move |path| file_entries(&path, date))
    }

    fn files(&self) -> Vec<PathBuf> {
        let listing = match fs::read_dir(&self.directory) {
            Ok(listing) => listing,
            Err(e) => {
                debug!(directory = %self.directory.display(), "no event directory: {e}");
                return Vec::new();
            }
        };
        let mut files: Vec<PathBuf> = listing
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
            })
            .collect();
        files.sort_by_key(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        });
        files
    }
}

fn file_entries(path: &Path, date: NaiveDate) -> Vec<(String, String)> {
    let table = match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| contents.parse::<toml::Table>().map_err(|e| e.to_string()))
    {
        Ok(table) => table,
        Err(e) => {
            warn!(file = %path.display(), "skipping event file: {e}");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (name, section) in table {
        let Ok(pattern) = name.parse::<DatePattern>() else {
            continue;
        };
        if !pattern.matches(date) {
            continue;
        }
        let Value::Table(section) = section else {
            continue;
        };
        for (key, value) in section {
            match value {
                Value::Array(values) => {
                    entries.extend(values.into_iter().filter_map(text).map(|v| (key.clone(), v)));
                }
                value => {
                    if let Some(value) = text(value) {
                        entries.push((key, value));
                    }
                }
            }
        }
    }
    entries
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Array(_) | Value::Table(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_patterns() {
        assert_eq!(
            "2025-3-14".parse::<DatePattern>(),
            Ok(DatePattern {
                year: Some(2025),
                month: Some(3),
                day: Some(14)
            })
        );
        assert_eq!(
            "*-12-25".parse::<DatePattern>(),
            Ok(DatePattern {
                year: None,
                month: Some(12),
                day: Some(25)
            })
        );
        assert_eq!(
            "0-0-1".parse::<DatePattern>(),
            Ok(DatePattern {
                year: None,
                month: None,
                day: Some(1)
            })
        );
        assert!("birthdays".parse::<DatePattern>().is_err());
        assert!("2025-03".parse::<DatePattern>().is_err());
        assert!("2025-x-01".parse::<DatePattern>().is_err());
        assert!("2025-1-2-3".parse::<DatePattern>().is_err());
    }

    #[test]
    fn test_pattern_matching() {
        let christmas: DatePattern = "*-12-25".parse().unwrap();
        assert!(christmas.matches(date(2024, 12, 25)));
        assert!(christmas.matches(date(2031, 12, 25)));
        assert!(!christmas.matches(date(2024, 12, 24)));

        let first: DatePattern = "2025-0-1".parse().unwrap();
        assert!(first.matches(date(2025, 7, 1)));
        assert!(!first.matches(date(2026, 7, 1)));
    }

    #[test]
    fn test_entries_for_date() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.toml"),
            r#"
["2025-3-14"]
Birthday = ["Alice", "Bob"]
Count = 3

["2025-3-15"]
Birthday = "Carol"
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("A.toml"),
            r#"
["*-3-*"]
Month = "March"

[notes]
Birthday = "ignored"
"#,
        )
        .unwrap();
        fs::write(dir.path().join("readme.txt"), "not events").unwrap();

        let source = EventSource::new(dir.path());
        let entries: Vec<_> = source.entries(date(2025, 3, 14)).collect();
        assert_eq!(
            entries,
            vec![
                ("Month".to_string(), "March".to_string()),
                ("Birthday".to_string(), "Alice".to_string()),
                ("Birthday".to_string(), "Bob".to_string()),
                ("Count".to_string(), "3".to_string()),
            ]
        );

        let entries: Vec<_> = source.entries(date(2025, 3, 15)).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], ("Birthday".to_string(), "Carol".to_string()));

        assert_eq!(source.entries(date(2025, 4, 1)).count(), 0);
    }

    #[test]
    fn test_bad_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.toml"), "[2025-1-1\nbroken").unwrap();
        fs::write(dir.path().join("b.toml"), "[\"*-*-*\"]\nDaily = \"yes\"\n").unwrap();

        let entries: Vec<_> = EventSource::new(dir.path()).entries(date(2025, 1, 1)).collect();
        assert_eq!(entries, vec![("Daily".to_string(), "yes".to_string())]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let source = EventSource::new("/nonexistent/events");
        assert_eq!(source.entries(date(2025, 1, 1)).count(), 0);
    }
}

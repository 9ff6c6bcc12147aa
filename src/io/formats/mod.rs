//! Format adapters for import/export.
//!
//! Posts travel as CSV only; this module holds the codec plus the file naming
//! and content-type conventions around it.

pub mod csv;

use chrono::NaiveDate;
use std::path::Path;

/// File extension accepted for uploads and used for exports.
pub const CSV_EXTENSION: &str = "csv";

/// Content type of an export download.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Returns whether a file name ends in `.csv`, ignoring case.
#[must_use]
pub fn has_csv_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(CSV_EXTENSION))
}

/// Returns the download file name for an export made on `date`.
#[must_use]
pub fn export_filename(date: NaiveDate) -> String {
    format!("posts-export-{}.{CSV_EXTENSION}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("posts.csv", true ; "plain")]
    #[test_case("POSTS.CSV", true ; "upper case")]
    #[test_case("archive.2024.csv", true ; "dotted stem")]
    #[test_case("posts.csv.txt", false ; "double extension")]
    #[test_case("posts.xlsx", false ; "spreadsheet")]
    #[test_case("csv", false ; "no extension")]
    #[test_case("", false ; "empty")]
    fn test_has_csv_extension(name: &str, expected: bool) {
        assert_eq!(has_csv_extension(name), expected);
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_filename(date), "posts-export-2024-03-07.csv");
    }
}

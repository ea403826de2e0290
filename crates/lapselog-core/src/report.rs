use std::fmt;
use std::path::PathBuf;

use lapselog_parser::RowError;
use serde::Serialize;

/// A row that could not be decoded, with enough context to go looking at the
/// logger's SD card rather than at this pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub file: String,
    /// 1-based line number within `file`.
    pub line: u64,
    pub raw: String,
    pub error: RowError,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} (row '{}')",
            self.file, self.line, self.error, self.raw
        )
    }
}

/// A file whose contribution was cut short by an open or read error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub line: Option<u64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub rows_written: usize,
    pub rows_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub files: Vec<FileSummary>,
    pub failures: Vec<RowFailure>,
    pub file_failures: Vec<FileFailure>,
}

impl MergeReport {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.file_failures.is_empty()
    }
}

// crates/lapselog-core/src/error.rs

use std::path::PathBuf;

use lapselog_parser::ConfigError;
use thiserror::Error;

use crate::report::RowFailure;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid file pattern '{pattern}': {source}")]
    FilePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to list input directory {}: {source}", path.display())]
    InputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Merge aborted after {rows_written} rows: {failure}")]
    Row {
        failure: Box<RowFailure>,
        rows_written: usize,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

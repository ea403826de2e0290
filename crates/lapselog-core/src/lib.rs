pub mod config;
pub mod error;
pub mod merger;
pub mod repair;
pub mod report;

pub use config::{ChannelSettings, FailureMode, FileFilter, FileOrder, MergeConfig};
pub use error::{PipelineError, Result};
pub use merger::{merge, LogMerger};
pub use report::{FileFailure, FileSummary, MergeReport, RowFailure};

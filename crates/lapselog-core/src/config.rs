use std::fs;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use lapselog_parser::revisions::{self, DEFAULT_REVISION};
use lapselog_parser::{
    ChannelConfig, ConfigError, DividerConfig, RowCodec, TimestampStyle, DEFAULT_ADC_MAX_COUNT,
};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -4;

/// What happens when a row fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Abort the run on the first bad row or unreadable file.
    Strict,
    /// Skip and record the failure, then keep going.
    #[default]
    Lenient,
}

/// Order in which selected input files are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOrder {
    /// Sorted by file name, which is chronological for date-stamped logs.
    #[default]
    Name,
    /// Whatever order the filesystem returns.
    Listing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSettings {
    pub name: String,
    pub index: usize,
    pub reference_voltage: f64,
    pub source_resistance_ohms: f64,
    pub ground_resistance_ohms: f64,
    #[serde(default = "default_adjustment")]
    pub adjustment: f64,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_adjustment() -> f64 {
    1.0
}

impl ChannelSettings {
    fn to_channel(&self) -> std::result::Result<ChannelConfig, ConfigError> {
        let divider = DividerConfig::with_adjustment(
            self.reference_voltage,
            self.source_resistance_ohms,
            self.ground_resistance_ohms,
            self.adjustment,
        )
        .map_err(|source| ConfigError::Channel {
            channel: self.name.clone(),
            source: Box::new(source),
        })?;

        let channel = ChannelConfig::new(&self.name, self.index, divider);
        Ok(match &self.label {
            Some(label) => channel.with_label(label),
            None => channel,
        })
    }
}

/// Settings for one merge run, usually read from a TOML file.
///
/// Either `channels` is given explicitly, or the channel set comes from the
/// named hardware `revision` (default `camera-v3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub revision: Option<String>,
    pub field_count: Option<usize>,
    pub channels: Vec<ChannelSettings>,
    pub adc_max_count: u32,
    pub failure_mode: FailureMode,
    pub utc_offset_hours: i32,
    pub timestamp_style: TimestampStyle,
    pub skip_header_rows: usize,
    pub file_order: FileOrder,
    pub file_pattern: Option<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            revision: None,
            field_count: None,
            channels: Vec::new(),
            adc_max_count: DEFAULT_ADC_MAX_COUNT.get(),
            failure_mode: FailureMode::default(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            timestamp_style: TimestampStyle::default(),
            skip_header_rows: 0,
            file_order: FileOrder::default(),
            file_pattern: None,
        }
    }
}

impl MergeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Builds the row codec for this run, rejecting any divider or layout
    /// problem before a single file is touched.
    pub fn codec(&self) -> std::result::Result<RowCodec, ConfigError> {
        let revision = match &self.revision {
            Some(name) => Some(revisions::lookup(name)?),
            None if self.channels.is_empty() => Some(revisions::lookup(DEFAULT_REVISION)?),
            None => None,
        };

        let channels = if self.channels.is_empty() {
            revision
                .map(|revision| revision.channel_configs())
                .unwrap_or_default()
        } else {
            self.channels
                .iter()
                .map(ChannelSettings::to_channel)
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let field_count = self
            .field_count
            .or(revision.map(|revision| revision.field_count))
            .unwrap_or(5);

        Ok(RowCodec::new(
            field_count,
            channels,
            self.adc_max_count,
            self.utc_offset_hours,
        )?
        .with_timestamp_style(self.timestamp_style))
    }

    pub fn file_filter(&self) -> Result<FileFilter> {
        match &self.file_pattern {
            Some(pattern) => FileFilter::pattern(pattern),
            None => Ok(FileFilter::CsvSuffix),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.codec()?;
        self.file_filter()?;
        Ok(())
    }
}

/// Selects which directory entries are treated as logger files.
#[derive(Debug, Clone)]
pub enum FileFilter {
    /// Case-insensitive `.csv` suffix.
    CsvSuffix,
    /// Case-insensitive glob over the file name.
    Pattern(Pattern),
}

impl FileFilter {
    pub fn pattern(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(FileFilter::Pattern)
            .map_err(|source| PipelineError::FilePattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            FileFilter::CsvSuffix => is_csv_file(file_name),
            FileFilter::Pattern(pattern) => pattern.matches_with(
                file_name,
                MatchOptions {
                    case_sensitive: false,
                    ..MatchOptions::new()
                },
            ),
        }
    }
}

pub fn is_csv_file(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".csv")
}

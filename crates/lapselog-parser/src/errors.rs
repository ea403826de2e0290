use serde::Serialize;
use thiserror::Error;

/// Failure to decode a single logger row. Carries no file context; the merger
/// attaches file name, line number and raw content.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    #[error("expected {expected} fields, found {found}")]
    Malformed { expected: usize, found: usize },

    #[error("invalid epoch timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    #[error("field {field} is not valid UTF-8: {message}")]
    Encoding { field: usize, message: String },

    #[error("voltage column {column} value '{value}' is not an integer: {message}")]
    VoltageParse {
        column: usize,
        value: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("divider ground resistance is zero")]
    ZeroGroundResistance,

    #[error("divider parameter {0} is not finite")]
    NonFiniteParameter(&'static str),

    #[error("channel '{channel}' is invalid: {source}")]
    Channel {
        channel: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("adc_max_count must be greater than zero")]
    ZeroAdcMaxCount,

    #[error("channel '{channel}' targets column {index} but rows have {field_count} fields")]
    ChannelOutOfRange {
        channel: String,
        index: usize,
        field_count: usize,
    },

    #[error("channel '{channel}' targets the timestamp column")]
    TimestampColumn { channel: String },

    #[error("more than one channel targets column {index}")]
    DuplicateChannel { index: usize },

    #[error("unsupported field count {0}; expected 3, 4 or 5")]
    UnsupportedFieldCount(usize),

    #[error("utc offset of {0} hours is out of range")]
    UtcOffset(i32),

    #[error("unknown hardware revision '{0}'")]
    UnknownRevision(String),
}

use std::collections::HashSet;
use std::num::NonZeroU32;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, RowError};
use crate::model::{NormalizedField, NormalizedRow, RawRow};
use crate::voltage::{to_voltage, DividerConfig};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIMESTAMP_FORMAT_WITH_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%:z";
const SECONDS_PER_HOUR: i32 = 3600;

/// How the `Date` column is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampStyle {
    /// Local wall time without a suffix, e.g. `1969-12-31T20:00:00`.
    #[default]
    Naive,
    /// Local wall time with the fixed offset, e.g. `1969-12-31T20:00:00-04:00`.
    WithOffset,
}

/// A voltage column of the logger row and the divider in front of its ADC pin.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    pub index: usize,
    /// Output header override; defaults to the column's standard name.
    pub label: Option<String>,
    pub divider: DividerConfig,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, index: usize, divider: DividerConfig) -> Self {
        Self {
            name: name.into(),
            index,
            label: None,
            divider,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Decodes raw logger rows for one hardware revision. Built once per run and
/// validated up front, so decoding only ever fails on bad data.
#[derive(Debug, Clone)]
pub struct RowCodec {
    field_count: usize,
    channels: Vec<ChannelConfig>,
    adc_max_count: NonZeroU32,
    offset: FixedOffset,
    style: TimestampStyle,
}

impl RowCodec {
    pub fn new(
        field_count: usize,
        mut channels: Vec<ChannelConfig>,
        adc_max_count: u32,
        utc_offset_hours: i32,
    ) -> Result<Self, ConfigError> {
        if !(3..=5).contains(&field_count) {
            return Err(ConfigError::UnsupportedFieldCount(field_count));
        }
        let adc_max_count = NonZeroU32::new(adc_max_count).ok_or(ConfigError::ZeroAdcMaxCount)?;
        let offset = utc_offset_hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::UtcOffset(utc_offset_hours))?;

        let mut seen = HashSet::new();
        for channel in &channels {
            if channel.index == 0 {
                return Err(ConfigError::TimestampColumn {
                    channel: channel.name.clone(),
                });
            }
            if channel.index >= field_count {
                return Err(ConfigError::ChannelOutOfRange {
                    channel: channel.name.clone(),
                    index: channel.index,
                    field_count,
                });
            }
            if !seen.insert(channel.index) {
                return Err(ConfigError::DuplicateChannel {
                    index: channel.index,
                });
            }
        }
        channels.sort_by_key(|channel| channel.index);

        Ok(Self {
            field_count,
            channels,
            adc_max_count,
            offset,
            style: TimestampStyle::default(),
        })
    }

    pub fn with_timestamp_style(mut self, style: TimestampStyle) -> Self {
        self.style = style;
        self
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    pub fn adc_max_count(&self) -> NonZeroU32 {
        self.adc_max_count
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Output header matching this codec's column layout.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = standard_columns(self.field_count)
            .iter()
            .map(|column| column.to_string())
            .collect();
        for channel in &self.channels {
            if let Some(label) = &channel.label {
                header[channel.index] = label.clone();
            }
        }
        header
    }

    /// Converts one raw row. Either every field converts or the row fails as
    /// a whole; the input row is never modified.
    pub fn decode(&self, raw: &RawRow) -> Result<NormalizedRow, RowError> {
        if raw.len() != self.field_count {
            return Err(RowError::Malformed {
                expected: self.field_count,
                found: raw.len(),
            });
        }

        let fields = raw.fields();
        let instant = local_instant(&fields[0], self.offset)?;

        let mut normalized: Vec<NormalizedField> = fields[1..]
            .iter()
            .map(|value| NormalizedField::Text(value.clone()))
            .collect();
        for channel in &self.channels {
            let count = parse_adc_count(channel.index, &fields[channel.index])?;
            let volts = to_voltage(count, &channel.divider, self.adc_max_count);
            normalized[channel.index - 1] = NormalizedField::Voltage(volts);
        }

        let date = match self.style {
            TimestampStyle::Naive => instant.format(TIMESTAMP_FORMAT),
            TimestampStyle::WithOffset => instant.format(TIMESTAMP_FORMAT_WITH_OFFSET),
        }
        .to_string();

        Ok(NormalizedRow {
            date,
            fields: normalized,
        })
    }
}

/// Standard column names for each supported row width.
pub fn standard_columns(field_count: usize) -> &'static [&'static str] {
    match field_count {
        3 => &["Date", "Temp C", "Supply V"],
        4 => &["Date", "Temp C", "Humidity %", "Supply V"],
        _ => &["Date", "Temp C", "Humidity %", "Supply V", "Solar Panel V"],
    }
}

/// Parses an epoch-seconds field and renders it as ISO-8601 local wall time
/// at the given fixed offset.
pub fn format_epoch_seconds(value: &str, offset: FixedOffset) -> Result<String, RowError> {
    local_instant(value, offset).map(|instant| instant.format(TIMESTAMP_FORMAT).to_string())
}

fn local_instant(value: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, RowError> {
    let trimmed = value.trim();
    let seconds = trimmed
        .parse::<i64>()
        .map_err(|err| RowError::Timestamp {
            value: trimmed.to_string(),
            message: err.to_string(),
        })?;
    let instant = DateTime::from_timestamp(seconds, 0).ok_or_else(|| RowError::Timestamp {
        value: trimmed.to_string(),
        message: "outside the representable date range".to_string(),
    })?;
    Ok(instant.with_timezone(&offset))
}

fn parse_adc_count(column: usize, value: &str) -> Result<i64, RowError> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .map_err(|err| RowError::VoltageParse {
            column,
            value: trimmed.to_string(),
            message: err.to_string(),
        })
}

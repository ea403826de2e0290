//! Divider constants and row widths for each generation of logging hardware.
//!
//! Files from different generations are never mixed in one run; the caller
//! names the revision explicitly rather than having it guessed from the data.

use crate::codec::{ChannelConfig, RowCodec};
use crate::errors::ConfigError;
use crate::voltage::DividerConfig;

pub const DEFAULT_REVISION: &str = "camera-v3";

#[derive(Debug, Clone, Copy)]
pub struct RevisionChannel {
    pub name: &'static str,
    pub index: usize,
    pub divider: DividerConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct HardwareRevision {
    pub name: &'static str,
    pub description: &'static str,
    pub field_count: usize,
    pub channels: &'static [RevisionChannel],
}

impl HardwareRevision {
    pub fn channel_configs(&self) -> Vec<ChannelConfig> {
        self.channels
            .iter()
            .map(|channel| ChannelConfig::new(channel.name, channel.index, channel.divider))
            .collect()
    }

    pub fn codec(&self, adc_max_count: u32, utc_offset_hours: i32) -> Result<RowCodec, ConfigError> {
        RowCodec::new(
            self.field_count,
            self.channel_configs(),
            adc_max_count,
            utc_offset_hours,
        )
    }
}

const SUPPLY_3V3: RevisionChannel = RevisionChannel {
    name: "supply",
    index: 3,
    divider: DividerConfig::from_parts(3.3, 1.000, 0.272, 1.0),
};

pub static REVISIONS: &[HardwareRevision] = &[
    HardwareRevision {
        name: "logger-v1",
        description: "temperature and supply only",
        field_count: 3,
        channels: &[RevisionChannel {
            index: 2,
            ..SUPPLY_3V3
        }],
    },
    HardwareRevision {
        name: "logger-v2",
        description: "adds humidity sensor",
        field_count: 4,
        channels: &[SUPPLY_3V3],
    },
    HardwareRevision {
        name: "camera-v3",
        description: "adds solar panel channel",
        field_count: 5,
        channels: &[
            SUPPLY_3V3,
            RevisionChannel {
                name: "solar",
                index: 4,
                divider: DividerConfig::from_parts(3.3, 0.997, 0.272, 1.0),
            },
        ],
    },
    HardwareRevision {
        name: "camera-v4",
        description: "5V reference, 838k/332k battery divider",
        field_count: 4,
        channels: &[RevisionChannel {
            name: "supply",
            index: 3,
            divider: DividerConfig::from_parts(4.984, 838.0, 332.0, 1.026),
        }],
    },
];

pub fn lookup(name: &str) -> Result<&'static HardwareRevision, ConfigError> {
    REVISIONS
        .iter()
        .find(|revision| revision.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| ConfigError::UnknownRevision(name.to_string()))
}

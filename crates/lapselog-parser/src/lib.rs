pub mod codec;
pub mod errors;
pub mod model;
pub mod revisions;
pub mod voltage;

pub use codec::{format_epoch_seconds, standard_columns, ChannelConfig, RowCodec, TimestampStyle};
pub use errors::{ConfigError, RowError};
pub use model::{NormalizedField, NormalizedRow, RawRow};
pub use revisions::{HardwareRevision, RevisionChannel, DEFAULT_REVISION, REVISIONS};
pub use voltage::{to_voltage, DividerConfig, DEFAULT_ADC_MAX_COUNT};

#[cfg(test)]
mod tests;

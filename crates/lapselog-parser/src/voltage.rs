use std::num::NonZeroU32;

use crate::errors::ConfigError;

/// Full-scale count of the logger's 10-bit ADC.
pub const DEFAULT_ADC_MAX_COUNT: NonZeroU32 = match NonZeroU32::new(1023) {
    Some(count) => count,
    None => unreachable!(),
};

/// Resistor divider in front of one ADC input. Each pair may be scaled
/// together arbitrarily (4.7/1.2 and 47.0/12.0 describe the same divider).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividerConfig {
    reference_voltage: f64,
    source_resistance_ohms: f64,
    ground_resistance_ohms: f64,
    adjustment: f64,
}

impl DividerConfig {
    pub fn new(
        reference_voltage: f64,
        source_resistance_ohms: f64,
        ground_resistance_ohms: f64,
    ) -> Result<Self, ConfigError> {
        Self::with_adjustment(
            reference_voltage,
            source_resistance_ohms,
            ground_resistance_ohms,
            1.0,
        )
    }

    /// `adjustment` scales the divider ratio to bring computed voltages in line
    /// with a multimeter reading of the real supply.
    pub fn with_adjustment(
        reference_voltage: f64,
        source_resistance_ohms: f64,
        ground_resistance_ohms: f64,
        adjustment: f64,
    ) -> Result<Self, ConfigError> {
        let params = [
            ("reference_voltage", reference_voltage),
            ("source_resistance_ohms", source_resistance_ohms),
            ("ground_resistance_ohms", ground_resistance_ohms),
            ("adjustment", adjustment),
        ];
        if let Some(&(name, _)) = params.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::NonFiniteParameter(name));
        }
        if ground_resistance_ohms == 0.0 {
            return Err(ConfigError::ZeroGroundResistance);
        }

        Ok(Self::from_parts(
            reference_voltage,
            source_resistance_ohms,
            ground_resistance_ohms,
            adjustment,
        ))
    }

    /// Unvalidated constructor for the built-in revision table.
    pub(crate) const fn from_parts(
        reference_voltage: f64,
        source_resistance_ohms: f64,
        ground_resistance_ohms: f64,
        adjustment: f64,
    ) -> Self {
        Self {
            reference_voltage,
            source_resistance_ohms,
            ground_resistance_ohms,
            adjustment,
        }
    }

    pub fn reference_voltage(&self) -> f64 {
        self.reference_voltage
    }

    pub fn source_resistance_ohms(&self) -> f64 {
        self.source_resistance_ohms
    }

    pub fn ground_resistance_ohms(&self) -> f64 {
        self.ground_resistance_ohms
    }

    pub fn adjustment(&self) -> f64 {
        self.adjustment
    }

    /// Highest voltage the divider can report before the ADC saturates.
    pub fn max_measurable(&self, adc_max_count: NonZeroU32) -> f64 {
        to_voltage(i64::from(adc_max_count.get()), self, adc_max_count)
    }
}

/// Converts a raw ADC count into the voltage on the high side of the divider.
///
/// Counts outside `0..=adc_max_count` are not clamped; the logger occasionally
/// records them and the resulting implausible voltage is left for downstream
/// checks to flag.
pub fn to_voltage(raw_adc_value: i64, config: &DividerConfig, adc_max_count: NonZeroU32) -> f64 {
    let resistance = config.source_resistance_ohms + config.ground_resistance_ohms;
    let voltage = (config.reference_voltage * raw_adc_value as f64 * resistance)
        / (f64::from(adc_max_count.get()) * config.ground_resistance_ohms);
    voltage * config.adjustment
}

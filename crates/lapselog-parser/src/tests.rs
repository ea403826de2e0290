use std::num::NonZeroU32;

use chrono::FixedOffset;
use csv::StringRecord;

use crate::codec::{format_epoch_seconds, ChannelConfig, RowCodec, TimestampStyle};
use crate::errors::{ConfigError, RowError};
use crate::model::{NormalizedField, RawRow};
use crate::revisions::{self, DEFAULT_REVISION};
use crate::voltage::{to_voltage, DividerConfig, DEFAULT_ADC_MAX_COUNT};

const TOLERANCE: f64 = 1e-12;

fn eastern() -> FixedOffset {
    FixedOffset::west_opt(4 * 3600).expect("offset")
}

fn camera_codec() -> RowCodec {
    revisions::lookup(DEFAULT_REVISION)
        .expect("default revision")
        .codec(1023, -4)
        .expect("codec")
}

fn row(fields: &[&str]) -> RawRow {
    fields.iter().copied().collect()
}

#[test]
fn zero_count_is_zero_volts() {
    let divider = DividerConfig::new(3.3, 1.0, 0.272).expect("divider");
    assert_eq!(to_voltage(0, &divider, DEFAULT_ADC_MAX_COUNT), 0.0);
}

#[test]
fn full_scale_count_matches_divider_ratio() {
    let (r1, r2) = (1.0, 0.272);
    let divider = DividerConfig::new(3.3, r1, r2).expect("divider");
    let volts = to_voltage(1023, &divider, DEFAULT_ADC_MAX_COUNT);
    assert!((volts - 3.3 * (r1 + r2) / r2).abs() < TOLERANCE);
    assert!((divider.max_measurable(DEFAULT_ADC_MAX_COUNT) - volts).abs() < TOLERANCE);
}

#[test]
fn out_of_range_counts_are_not_clamped() {
    let divider = DividerConfig::new(3.3, 1.0, 0.272).expect("divider");
    let max = to_voltage(1023, &divider, DEFAULT_ADC_MAX_COUNT);
    let over = to_voltage(2046, &divider, DEFAULT_ADC_MAX_COUNT);
    assert!((over - 2.0 * max).abs() < TOLERANCE);
    assert!(to_voltage(-5, &divider, DEFAULT_ADC_MAX_COUNT) < 0.0);
}

#[test]
fn custom_adc_scale_is_respected() {
    let divider = DividerConfig::new(5.0, 1.0, 1.0).expect("divider");
    let scale = NonZeroU32::new(4095).expect("non-zero");
    assert!((to_voltage(4095, &divider, scale) - 10.0).abs() < TOLERANCE);
}

#[test]
fn adjustment_scales_voltage() {
    let plain = DividerConfig::new(4.984, 838.0, 332.0).expect("divider");
    let adjusted = DividerConfig::with_adjustment(4.984, 838.0, 332.0, 1.026).expect("divider");
    let base = to_voltage(700, &plain, DEFAULT_ADC_MAX_COUNT);
    let scaled = to_voltage(700, &adjusted, DEFAULT_ADC_MAX_COUNT);
    assert!((scaled - base * 1.026).abs() < TOLERANCE);
}

#[test]
fn zero_ground_resistance_is_config_error() {
    let err = DividerConfig::new(3.3, 1.0, 0.0).unwrap_err();
    assert_eq!(err, ConfigError::ZeroGroundResistance);
}

#[test]
fn non_finite_divider_parameter_is_config_error() {
    let err = DividerConfig::new(f64::NAN, 1.0, 0.272).unwrap_err();
    assert_eq!(err, ConfigError::NonFiniteParameter("reference_voltage"));
}

#[test]
fn epoch_zero_renders_at_fixed_offset() {
    let rendered = format_epoch_seconds("0", eastern()).expect("timestamp");
    assert_eq!(rendered, "1969-12-31T20:00:00");
}

#[test]
fn epoch_ignores_daylight_saving() {
    // 2015-07-01T12:00:00Z is 08:00 at UTC-4 regardless of season.
    let summer = format_epoch_seconds("1435752000", eastern()).expect("timestamp");
    assert_eq!(summer, "2015-07-01T08:00:00");
    // 2015-01-01T12:00:00Z
    let winter = format_epoch_seconds("1420113600", eastern()).expect("timestamp");
    assert_eq!(winter, "2015-01-01T08:00:00");
}

#[test]
fn non_integer_epoch_is_timestamp_error() {
    let err = format_epoch_seconds("12.5", eastern()).unwrap_err();
    assert!(matches!(err, RowError::Timestamp { ref value, .. } if value == "12.5"));
}

#[test]
fn decode_converts_timestamp_and_voltages() {
    let codec = camera_codec();
    let decoded = codec
        .decode(&row(&["0", "21.5", "40.1", "1023", "0"]))
        .expect("decode");

    assert_eq!(decoded.date, "1969-12-31T20:00:00");
    assert_eq!(decoded.fields[0], NormalizedField::Text("21.5".into()));
    assert_eq!(decoded.fields[1], NormalizedField::Text("40.1".into()));
    let supply = decoded.voltage(3).expect("supply voltage");
    assert!((supply - 3.3 * 1.272 / 0.272).abs() < TOLERANCE);
    assert_eq!(decoded.voltage(4), Some(0.0));
    assert_eq!(decoded.voltage(1), None);
}

#[test]
fn decode_trims_numeric_fields() {
    let codec = camera_codec();
    let decoded = codec
        .decode(&row(&[" 0", "21.5", "40.1", " 512 ", "0 "]))
        .expect("decode");
    assert_eq!(decoded.date, "1969-12-31T20:00:00");
    assert!(decoded.voltage(3).is_some());
}

#[test]
fn decode_rejects_wrong_field_count() {
    let codec = camera_codec();
    for fields in [
        vec!["0", "21.5", "40.1", "512"],
        vec!["0", "21.5", "40.1", "512", "300", "extra"],
        vec![],
    ] {
        let err = codec.decode(&row(&fields)).unwrap_err();
        assert_eq!(
            err,
            RowError::Malformed {
                expected: 5,
                found: fields.len()
            }
        );
    }
}

#[test]
fn decode_fails_whole_row_on_bad_voltage() {
    let codec = camera_codec();
    let err = codec
        .decode(&row(&["0", "21.5", "40.1", "512", "n/a"]))
        .unwrap_err();
    assert!(matches!(err, RowError::VoltageParse { column: 4, .. }));
}

#[test]
fn decode_fails_on_bad_timestamp() {
    let codec = camera_codec();
    let err = codec
        .decode(&row(&["yesterday", "21.5", "40.1", "512", "300"]))
        .unwrap_err();
    assert!(matches!(err, RowError::Timestamp { .. }));
}

#[test]
fn decode_leaves_input_untouched() {
    let codec = camera_codec();
    let raw = row(&["0", "21.5", "40.1", "512", "300"]);
    let before = raw.clone();
    codec.decode(&raw).expect("decode");
    assert_eq!(raw, before);
}

#[test]
fn changing_one_channel_leaves_others_alone() {
    let raw = row(&["1431000000", "21.5", "40.1", "612", "812"]);
    let supply = DividerConfig::new(3.3, 1.0, 0.272).expect("divider");
    let solar_a = DividerConfig::new(3.3, 0.997, 0.272).expect("divider");
    let solar_b = DividerConfig::new(5.0, 10.0, 1.0).expect("divider");

    let codec_a = RowCodec::new(
        5,
        vec![
            ChannelConfig::new("supply", 3, supply),
            ChannelConfig::new("solar", 4, solar_a),
        ],
        1023,
        -4,
    )
    .expect("codec");
    let codec_b = RowCodec::new(
        5,
        vec![
            ChannelConfig::new("supply", 3, supply),
            ChannelConfig::new("solar", 4, solar_b),
        ],
        1023,
        -4,
    )
    .expect("codec");

    let a = codec_a.decode(&raw).expect("decode");
    let b = codec_b.decode(&raw).expect("decode");
    assert_eq!(a.voltage(3), b.voltage(3));
    assert_ne!(a.voltage(4), b.voltage(4));
}

#[test]
fn timestamp_with_offset_style() {
    let codec = camera_codec().with_timestamp_style(TimestampStyle::WithOffset);
    let decoded = codec
        .decode(&row(&["0", "21.5", "40.1", "0", "0"]))
        .expect("decode");
    assert_eq!(decoded.date, "1969-12-31T20:00:00-04:00");
}

#[test]
fn codec_rejects_invalid_layouts() {
    let divider = DividerConfig::new(3.3, 1.0, 0.272).expect("divider");

    let err = RowCodec::new(6, vec![], 1023, -4).unwrap_err();
    assert_eq!(err, ConfigError::UnsupportedFieldCount(6));

    let err = RowCodec::new(4, vec![ChannelConfig::new("supply", 4, divider)], 1023, -4)
        .unwrap_err();
    assert!(matches!(err, ConfigError::ChannelOutOfRange { index: 4, .. }));

    let err = RowCodec::new(4, vec![ChannelConfig::new("supply", 0, divider)], 1023, -4)
        .unwrap_err();
    assert!(matches!(err, ConfigError::TimestampColumn { .. }));

    let err = RowCodec::new(
        5,
        vec![
            ChannelConfig::new("supply", 3, divider),
            ChannelConfig::new("solar", 3, divider),
        ],
        1023,
        -4,
    )
    .unwrap_err();
    assert_eq!(err, ConfigError::DuplicateChannel { index: 3 });

    assert_eq!(
        RowCodec::new(4, vec![], 0, -4).unwrap_err(),
        ConfigError::ZeroAdcMaxCount
    );
    assert_eq!(
        RowCodec::new(4, vec![], 1023, 30).unwrap_err(),
        ConfigError::UtcOffset(30)
    );
}

#[test]
fn header_follows_field_count_and_labels() {
    assert_eq!(
        camera_codec().header(),
        ["Date", "Temp C", "Humidity %", "Supply V", "Solar Panel V"]
    );

    let v2 = revisions::lookup("logger-v2").expect("revision");
    assert_eq!(
        v2.codec(1023, -4).expect("codec").header(),
        ["Date", "Temp C", "Humidity %", "Supply V"]
    );

    let divider = DividerConfig::new(3.3, 1.0, 0.272).expect("divider");
    let labelled = RowCodec::new(
        4,
        vec![ChannelConfig::new("battery", 3, divider).with_label("Battery V")],
        1023,
        -4,
    )
    .expect("codec");
    assert_eq!(labelled.header()[3], "Battery V");
}

#[test]
fn every_revision_builds_a_codec() {
    for revision in revisions::REVISIONS {
        let codec = revision.codec(1023, -4).expect("revision codec");
        assert_eq!(codec.header().len(), revision.field_count);
    }
    assert!(matches!(
        revisions::lookup("nope"),
        Err(ConfigError::UnknownRevision(_))
    ));
    assert!(revisions::lookup("Camera-V3").is_ok());
}

#[test]
fn normalized_row_serializes_to_record() {
    let codec = camera_codec();
    let decoded = codec
        .decode(&RawRow::from(&StringRecord::from(vec![
            "0", "21.5", "40.1", "0", "0",
        ])))
        .expect("decode");
    let record = decoded.to_record();
    assert_eq!(
        record.iter().collect::<Vec<_>>(),
        ["1969-12-31T20:00:00", "21.5", "40.1", "0", "0"]
    );
}

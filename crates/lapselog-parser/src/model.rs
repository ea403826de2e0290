use std::fmt;

use csv::StringRecord;

/// One line of a logger file, split into fields but otherwise untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    fields: Vec<String>,
}

impl RawRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl From<&StringRecord> for RawRow {
    fn from(record: &StringRecord) -> Self {
        Self::new(record.iter().map(str::to_string).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for RawRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Comma-joined view used when reporting a rejected row.
impl fmt::Display for RawRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(","))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedField {
    /// Passed through verbatim (temperature, humidity).
    Text(String),
    Voltage(f64),
}

impl fmt::Display for NormalizedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedField::Text(value) => f.write_str(value),
            NormalizedField::Voltage(volts) => write!(f, "{volts}"),
        }
    }
}

/// A decoded row. Field 0 is the rendered local timestamp; the remaining
/// fields line up with the raw row's columns 1..n.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: String,
    pub fields: Vec<NormalizedField>,
}

impl NormalizedRow {
    pub fn len(&self) -> usize {
        self.fields.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Voltage at the given raw column index, if that column was converted.
    pub fn voltage(&self, index: usize) -> Option<f64> {
        match self.fields.get(index.checked_sub(1)?)? {
            NormalizedField::Voltage(volts) => Some(*volts),
            NormalizedField::Text(_) => None,
        }
    }

    pub fn to_record(&self) -> StringRecord {
        let mut record = StringRecord::with_capacity(64, self.len());
        record.push_field(&self.date);
        for field in &self.fields {
            record.push_field(&field.to_string());
        }
        record
    }
}

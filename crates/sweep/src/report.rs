//! Parsing of the benchmark's `Key: Value` report into a result row.

use std::{collections::HashMap, fmt};

use serde::{Serialize, Serializer};

use crate::{errors::ReportError, grid::BenchmarkPoint};

pub const CACHE_SIZE_KEY: &str = "Cache_Size";
pub const MEAN_KEY: &str = "Mean";
pub const MEDIAN_KEY: &str = "Median";
pub const P25_KEY: &str = "P25";
pub const P75_KEY: &str = "P75";

pub const REQUIRED_KEYS: [&str; 5] = [CACHE_SIZE_KEY, MEAN_KEY, MEDIAN_KEY, P25_KEY, P75_KEY];

/// Key/value pairs of one report. A key repeated later in the report
/// overrides the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFields {
    values: HashMap<String, String>,
}

impl ReportFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, key: &'static str) -> Result<&str, ReportError> {
        self.get(key).ok_or(ReportError::MissingKey(key))
    }
}

/// True when the benchmark printed nothing worth parsing.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Split a report into fields. Blank lines are ignored; every other line
/// must hold exactly one `:`.
pub fn parse_report(text: &str) -> Result<ReportFields, ReportError> {
    let mut values = HashMap::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split(':');
        let (key, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => (key.trim(), value.trim()),
            _ => {
                return Err(ReportError::MalformedLine {
                    line_number: index + 1,
                    line: line.to_string(),
                })
            }
        };
        values.insert(key.to_string(), value.to_string());
    }
    Ok(ReportFields { values })
}

/// A latency statistic together with the text the benchmark printed for it,
/// so tables reproduce the reported digits exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Reported {
    value: f64,
    text: String,
}

impl Reported {
    pub fn parse(key: &'static str, text: &str) -> Result<Self, ReportError> {
        let value = text
            .parse::<f64>()
            .map_err(|_| ReportError::InvalidFloat {
                key,
                value: text.to_string(),
            })?;
        Ok(Self {
            value,
            text: text.to_string(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Reported {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value)
    }
}

/// One successful grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub batch_size: usize,
    pub kv_length: usize,
    pub cache_size: i64,
    pub mean: Reported,
    pub median: Reported,
    pub p25: Reported,
    pub p75: Reported,
}

impl ResultRecord {
    /// Build a record from parsed fields. Extra keys are ignored.
    pub fn from_fields(point: &BenchmarkPoint, fields: &ReportFields) -> Result<Self, ReportError> {
        let cache_text = fields.require(CACHE_SIZE_KEY)?;
        let mean = fields.require(MEAN_KEY)?;
        let median = fields.require(MEDIAN_KEY)?;
        let p25 = fields.require(P25_KEY)?;
        let p75 = fields.require(P75_KEY)?;

        let cache_size = cache_text
            .parse::<i64>()
            .map_err(|_| ReportError::InvalidInteger {
                key: CACHE_SIZE_KEY,
                value: cache_text.to_string(),
            })?;

        Ok(Self {
            batch_size: point.batch_size,
            kv_length: point.kv_length,
            cache_size,
            mean: Reported::parse(MEAN_KEY, mean)?,
            median: Reported::parse(MEDIAN_KEY, median)?,
            p25: Reported::parse(P25_KEY, p25)?,
            p75: Reported::parse(P75_KEY, p75)?,
        })
    }

    /// Parse a raw report straight into a record.
    pub fn from_report(point: &BenchmarkPoint, text: &str) -> Result<Self, ReportError> {
        let fields = parse_report(text)?;
        Self::from_fields(point, &fields)
    }

    /// Cells in table column order.
    pub fn to_row(&self) -> [String; 7] {
        [
            self.batch_size.to_string(),
            self.kv_length.to_string(),
            self.cache_size.to_string(),
            self.mean.to_string(),
            self.median.to_string(),
            self.p25.to_string(),
            self.p75.to_string(),
        ]
    }
}

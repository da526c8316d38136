// Metrics module - record model shared by the collectors and the sinks
//
// Collectors build one typed record per entity (see `records`). At the
// accumulator boundary every typed record is turned into the dynamic
// `(measurement, tags, fields, timestamp)` shape that sinks serialize.

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::CollectError;
use crate::storage::StorageError;

pub mod records;

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i16> for FieldValue {
    fn from(value: i16) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// A metric record in its dynamic, sink-facing shape
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub measurement: &'static str,
    pub tags: BTreeMap<&'static str, String>,
    pub fields: BTreeMap<&'static str, FieldValue>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
impl MetricRecord {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// A typed record with a fixed schema for one measurement
pub trait Measurement {
    /// Measurement name the record is emitted under
    const NAME: &'static str;

    fn tags(&self) -> Vec<(&'static str, String)>;

    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    fn into_record(self, timestamp: DateTime<Utc>) -> MetricRecord
    where
        Self: Sized,
    {
        MetricRecord {
            measurement: Self::NAME,
            tags: self.tags().into_iter().collect(),
            fields: self.fields().into_iter().collect(),
            timestamp,
        }
    }
}

/// Receives the output of a collection cycle
///
/// Records are metrics; errors are non-fatal problems reported out-of-band.
pub trait Accumulator: Send {
    fn add_record(&mut self, record: MetricRecord);

    fn add_error(&mut self, error: CollectError);
}

/// Buffers one cycle's records and errors until they are published
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<MetricRecord>,
    errors: Vec<CollectError>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn errors(&self) -> &[CollectError] {
        &self.errors
    }

    /// Records of one measurement, in emission order
    #[cfg(test)]
    pub fn measurement<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricRecord> + 'a {
        self.records.iter().filter(move |r| r.measurement == name)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.errors.is_empty()
    }
}

impl Accumulator for Batch {
    fn add_record(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    fn add_error(&mut self, error: CollectError) {
        self.errors.push(error);
    }
}

/// Destination for collected batches (stdout line protocol, MongoDB)
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Human-readable name of the sink, for logging
    fn name(&self) -> &str;

    async fn publish(&self, batch: &Batch) -> Result<(), StorageError>;
}

/// Timestamp rounding precision for a polling interval
pub fn interval_precision(interval: Duration) -> Duration {
    if interval >= Duration::from_secs(1) {
        Duration::from_secs(1)
    } else if interval >= Duration::from_millis(1) {
        Duration::from_millis(1)
    } else if interval >= Duration::from_micros(1) {
        Duration::from_micros(1)
    } else {
        Duration::from_nanos(1)
    }
}

/// Truncates a timestamp to the given precision
pub fn truncate_to(timestamp: DateTime<Utc>, precision: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(precision)
        .ok()
        .and_then(|step| timestamp.duration_trunc(step).ok())
        .unwrap_or(timestamp)
}

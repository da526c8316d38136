// Influx line protocol output
//
// Writes one line per record to stdout so the binary can run as a Telegraf
// `execd` input. Logs go to stderr and never mix with the data stream.

use async_trait::async_trait;
use std::fmt::Write as _;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::metrics::{Batch, FieldValue, MetricRecord, MetricSink};
use crate::storage::StorageError;

/// Line protocol sink over any async writer
pub struct LineProtocolSink<W> {
    writer: Mutex<W>,
}

impl LineProtocolSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        LineProtocolSink::new(tokio::io::stdout())
    }
}

impl<W> LineProtocolSink<W> {
    pub fn new(writer: W) -> Self {
        LineProtocolSink {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> MetricSink for LineProtocolSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "line protocol"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), StorageError> {
        let mut buf = String::new();
        for record in batch.records() {
            match encode_line(record) {
                Some(line) => {
                    buf.push_str(&line);
                    buf.push('\n');
                }
                None => debug!("Dropping {} record without fields", record.measurement),
            }
        }
        if buf.is_empty() {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(buf.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Encodes a record as one line, without the trailing newline
///
/// Tags with empty values are left out. Returns `None` for a record without
/// fields, which line protocol cannot express.
pub fn encode_line(record: &MetricRecord) -> Option<String> {
    if record.fields.is_empty() {
        return None;
    }

    let mut line = escape(record.measurement, &[',', ' ']);
    // BTreeMap iteration already yields sorted keys
    for (key, value) in &record.tags {
        if value.is_empty() {
            continue;
        }
        let _ = write!(
            line,
            ",{}={}",
            escape(key, &[',', '=', ' ']),
            escape(value, &[',', '=', ' '])
        );
    }

    let mut sep = ' ';
    for (key, value) in &record.fields {
        line.push(sep);
        sep = ',';
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        match value {
            FieldValue::Int(v) => {
                let _ = write!(line, "{}i", v);
            }
            FieldValue::Float(v) => {
                let _ = write!(line, "{}", v);
            }
            FieldValue::Bool(v) => {
                let _ = write!(line, "{}", v);
            }
            FieldValue::Str(v) => {
                let _ = write!(line, "\"{}\"", escape(v, &['"', '\\']));
            }
        }
    }

    let nanos = record
        .timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| record.timestamp.timestamp() * 1_000_000_000);
    let _ = write!(line, " {}", nanos);
    Some(line)
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

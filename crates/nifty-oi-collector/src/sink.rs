//! Append-only snapshot sinks.
//!
//! A sink never rewrites prior entries. Concurrent appends from multiple
//! producers are not ordered without external serialization; the collector
//! runs a single producer per sink.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use nifty_oi_chain::Snapshot;

/// Flat CSV column set. Additive-only: new columns append to the end so
/// historical logs stay readable across versions.
const CSV_HEADER: [&str; 10] = [
    "timestamp",
    "expiry",
    "spot",
    "strike",
    "call_ltp",
    "call_oi",
    "call_change_oi",
    "put_ltp",
    "put_oi",
    "put_change_oi",
];

#[derive(Debug, Error)]
pub enum SinkError {
    /// Unwritable medium or other I/O failure.
    #[error("sink I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// Record could not be encoded.
    #[error("sink encode failure: {0}")]
    Encode(String),
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => SinkError::IoFailure(io),
            other => SinkError::Encode(format!("{:?}", other)),
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::Encode(e.to_string())
    }
}

/// Append-only time-series sink for snapshots. Sink objects are held inside
/// futures that cross thread boundaries, hence `Send + Sync`.
pub trait SnapshotSink: Send + Sync {
    /// Append one snapshot. Must never rewrite prior entries.
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError>;

    /// Flush any buffered data.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// CSV sink: one wide row per strike per snapshot, header written once when
/// the file is created.
#[derive(Debug)]
pub struct CsvSink {
    writer: csv::Writer<File>,
    needs_header: bool,
}

impl CsvSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            writer,
            needs_header,
        })
    }
}

impl SnapshotSink for CsvSink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        if self.needs_header {
            self.writer.write_record(CSV_HEADER)?;
            self.needs_header = false;
        }
        let timestamp = snapshot.timestamp.to_rfc3339();
        for row in &snapshot.rows {
            self.writer.write_record([
                timestamp.clone(),
                snapshot.expiry.clone(),
                snapshot.spot.to_string(),
                row.strike.to_string(),
                row.call_ltp.to_string(),
                row.call_oi.to_string(),
                row.call_change_oi.to_string(),
                row.put_ltp.to_string(),
                row.put_oi.to_string(),
                row.put_change_oi.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

/// JSONL sink: one snapshot object per line.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl SnapshotSink for JsonlSink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        let line = serde_json::to_string(snapshot)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// Reader for a JSONL snapshot log, for trend analysis and tests.
pub struct SnapshotLogReader {
    lines: std::io::Lines<BufReader<File>>,
}

impl SnapshotLogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for SnapshotLogReader {
    type Item = Result<Snapshot, SinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next().map(|line| {
            let line = line?;
            Ok(serde_json::from_str(&line)?)
        })
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct VecSink {
    snapshots: Vec<Snapshot>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

impl SnapshotSink for VecSink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "vec"
    }
}

/// No-op sink.
pub struct NoopSink;

impl SnapshotSink for NoopSink {
    fn append(&mut self, _snapshot: &Snapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

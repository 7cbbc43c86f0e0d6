//! Result records and the sinks that accept them.
//!
//! A [`Record`] is one [`CountTable`] plus the scope it was counted over.
//! The collector hands records to a [`Sink`]; this module provides an
//! in-memory sink and two writers (JSON lines and InfluxDB line protocol).

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::table::CountTable;
use crate::types::RemoteKey;

/// Measurement name carried by every record.
pub const MEASUREMENT: &str = "netstat";

/// Tag naming the remote endpoint of a per-remote record.
pub const REMOTE_ADDR_TAG: &str = "remoteAddr";

/// What a record was counted over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// All admitted connections on the host.
    Global,
    /// Connections to one remote endpoint.
    Remote(RemoteKey),
}

impl Scope {
    /// Get the tag set for this scope.
    pub fn tags(&self) -> BTreeMap<&'static str, &str> {
        let mut tags = BTreeMap::new();
        if let Self::Remote(key) = self {
            tags.insert(REMOTE_ADDR_TAG, key.as_str());
        }
        tags
    }

    /// Get the remote key if this is a remote scope.
    pub fn remote(&self) -> Option<&RemoteKey> {
        match self {
            Self::Remote(key) => Some(key),
            Self::Global => None,
        }
    }
}

/// One result record: counts for every canonical label plus their scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Scope the counts cover.
    pub scope: Scope,
    /// The counts.
    pub counts: CountTable,
}

impl Record {
    /// Create a global record.
    pub fn global(counts: CountTable) -> Self {
        Self {
            scope: Scope::Global,
            counts,
        }
    }

    /// Create a record for one remote endpoint.
    pub fn remote(key: RemoteKey, counts: CountTable) -> Self {
        Self {
            scope: Scope::Remote(key),
            counts,
        }
    }

    /// Get the measurement name.
    pub fn name(&self) -> &'static str {
        MEASUREMENT
    }

    /// Get the tag set.
    pub fn tags(&self) -> BTreeMap<&'static str, &str> {
        self.scope.tags()
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            name: &'static str,
            tags: BTreeMap<&'static str, &'a str>,
            fields: &'a CountTable,
        }

        Wire {
            name: self.name(),
            tags: self.tags(),
            fields: &self.counts,
        }
        .serialize(serializer)
    }
}

/// Consumer of result records.
pub trait Sink {
    /// Accept one record.
    fn emit(&mut self, record: &Record) -> Result<()>;

    /// Flush buffered output, if any.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, record: &Record) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<Record>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the records received so far.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Take the records, leaving the sink empty.
    pub fn take(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    /// Get the global record, if one was emitted.
    pub fn global(&self) -> Option<&Record> {
        self.records.iter().find(|r| r.scope == Scope::Global)
    }

    /// Get the record for a remote key, if one was emitted.
    pub fn remote(&self, key: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.scope.remote().is_some_and(|k| k.as_str() == key))
    }
}

impl Sink for MemorySink {
    fn emit(&mut self, record: &Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Sink writing one JSON object per line.
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    /// Create a sink over a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for JsonSink<W> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(Error::sink)?;
        writeln!(self.writer).map_err(Error::sink)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::sink)
    }
}

/// Sink writing InfluxDB line protocol.
///
/// ```text
/// netstat,remoteAddr=10.0.0.1:443 tcp_established=2i,tcp_syn_sent=0i,...,udp_socket=0i
/// ```
#[derive(Debug)]
pub struct LineProtocolSink<W: Write> {
    writer: W,
}

impl<W: Write> LineProtocolSink<W> {
    /// Create a sink over a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for LineProtocolSink<W> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        writeln!(self.writer, "{}", format_line(record)).map_err(Error::sink)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::sink)
    }
}

/// Format a record as one line-protocol line (without trailing newline).
pub fn format_line(record: &Record) -> String {
    let mut line = String::from(record.name());
    for (key, value) in record.tags() {
        line.push(',');
        line.push_str(&escape_tag(key));
        line.push('=');
        line.push_str(&escape_tag(value));
    }

    let fields: Vec<String> = record
        .counts
        .metrics()
        .map(|(name, count)| format!("{}={}i", name, count))
        .collect();
    line.push(' ');
    line.push_str(&fields.join(","));
    line
}

fn escape_tag(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

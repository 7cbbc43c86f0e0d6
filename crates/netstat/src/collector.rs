//! Aggregation of one snapshot into count tables.
//!
//! A collection cycle is: take one snapshot, classify and count every
//! admitted connection in a single pass, then emit. Counting finishes before
//! the first record reaches the sink, so a failed snapshot never produces a
//! partial cycle.
//!
//! # Example
//!
//! ```
//! use netstat::{Collector, Config, Connection, Label, MemorySink, StaticSource};
//!
//! let source = StaticSource::new(vec![
//!     Connection::stream("10.0.0.1", 443, "ESTABLISHED"),
//!     Connection::datagram("10.0.0.2", 53),
//! ]);
//! let collector = Collector::new(source, Config::default());
//!
//! let mut sink = MemorySink::new();
//! collector.gather(&mut sink).unwrap();
//!
//! let total = sink.global().unwrap();
//! assert_eq!(total.counts[Label::Established], 1);
//! assert_eq!(total.counts[Label::UdpSocket], 1);
//! ```

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::Result;
use crate::filter::RemoteFilter;
use crate::label::Label;
use crate::sink::{Record, Sink};
use crate::source::SnapshotSource;
use crate::table::CountTable;
use crate::types::{Connection, RemoteKey};

/// Counts from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Host-wide totals, when enabled.
    pub total: Option<CountTable>,
    /// Per-remote totals, keyed and ordered by remote key. Empty when
    /// per-remote emission is disabled.
    pub per_remote: BTreeMap<RemoteKey, CountTable>,
}

impl Report {
    /// Count a snapshot.
    ///
    /// Connections rejected by the config's allow-list are skipped for both
    /// the total and the per-remote tables.
    pub fn from_connections<'a, I>(connections: I, config: &Config) -> Self
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        let filter = config.remote_filter();
        Self::count(connections, config, &filter)
    }

    fn count<'a, I>(connections: I, config: &Config, filter: &RemoteFilter) -> Self
    where
        I: IntoIterator<Item = &'a Connection>,
    {
        let mut total = config.emit_total.then(CountTable::new);
        let mut per_remote: BTreeMap<RemoteKey, CountTable> = BTreeMap::new();

        for conn in connections {
            if !filter.admits(conn) {
                continue;
            }
            let label = Label::classify(conn);

            if let Some(table) = total.as_mut() {
                table.increment(label);
            }
            if config.emit_per_remote {
                per_remote
                    .entry(conn.remote_key())
                    .or_default()
                    .increment(label);
            }
        }

        Self { total, per_remote }
    }

    /// Number of records this report emits.
    pub fn record_count(&self) -> usize {
        self.per_remote.len() + usize::from(self.total.is_some())
    }

    /// Sum of every per-remote table.
    pub fn per_remote_sum(&self) -> CountTable {
        let mut sum = CountTable::new();
        for table in self.per_remote.values() {
            sum += table;
        }
        sum
    }

    /// Convert into records in emission order: per-remote records by
    /// ascending key, then the global record.
    pub fn into_records(self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .per_remote
            .into_iter()
            .map(|(key, counts)| Record::remote(key, counts))
            .collect();
        if let Some(total) = self.total {
            records.push(Record::global(total));
        }
        records
    }

    /// Send every record to a sink, in emission order.
    ///
    /// Stops at the first sink error. Returns the number of records emitted.
    pub fn emit<K: Sink + ?Sized>(self, sink: &mut K) -> Result<usize> {
        let records = self.into_records();
        for record in &records {
            sink.emit(record)?;
        }
        sink.flush()?;
        Ok(records.len())
    }
}

/// Runs collection cycles against a snapshot source.
///
/// Holds no state between cycles; every call to [`gather`](Self::gather)
/// starts from fresh tables.
#[derive(Debug, Clone)]
pub struct Collector<S> {
    source: S,
    config: Config,
    filter: RemoteFilter,
}

impl<S: SnapshotSource> Collector<S> {
    /// Create a collector.
    pub fn new(source: S, config: Config) -> Self {
        let filter = config.remote_filter();
        Self {
            source,
            config,
            filter,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the snapshot source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Take one snapshot and count it, without emitting anything.
    pub fn report(&self) -> Result<Report> {
        let connections = self.source.connections()?;
        let report = Report::count(&connections, &self.config, &self.filter);
        tracing::debug!(
            connections = connections.len(),
            records = report.record_count(),
            "counted connection snapshot"
        );
        Ok(report)
    }

    /// Run one collection cycle into a sink.
    ///
    /// A snapshot failure is returned before anything is emitted. Returns
    /// the number of records emitted.
    pub fn gather<K: Sink + ?Sized>(&self, sink: &mut K) -> Result<usize> {
        self.report()?.emit(sink)
    }
}

//! TCP state and UDP socket counts for telemetry pipelines.
//!
//! This crate takes a snapshot of the host's network connections, classifies
//! each one (TCP state or UDP socket), optionally restricts counting to an
//! allow-list of remote endpoints, and emits count tables: one host-wide
//! total and/or one table per remote endpoint.
//!
//! Every emitted table reports all thirteen metrics, zero-defaulted:
//!
//! `tcp_established`, `tcp_syn_sent`, `tcp_syn_recv`, `tcp_fin_wait1`,
//! `tcp_fin_wait2`, `tcp_time_wait`, `tcp_close`, `tcp_close_wait`,
//! `tcp_last_ack`, `tcp_listen`, `tcp_closing`, `tcp_none`, `udp_socket`.
//!
//! # Features
//!
//! - `procfs` (default) - [`ProcNetSource`], reading `/proc/net`
//!
//! # Example
//!
//! ```ignore
//! use netstat::{Collector, Config, LineProtocolSink, ProcNetSource};
//!
//! let config = Config::load("/etc/netstat.toml")?;
//! let collector = Collector::new(ProcNetSource::new(), config);
//!
//! let mut sink = LineProtocolSink::new(std::io::stdout().lock());
//! collector.gather(&mut sink)?;
//! ```
//!
//! # Seams
//!
//! Both ends of a cycle are traits:
//!
//! - [`SnapshotSource`] - where connections come from
//! - [`Sink`] - where records go
//!
//! The collector holds no state between cycles, so concurrent cycles are
//! safe whenever the source is.

pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod label;
pub mod sink;
pub mod source;
pub mod table;
pub mod types;

pub use collector::{Collector, Report};
pub use config::{Config, DESCRIPTION, SAMPLE_CONFIG};
pub use error::{Error, Result};
pub use filter::RemoteFilter;
pub use label::Label;
pub use sink::{JsonSink, LineProtocolSink, MemorySink, Record, Scope, Sink};
#[cfg(feature = "procfs")]
pub use source::ProcNetSource;
pub use source::{SnapshotSource, StaticSource, from_fn};
pub use table::CountTable;
pub use types::{Connection, RemoteKey, TcpState, Transport};

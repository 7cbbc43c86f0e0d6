//! Snapshot source backed by the kernel's procfs socket tables.
//!
//! Each table line looks like:
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345
//! ```
//!
//! Addresses are 32-bit words printed in host byte order (one word for IPv4,
//! four for IPv6), ports are plain hex numbers and `st` is the kernel TCP
//! state code.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use winnow::ascii::{digit1, space0, space1};
use winnow::combinator::{preceded, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use super::SnapshotSource;
use crate::error::{Error, Result};
use crate::types::{Connection, TcpState, Transport};

/// One of the procfs socket tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcTable {
    /// `tcp`: IPv4 TCP sockets.
    Tcp,
    /// `tcp6`: IPv6 TCP sockets.
    Tcp6,
    /// `udp`: IPv4 UDP sockets.
    Udp,
    /// `udp6`: IPv6 UDP sockets.
    Udp6,
}

impl ProcTable {
    /// All tables, in read order.
    pub const ALL: [ProcTable; 4] = [Self::Tcp, Self::Tcp6, Self::Udp, Self::Udp6];

    /// File name under the procfs net directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp6 => "udp6",
        }
    }

    /// Check if entries in this table are datagram sockets.
    pub fn is_datagram(&self) -> bool {
        matches!(self, Self::Udp | Self::Udp6)
    }

    /// IPv6 tables are absent when IPv6 is disabled; IPv4 tables never are.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Tcp | Self::Udp)
    }

    /// Parse the contents of this table.
    ///
    /// The header line is skipped. Lines that do not parse are logged and
    /// skipped; the rest of the table is still returned.
    pub fn parse(&self, contents: &str) -> Vec<Connection> {
        let mut connections = Vec::new();
        for (lineno, line) in contents.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Some(conn) => connections.push(conn),
                None => tracing::warn!(
                    table = self.file_name(),
                    line = lineno + 1,
                    "skipping malformed socket table entry"
                ),
            }
        }
        connections
    }

    fn parse_line(&self, line: &str) -> Option<Connection> {
        let mut input = line;
        let raw = entry.parse_next(&mut input).ok()?;

        let address = decode_addr(raw.remote_addr)?;
        let port = u16::from_str_radix(raw.remote_port, 16).ok()?;

        let transport = if self.is_datagram() {
            Transport::Datagram
        } else {
            Transport::stream(state_label(raw.state))
        };

        Some(Connection {
            transport,
            remote_address: address,
            remote_port: i32::from(port),
        })
    }
}

/// Source reading `tcp`, `tcp6`, `udp` and `udp6` under a procfs net directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcNetSource {
    root: PathBuf,
}

impl ProcNetSource {
    /// Default procfs net directory.
    pub const DEFAULT_ROOT: &'static str = "/proc/net";

    /// Create a source reading the host's `/proc/net`.
    pub fn new() -> Self {
        Self::with_root(Self::DEFAULT_ROOT)
    }

    /// Create a source reading another directory (e.g. a host procfs
    /// mounted into a container, or test fixtures).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the directory this source reads.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_table(&self, table: ProcTable) -> Result<Vec<Connection>> {
        let path = self.root.join(table.file_name());
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !table.is_required() => {
                tracing::debug!(path = %path.display(), "socket table not present, skipping");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::from(e).with_context(format!("reading {}", path.display())));
            }
        };
        Ok(table.parse(&contents))
    }
}

impl Default for ProcNetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for ProcNetSource {
    fn connections(&self) -> Result<Vec<Connection>> {
        let mut connections = Vec::new();
        for table in ProcTable::ALL {
            connections.extend(self.read_table(table)?);
        }
        Ok(connections)
    }
}

/// Result type for the table parsers.
type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

struct RawEntry<'i> {
    remote_addr: &'i str,
    remote_port: &'i str,
    state: &'i str,
}

fn hex<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(1.., ('0'..='9', 'a'..='f', 'A'..='F')).parse_next(input)
}

fn endpoint<'i>(input: &mut &'i str) -> PResult<(&'i str, &'i str)> {
    separated_pair(hex, ':', hex).parse_next(input)
}

fn entry<'i>(input: &mut &'i str) -> PResult<RawEntry<'i>> {
    preceded(space0, digit1).parse_next(input)?;
    ':'.parse_next(input)?;
    preceded(space1, endpoint).parse_next(input)?;
    let (remote_addr, remote_port) = preceded(space1, endpoint).parse_next(input)?;
    let state = preceded(space1, hex).parse_next(input)?;

    Ok(RawEntry {
        remote_addr,
        remote_port,
        state,
    })
}

/// Decode a procfs hex address into its textual form.
fn decode_addr(hex: &str) -> Option<String> {
    match hex.len() {
        8 => {
            let word = u32::from_str_radix(hex, 16).ok()?;
            Some(Ipv4Addr::from(word.to_ne_bytes()).to_string())
        }
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let word = u32::from_str_radix(&hex[i * 8..(i + 1) * 8], 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            // IPv4 clients of dual-stack listeners show up in tcp6 as
            // ::ffff:a.b.c.d; key them like their tcp counterparts.
            let addr = Ipv6Addr::from(octets);
            match addr.to_ipv4_mapped() {
                Some(v4) => Some(v4.to_string()),
                None => Some(addr.to_string()),
            }
        }
        _ => None,
    }
}

/// Map a kernel state code to the label snapshot consumers expect.
fn state_label(code: &str) -> String {
    match u8::from_str_radix(code, 16).map(TcpState::from_u8) {
        Ok(TcpState::Unknown) | Err(_) => format!("0x{}", code.to_ascii_uppercase()),
        Ok(state) => state.name().to_string(),
    }
}

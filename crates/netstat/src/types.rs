//! Core types for connection snapshots.
//!
//! A [`Connection`] is what a snapshot source hands to the collector: a
//! transport (stream with a state label, or datagram) and a remote endpoint.
//! Connections are grouped and filtered by their [`RemoteKey`].

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport of a connection.
///
/// Only stream sockets carry a protocol state. Datagram sockets have no
/// state concept, so the variant has no field for one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// Stream socket (TCP) with its raw state label as reported by the source.
    Stream {
        /// State label, e.g. `ESTABLISHED` or `TIME_WAIT`.
        state: String,
    },
    /// Datagram socket (UDP).
    Datagram,
}

impl Transport {
    /// Create a stream transport with the given state label.
    pub fn stream(state: impl Into<String>) -> Self {
        Self::Stream {
            state: state.into(),
        }
    }
}

/// One connection from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Transport and (for streams) state.
    pub transport: Transport,
    /// Remote address, possibly empty.
    pub remote_address: String,
    /// Remote port. Signed so that malformed values pass through untouched.
    pub remote_port: i32,
}

impl Connection {
    /// Create a stream connection.
    pub fn stream(
        remote_address: impl Into<String>,
        remote_port: i32,
        state: impl Into<String>,
    ) -> Self {
        Self {
            transport: Transport::stream(state),
            remote_address: remote_address.into(),
            remote_port,
        }
    }

    /// Create a datagram connection.
    pub fn datagram(remote_address: impl Into<String>, remote_port: i32) -> Self {
        Self {
            transport: Transport::Datagram,
            remote_address: remote_address.into(),
            remote_port,
        }
    }

    /// Get the key used to group and filter this connection.
    pub fn remote_key(&self) -> RemoteKey {
        RemoteKey::new(&self.remote_address, self.remote_port)
    }
}

/// Remote endpoint identity: `address + ":" + port`.
///
/// The concatenation is literal. IPv6 addresses are not bracketed and an
/// empty address yields `":<port>"`, so keys match what allow-lists and
/// downstream consumers have always used.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteKey(String);

impl RemoteKey {
    /// Build a key from an address and a port.
    pub fn new(address: &str, port: i32) -> Self {
        Self(format!("{}:{}", address, port))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RemoteKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for RemoteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RemoteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// TCP socket states as numbered by the Linux kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TcpState {
    /// Unknown state.
    Unknown = 0,
    /// Connection established.
    Established = 1,
    /// SYN sent, waiting for matching SYN.
    SynSent = 2,
    /// SYN received, waiting for ACK.
    SynRecv = 3,
    /// FIN sent, waiting for FIN or FIN-ACK.
    FinWait1 = 4,
    /// FIN received, waiting for FIN.
    FinWait2 = 5,
    /// In TIME-WAIT state.
    TimeWait = 6,
    /// Socket is closed.
    Close = 7,
    /// FIN received, close pending.
    CloseWait = 8,
    /// Close wait acknowledged, waiting for FIN.
    LastAck = 9,
    /// Socket is listening.
    Listen = 10,
    /// Both sides sent FIN simultaneously.
    Closing = 11,
    /// New SYN received (kernel only).
    NewSynRecv = 12,
}

impl TcpState {
    /// Parse from a raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Established,
            2 => Self::SynSent,
            3 => Self::SynRecv,
            4 => Self::FinWait1,
            5 => Self::FinWait2,
            6 => Self::TimeWait,
            7 => Self::Close,
            8 => Self::CloseWait,
            9 => Self::LastAck,
            10 => Self::Listen,
            11 => Self::Closing,
            12 => Self::NewSynRecv,
            _ => Self::Unknown,
        }
    }

    /// Get the state name in the form snapshot sources report it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "NONE",
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
            Self::NewSynRecv => "NEW_SYN_RECV",
        }
    }
}

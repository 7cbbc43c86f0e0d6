//! Connection classification.
//!
//! Every connection maps to exactly one [`Label`]. Datagram sockets always
//! land in [`Label::UdpSocket`]. Stream sockets are classified by their state
//! label; anything that is not one of the eleven TCP states is counted in
//! [`Label::Unknown`] (`tcp_none`), so nothing is dropped and the emitted
//! metric set stays closed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Connection, TcpState, Transport};

/// Canonical metric label.
///
/// The discriminant is the label's position in every
/// [`CountTable`](crate::CountTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Label {
    /// `tcp_established`
    Established = 0,
    /// `tcp_syn_sent`
    SynSent = 1,
    /// `tcp_syn_recv`
    SynRecv = 2,
    /// `tcp_fin_wait1`
    FinWait1 = 3,
    /// `tcp_fin_wait2`
    FinWait2 = 4,
    /// `tcp_time_wait`
    TimeWait = 5,
    /// `tcp_close`
    Close = 6,
    /// `tcp_close_wait`
    CloseWait = 7,
    /// `tcp_last_ack`
    LastAck = 8,
    /// `tcp_listen`
    Listen = 9,
    /// `tcp_closing`
    Closing = 10,
    /// `tcp_none`: stream socket with no recognized state.
    Unknown = 11,
    /// `udp_socket`
    UdpSocket = 12,
}

impl Label {
    /// Number of canonical labels.
    pub const COUNT: usize = 13;

    /// All labels, in emission order.
    pub const ALL: [Label; Self::COUNT] = [
        Self::Established,
        Self::SynSent,
        Self::SynRecv,
        Self::FinWait1,
        Self::FinWait2,
        Self::TimeWait,
        Self::Close,
        Self::CloseWait,
        Self::LastAck,
        Self::Listen,
        Self::Closing,
        Self::Unknown,
        Self::UdpSocket,
    ];

    /// Get the metric name emitted for this label.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::Established => "tcp_established",
            Self::SynSent => "tcp_syn_sent",
            Self::SynRecv => "tcp_syn_recv",
            Self::FinWait1 => "tcp_fin_wait1",
            Self::FinWait2 => "tcp_fin_wait2",
            Self::TimeWait => "tcp_time_wait",
            Self::Close => "tcp_close",
            Self::CloseWait => "tcp_close_wait",
            Self::LastAck => "tcp_last_ack",
            Self::Listen => "tcp_listen",
            Self::Closing => "tcp_closing",
            Self::Unknown => "tcp_none",
            Self::UdpSocket => "udp_socket",
        }
    }

    /// Position of this label in a count table.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Classify a TCP state label.
    ///
    /// Matching ignores case, `-`, `_` and whitespace. Unrecognized labels
    /// return [`Label::Unknown`].
    pub fn from_state(state: &str) -> Self {
        let normalized = || {
            state
                .chars()
                .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
                .map(|c| c.to_ascii_uppercase())
        };

        if let Some(&(_, label)) = STATE_SPELLINGS
            .iter()
            .find(|(spelling, _)| normalized().eq(spelling.chars()))
        {
            return label;
        }

        if !normalized().eq("NONE".chars()) {
            tracing::trace!(state, "unrecognized TCP state, counting as tcp_none");
        }
        Self::Unknown
    }

    /// Classify a connection.
    pub fn classify(conn: &Connection) -> Self {
        match &conn.transport {
            Transport::Datagram => Self::UdpSocket,
            Transport::Stream { state } => Self::from_state(state),
        }
    }
}

/// State spellings with case, `-`, `_` and whitespace removed.
const STATE_SPELLINGS: &[(&str, Label)] = &[
    ("ESTABLISHED", Label::Established),
    ("ESTAB", Label::Established),
    ("SYNSENT", Label::SynSent),
    ("SYNRECV", Label::SynRecv),
    ("SYNRECEIVED", Label::SynRecv),
    ("NEWSYNRECV", Label::SynRecv),
    ("FINWAIT1", Label::FinWait1),
    ("FINWAIT2", Label::FinWait2),
    ("TIMEWAIT", Label::TimeWait),
    ("CLOSE", Label::Close),
    ("CLOSED", Label::Close),
    ("UNCONN", Label::Close),
    ("CLOSEWAIT", Label::CloseWait),
    ("LASTACK", Label::LastAck),
    ("LISTEN", Label::Listen),
    ("CLOSING", Label::Closing),
];

impl From<TcpState> for Label {
    fn from(state: TcpState) -> Self {
        match state {
            TcpState::Established => Self::Established,
            TcpState::SynSent => Self::SynSent,
            TcpState::SynRecv | TcpState::NewSynRecv => Self::SynRecv,
            TcpState::FinWait1 => Self::FinWait1,
            TcpState::FinWait2 => Self::FinWait2,
            TcpState::TimeWait => Self::TimeWait,
            TcpState::Close => Self::Close,
            TcpState::CloseWait => Self::CloseWait,
            TcpState::LastAck => Self::LastAck,
            TcpState::Listen => Self::Listen,
            TcpState::Closing => Self::Closing,
            TcpState::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

//! Protocol errors and disconnect classification

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Blank line
    Empty,
    /// Not a packet we understand
    Malformed(String),
    VersionMismatch { expected: u16, found: u16 },
    Encode(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty packet"),
            Self::Malformed(e) => write!(f, "malformed packet: {e}"),
            Self::VersionMismatch { expected, found } => {
                write!(f, "protocol version mismatch: expected {expected}, found {found}")
            }
            Self::Encode(e) => write!(f, "encode error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Why a battle connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Peer silent for too long, or a bounded wait ran out
    Timeout,
    /// Someone left on purpose
    Quit,
    /// Connection refused or the port could not be used
    Refused,
    /// Peer speaks a different protocol version
    VersionMismatch,
    Unknown,
}

impl DisconnectReason {
    /// Classify a socket error
    pub fn from_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout,
            ErrorKind::ConnectionRefused | ErrorKind::AddrInUse | ErrorKind::AddrNotAvailable => Self::Refused,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Quit => "quit",
            Self::Refused => "refused",
            Self::VersionMismatch => "version_mismatch",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for DisconnectReason {}

impl From<&ProtocolError> for DisconnectReason {
    fn from(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::VersionMismatch { .. } => Self::VersionMismatch,
            _ => Self::Unknown,
        }
    }
}

//! Host-side error type

use rtmouse_protocol::{AdapterError, DecodeError, ErrorKind};

/// Errors surfaced by the host controller and session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The adapter completed the command with a terminal code
    Command(AdapterError),
    /// No reply bytes arrived within the reply window
    ReplyTimeout,
    /// Some, but not all, reply bytes arrived
    ShortReply { expected: u8, got: u8 },
    /// Reply bytes did not decode as the expected frame
    BadReply(DecodeError),
    /// Reset was not acknowledged within the attempt budget
    ProtocolFailure,
    /// Read-config returned an unexpected byte
    ConfigMismatch(u8),
    /// Every command slot is in use
    QueueExhausted,
    /// The active variant has no such command
    Unsupported,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Command(e) => e.kind(),
            Error::ReplyTimeout => ErrorKind::TransportTimeout,
            Error::ShortReply { .. } | Error::BadReply(_) => ErrorKind::TransportFraming,
            Error::ProtocolFailure => ErrorKind::ProtocolFailure,
            Error::ConfigMismatch(_) | Error::Unsupported => ErrorKind::ProtocolMismatch,
            Error::QueueExhausted => ErrorKind::QueueExhaustion,
        }
    }

    /// Timeout-class failures the session retries
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransportTimeout
    }
}

impl From<AdapterError> for Error {
    fn from(e: AdapterError) -> Self {
        Error::Command(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::BadReply(e)
    }
}

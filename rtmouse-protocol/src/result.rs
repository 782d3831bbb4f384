//! Adapter completion codes.
//!
//! Every wire step handed to the adapter completes with a 16-bit code:
//!
//! ```text
//! 0x0000          accepted
//! 0x0042..=0x004c reject, selector busy (resend)
//! 0x007e          soft error, adapter recovering
//! 0x00e0..=0x00ea terminal transport errors
//! 0x0500          unset (no completion yet)
//! ```

/// Completion accepted
pub const RESULT_OK: u16 = 0x00;
/// Keyboard side of the adapter busy
pub const KBD_BUSY_REJ: u16 = 0x42;
/// Mouse selector busy
pub const MS_BUSY_REJ: u16 = 0x4c;
/// Adapter hit a machine check and is being reset
pub const SOFT_ERROR: u16 = 0x7e;
/// Marker for a result slot that has not completed
pub const RESULT_UNSET: u16 = 0x500;

const REJECT_LOW: u16 = KBD_BUSY_REJ;
const REJECT_HIGH: u16 = MS_BUSY_REJ;

/// Coarse error classes shared by every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// No reply within the expected window
    TransportTimeout,
    /// Unexpected byte count or sync mismatch
    TransportFraming,
    /// Reply bytes did not match the expected sequence
    AcknowledgmentMismatch,
    /// Selector busy; retried by the queue
    DeviceReject,
    /// Identification or configuration byte unexpected
    ProtocolMismatch,
    /// No free command slot
    QueueExhaustion,
    /// Negotiation gave up after its retry budget
    ProtocolFailure,
}

/// Terminal adapter failure, one variant per code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdapterError {
    /// 0xe0
    XmitTimeout,
    /// 0xe1
    RcvTimeout,
    /// 0xe2
    AckTimeout,
    /// 0xe3
    ExtraAck,
    /// 0xe4
    RcvError,
    /// 0xe5
    XmitError,
    /// 0xe8
    NoId,
    /// 0xe9
    MouseXmitTimeout,
    /// 0xea
    MouseAckTimeout,
    /// Anything else that is not success
    Unknown(u16),
}

impl AdapterError {
    pub fn from_code(code: u16) -> Self {
        match code {
            0xe0 => AdapterError::XmitTimeout,
            0xe1 => AdapterError::RcvTimeout,
            0xe2 => AdapterError::AckTimeout,
            0xe3 => AdapterError::ExtraAck,
            0xe4 => AdapterError::RcvError,
            0xe5 => AdapterError::XmitError,
            0xe8 => AdapterError::NoId,
            0xe9 => AdapterError::MouseXmitTimeout,
            0xea => AdapterError::MouseAckTimeout,
            other => AdapterError::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            AdapterError::XmitTimeout => 0xe0,
            AdapterError::RcvTimeout => 0xe1,
            AdapterError::AckTimeout => 0xe2,
            AdapterError::ExtraAck => 0xe3,
            AdapterError::RcvError => 0xe4,
            AdapterError::XmitError => 0xe5,
            AdapterError::NoId => 0xe8,
            AdapterError::MouseXmitTimeout => 0xe9,
            AdapterError::MouseAckTimeout => 0xea,
            AdapterError::Unknown(code) => code,
        }
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            AdapterError::XmitTimeout
            | AdapterError::RcvTimeout
            | AdapterError::AckTimeout
            | AdapterError::MouseXmitTimeout
            | AdapterError::MouseAckTimeout => ErrorKind::TransportTimeout,
            AdapterError::RcvError | AdapterError::XmitError => ErrorKind::TransportFraming,
            AdapterError::ExtraAck => ErrorKind::AcknowledgmentMismatch,
            AdapterError::NoId | AdapterError::Unknown(_) => ErrorKind::ProtocolMismatch,
        }
    }
}

/// What the queue should do with a completion code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    Done,
    /// Resend the same step
    Busy,
    /// Park until the adapter recovers
    SoftError,
    Failed(AdapterError),
}

impl Completion {
    pub fn classify(code: u16) -> Self {
        match code {
            RESULT_OK => Completion::Done,
            REJECT_LOW..=REJECT_HIGH => Completion::Busy,
            SOFT_ERROR => Completion::SoftError,
            other => Completion::Failed(AdapterError::from_code(other)),
        }
    }
}

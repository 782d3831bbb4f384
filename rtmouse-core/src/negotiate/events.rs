//! Inputs and outputs of the negotiation state machine

use rtmouse_protocol::{AdapterError, MouseKind, Op};

/// Outcomes fed back by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Start negotiating
    Begin,
    /// The last command completed successfully
    Accepted,
    /// The last command completed with a terminal code
    Rejected(AdapterError),
    /// Reset reply matched a known acknowledgment
    ResetAck(MouseKind),
    /// Reset reply arrived but is not an acknowledgment
    ResetReplyBad,
    /// Read-config reply byte
    ConfigByte(u8),
    /// The command was accepted but its reply never arrived in full
    ReplyMissing,
}

/// What the driver should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Run a command without a reply
    Issue(Op),
    /// Run a command and collect `reply_len` reply bytes
    Query { op: Op, reply_len: usize },
    /// Nothing to send; wait for the next event
    Wait,
    /// Negotiation succeeded
    Finished(MouseKind),
    Failed(Failure),
}

/// Why negotiation gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failure {
    /// No acceptable reset acknowledgment within the attempt budget
    Exhausted,
    /// Read-config answered an unexpected byte
    ConfigMismatch(u8),
    /// A command outside the reset retry path failed
    Command(AdapterError),
    /// Read-config never answered
    NoReply,
}

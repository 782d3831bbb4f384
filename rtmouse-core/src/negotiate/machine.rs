//! Negotiation state machine
//!
//! Pure transition logic: every step is a function of the current state and
//! an event, and yields the next action for the driver. Nothing here touches
//! the wire, so the whole handshake is testable without a host.

use rtmouse_protocol::{ErrorKind, MouseKind, Op, Variant};

use super::events::{Action, Event, Failure};

/// Reset attempts before giving up
pub const MAX_RESET_ATTEMPTS: u8 = 3;

/// Negotiation states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Idle,
    /// Switching the adapter to block delivery
    BlockModeEnabling,
    /// Reset issued, waiting for the adapter to accept it
    ResetSent,
    /// Reset accepted, waiting for the acknowledgment frame
    AwaitingResetAck,
    /// Read-config issued
    ConfigRequested,
    /// Read-config accepted, waiting for the configuration byte
    AwaitingConfig,
    /// Switching the adapter back to byte delivery
    BlockModeDisabling,
    /// Enable-transmission issued
    Enabling,
    Ready,
    Failed(Failure),
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Ready | State::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct Negotiator {
    variant: &'static Variant,
    state: State,
    attempts: u8,
    kind: MouseKind,
}

impl Negotiator {
    pub fn new(variant: &'static Variant) -> Self {
        Self {
            variant,
            state: State::Idle,
            attempts: 0,
            kind: MouseKind::Generic,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Reset attempts made so far
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    fn block_mode(&self) -> bool {
        self.variant.adapter.is_some()
    }

    /// Process an event and return the next action
    pub fn step(&mut self, event: Event) -> Action {
        use Event::*;
        use State::*;

        match (self.state, event) {
            (Idle, Begin) => {
                self.attempts = 0;
                if self.block_mode() {
                    self.state = BlockModeEnabling;
                    Action::Issue(Op::BlockMode(true))
                } else {
                    self.send_reset()
                }
            }

            (BlockModeEnabling, Accepted) => self.send_reset(),

            (ResetSent, Accepted) => {
                self.state = AwaitingResetAck;
                Action::Wait
            }
            (ResetSent, Rejected(e)) if retryable(e.kind()) => self.retry_reset(),

            (AwaitingResetAck, ResetAck(kind)) => {
                self.kind = kind;
                self.state = ConfigRequested;
                Action::Query {
                    op: Op::ReadConfig,
                    reply_len: 1,
                }
            }
            (AwaitingResetAck, ResetReplyBad | ReplyMissing) => self.retry_reset(),

            (ConfigRequested, Accepted) => {
                self.state = AwaitingConfig;
                Action::Wait
            }

            (AwaitingConfig, ConfigByte(byte)) if byte == self.variant.config_id(self.kind) => {
                if self.block_mode() {
                    self.state = BlockModeDisabling;
                    Action::Issue(Op::BlockMode(false))
                } else {
                    self.enable()
                }
            }
            (AwaitingConfig, ConfigByte(byte)) => self.fail(Failure::ConfigMismatch(byte)),
            (AwaitingConfig, ReplyMissing) => self.fail(Failure::NoReply),

            (BlockModeDisabling, Accepted) => self.enable(),

            (Enabling, Accepted) => {
                self.state = Ready;
                Action::Finished(self.kind)
            }

            (
                BlockModeEnabling | ResetSent | ConfigRequested | BlockModeDisabling | Enabling,
                Rejected(e),
            ) => self.fail(Failure::Command(e)),

            (Ready, _) => Action::Finished(self.kind),
            (Failed(failure), _) => Action::Failed(failure),

            // Anything else leaves the state alone
            _ => Action::Wait,
        }
    }

    fn send_reset(&mut self) -> Action {
        self.attempts += 1;
        self.state = State::ResetSent;
        Action::Query {
            op: Op::Reset,
            reply_len: self.variant.reset_ack_len(),
        }
    }

    fn retry_reset(&mut self) -> Action {
        if self.attempts >= MAX_RESET_ATTEMPTS {
            self.fail(Failure::Exhausted)
        } else {
            self.send_reset()
        }
    }

    fn enable(&mut self) -> Action {
        self.state = State::Enabling;
        Action::Issue(Op::Enable)
    }

    fn fail(&mut self, failure: Failure) -> Action {
        self.state = State::Failed(failure);
        Action::Failed(failure)
    }
}

/// Reset failures worth another attempt
fn retryable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TransportTimeout | ErrorKind::AcknowledgmentMismatch
    )
}

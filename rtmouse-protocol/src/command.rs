//! Commands as handed to the adapter.
//!
//! A command is one or two wire steps. Parameterized RT PC commands are split:
//! the opcode goes out as one exchange and the parameter as a second exchange
//! on the same selector. PS/2 commands carry the parameter inline.

use serde::{Deserialize, Serialize};

use crate::settings::{ReportMode, Resolution, SampleRate, Scaling};

/// One exchange with the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WireStep {
    /// Adapter destination (UART command, UART control, extended command...)
    pub selector: u8,
    pub byte: u8,
    /// Inline parameter for one-step parameterized commands
    pub param: Option<u8>,
}

impl WireStep {
    pub const fn new(selector: u8, byte: u8) -> Self {
        Self {
            selector,
            byte,
            param: None,
        }
    }

    pub const fn with_param(selector: u8, byte: u8, param: u8) -> Self {
        Self {
            selector,
            byte,
            param: Some(param),
        }
    }
}

/// A complete command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Single(WireStep),
    /// Opcode exchange followed by a parameter exchange
    Split { selector: u8, opcode: u8, param: u8 },
}

impl Command {
    /// Step sent before the final one, if any
    pub fn first_step(&self) -> Option<WireStep> {
        match *self {
            Command::Single(_) => None,
            Command::Split {
                selector, opcode, ..
            } => Some(WireStep::new(selector, opcode)),
        }
    }

    /// Step whose completion code is the command's result
    pub fn final_step(&self) -> WireStep {
        match *self {
            Command::Single(step) => step,
            Command::Split {
                selector, param, ..
            } => WireStep::new(selector, param),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Command::Split { .. })
    }
}

/// Line framing programmed into the adapter UART
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    #[default]
    Odd,
    Even,
}

/// Host-side operations, translated to commands by a [`crate::Variant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Op {
    Reset,
    ReadConfig,
    ReadStatus,
    ReadData,
    Enable,
    Disable,
    Wrap(bool),
    Scaling(Scaling),
    SampleRate(SampleRate),
    Resolution(Resolution),
    Mode(ReportMode),
    /// Adapter delivers UART bytes in 4-byte blocks
    BlockMode(bool),
    /// Enable the adapter UART with a clear
    LinkEnable,
    /// Baud divisor, see [`crate::variant::baud_divisor`]
    LinkBaud(u8),
    LinkFraming(Framing),
}

//! Configuration type definitions

use rtmouse_hal::uart::{Parity, UartConfig};
use rtmouse_protocol::{Framing, MouseKind, ReportMode, Resolution, SampleRate, Scaling, Variant};

use crate::buttons::DisambiguatorConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Device settings as last confirmed by the device
///
/// Only changed after the corresponding command completed successfully.
/// Replayed after a resynchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Configuration {
    pub sample_rate: SampleRate,
    pub resolution: Resolution,
    pub scaling: Scaling,
    pub mode: ReportMode,
    pub enabled: bool,
}

/// Host session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Window for a query reply after the command completed
    pub reply_timeout_ms: u32,
    /// Attempts for a timeout-class failure before resynchronizing
    pub retry_budget: u8,
    /// Mouse line baud rate programmed into the adapter
    pub baud: u32,
    pub framing: Framing,
    pub buttons: DisambiguatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 500,
            retry_budget: 3,
            baud: 9600,
            framing: Framing::Odd,
            buttons: DisambiguatorConfig::default(),
        }
    }
}

/// Emulated protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Protocol {
    #[default]
    RtPc,
    Ps2,
}

impl Protocol {
    pub fn variant(self) -> &'static Variant {
        match self {
            Protocol::RtPc => &Variant::RT_PC,
            Protocol::Ps2 => &Variant::PS2,
        }
    }
}

/// `[link]` section: the mouse line towards the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkSection {
    pub protocol: Protocol,
    pub baud: u32,
    pub parity: Framing,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            protocol: Protocol::RtPc,
            baud: 9600,
            parity: Framing::Odd,
        }
    }
}

impl LinkSection {
    pub fn uart(&self) -> UartConfig {
        UartConfig {
            baudrate: self.baud,
            parity: match self.parity {
                Framing::Odd => Parity::Odd,
                Framing::Even => Parity::Even,
            },
            ..UartConfig::default()
        }
    }
}

/// `[mouse]` section: how the emulated mouse presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseSection {
    pub kind: MouseKind,
    /// Flip Y from USB (down positive) to mouse (up positive)
    pub invert_y: bool,
    /// Power-on sample rate
    pub sample_rate: SampleRate,
    /// Power-on resolution
    pub resolution: Resolution,
    /// Fold left+right chords from two-button mice into middle
    pub chord_middle: bool,
    /// Chord settling delays, in emulator timer ticks
    pub buttons: DisambiguatorConfig,
}

impl Default for MouseSection {
    fn default() -> Self {
        Self {
            kind: MouseKind::Generic,
            invert_y: true,
            sample_rate: SampleRate::default(),
            resolution: Resolution::default(),
            chord_middle: false,
            buttons: DisambiguatorConfig::default(),
        }
    }
}

/// `[bridge]` section: the UART carrying pointer reports in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeSection {
    pub baud: u32,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self { baud: 115_200 }
    }
}

impl BridgeSection {
    pub fn uart(&self) -> UartConfig {
        UartConfig::plain(self.baud)
    }
}

/// Emulator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmulatorConfig {
    pub link: LinkSection,
    pub mouse: MouseSection,
    pub bridge: BridgeSection,
}

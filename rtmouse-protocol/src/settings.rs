//! Device settings shared by the host controller and the emulator.
//!
//! Rates and resolutions are kept as enums so that a command can never carry
//! a value the device does not understand. Host-facing constructors fall back
//! to the device default instead of failing.

use serde::{Deserialize, Serialize};

/// Report sample rate in reports per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    Hz10,
    Hz20,
    Hz40,
    Hz60,
    Hz80,
    #[default]
    Hz100,
    /// Only accepted by the PS/2 variant
    Hz200,
}

impl SampleRate {
    pub const ALL: [SampleRate; 7] = [
        SampleRate::Hz10,
        SampleRate::Hz20,
        SampleRate::Hz40,
        SampleRate::Hz60,
        SampleRate::Hz80,
        SampleRate::Hz100,
        SampleRate::Hz200,
    ];

    /// Reports per second, which is also the wire parameter byte
    pub const fn hz(self) -> u8 {
        match self {
            SampleRate::Hz10 => 10,
            SampleRate::Hz20 => 20,
            SampleRate::Hz40 => 40,
            SampleRate::Hz60 => 60,
            SampleRate::Hz80 => 80,
            SampleRate::Hz100 => 100,
            SampleRate::Hz200 => 200,
        }
    }

    /// Exact lookup of a wire/parameter value
    pub fn from_hz(hz: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.hz() == hz)
    }

    /// Lookup that falls back to the 100 reports/sec default
    pub fn from_hz_or_default(hz: u8) -> Self {
        Self::from_hz(hz).unwrap_or_default()
    }

    /// Interval between two reports in milliseconds
    pub const fn period_ms(self) -> u32 {
        1000 / self.hz() as u32
    }
}

/// Sensor resolution
///
/// Host-facing codes follow the RT PC numbering (0 = 200 cpi ... 3 = 25 cpi).
/// The PS/2 variant numbers them the other way round; see
/// [`crate::variant::Variant::resolutions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Cpi200,
    #[default]
    Cpi100,
    Cpi50,
    Cpi25,
}

impl Resolution {
    /// Host-facing resolution codes, indexed by code
    pub const BY_CODE: [Resolution; 4] = [
        Resolution::Cpi200,
        Resolution::Cpi100,
        Resolution::Cpi50,
        Resolution::Cpi25,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::BY_CODE.get(code as usize).copied()
    }

    /// Lookup that falls back to the 100 cpi default
    pub fn from_code_or_default(code: u8) -> Self {
        Self::from_code(code).unwrap_or_default()
    }

    pub fn from_cpi(cpi: u16) -> Option<Self> {
        Self::BY_CODE
            .into_iter()
            .find(|resolution| resolution.counts_per_inch() == cpi)
    }

    pub const fn counts_per_inch(self) -> u16 {
        match self {
            Resolution::Cpi200 => 200,
            Resolution::Cpi100 => 100,
            Resolution::Cpi50 => 50,
            Resolution::Cpi25 => 25,
        }
    }
}

/// Movement scaling applied by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scaling {
    #[default]
    Linear,
    /// 2:1 transfer curve on the PS/2 variant
    Exponential,
}

/// How the device delivers movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportMode {
    /// Unsolicited reports while enabled
    #[default]
    Stream,
    /// Reports only on a read-data request
    Remote,
}

/// Mouse model as identified by its reset acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseKind {
    #[default]
    Generic,
    Optical,
}

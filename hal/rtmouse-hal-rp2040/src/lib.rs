//! RP2040 implementations of the rtmouse HAL traits
//!
//! - Mouse line UART halves implementing `rtmouse_hal::UartTx` and
//!   `rtmouse_hal::UartRx`
//! - Conversion from the HAL line configuration to the embassy-rp one

#![no_std]

pub mod uart;

pub use uart::{line_config, LinkError, LinkRx, LinkTx};

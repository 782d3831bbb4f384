//! rtmouse Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the protocol engine is written
//! against, so the host controller and the emulator can run on any chip with
//! a UART and a timer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  rtmouse-core, rtmouse-emulator         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  rtmouse-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ rtmouse-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`timer::TickTimer`] - One-shot delayed re-evaluation

#![no_std]
#![deny(unsafe_code)]

pub mod timer;
pub mod uart;

pub use timer::TickTimer;
pub use uart::{UartConfig, UartRx, UartTx};

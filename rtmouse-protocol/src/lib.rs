//! RT PC Mouse Wire Protocol
//!
//! This crate holds the pure, stateless half of the mouse protocol: the two
//! report layouts, the opcode tables of the RT PC and PS/2 variants, the
//! adapter completion codes, report reassembly, and the UART bridge framing
//! used by the emulator to receive pointer reports.
//!
//! # Protocol Overview
//!
//! ```text
//!   host                      adapter                     mouse
//! ┌──────┐  selector, byte  ┌─────────┐   command byte   ┌───────┐
//! │      ├─────────────────►│         ├─────────────────►│       │
//! │      │◄─────────────────┤         │                  │       │
//! │      │  completion code │         │◄─────────────────┤       │
//! │      │◄─────────────────┤         │  report frames   │       │
//! └──────┘    rx bytes      └─────────┘                  └───────┘
//! ```
//!
//! Parameterized RT PC commands take two exchanges (opcode, then parameter).
//! Reports are fixed-length frames led by a synchronization byte.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod bridge;
pub mod command;
pub mod report;
pub mod result;
pub mod settings;
pub mod variant;

pub use assembler::ReportAssembler;
pub use bridge::{BridgeDecoder, BridgeError, BridgeMessage, PointerReport};
pub use command::{Command, Framing, Op, WireStep};
pub use report::{
    Buttons, DecodeError, Layout, Movement, ReportFrame, StatusReport, WireFrame, MAX_FRAME_LEN,
};
pub use result::{AdapterError, Completion, ErrorKind};
pub use settings::{MouseKind, ReportMode, Resolution, SampleRate, Scaling};
pub use variant::{baud_divisor, Opcode, Variant};

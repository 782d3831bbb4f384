//! Board-agnostic protocol engine for the RT PC mouse
//!
//! This crate contains all logic that does not depend on a particular
//! board:
//!
//! - Hardware seams (command port, pointer source)
//! - Transaction queue with completion-driven advance
//! - Host controller: command submission, reply capture, byte routing
//! - Reset/configuration negotiation state machine
//! - Session control surface with retry and resynchronization
//! - Three-button disambiguation
//! - Peripheral emulator
//! - Configuration types and parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod buttons;
pub mod config;
pub mod discipline;
pub mod emulator;
pub mod error;
pub mod host;
pub mod negotiate;
pub mod queue;
pub mod session;
pub mod traits;

pub use error::Error;
pub use host::{Host, Routed};
pub use session::Session;

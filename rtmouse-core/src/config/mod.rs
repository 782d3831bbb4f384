//! Configuration
//!
//! Session settings used by the host side and the `emulator.toml` model
//! used by the emulator firmware.

pub mod toml;
pub mod types;

pub use toml::{parse_config, ParseError};
pub use types::{
    BridgeSection, Configuration, EmulatorConfig, LinkSection, MouseSection, Protocol,
    SessionConfig,
};

//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::AtomicU32;

use rtmouse_protocol::PointerReport;

/// Channel capacity for command bytes from the host
const COMMAND_CHANNEL_SIZE: usize = 16;

/// Channel capacity for pointer reports from the bridge
const POINTER_CHANNEL_SIZE: usize = 8;

/// Command bytes received on the mouse line
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, u8, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Pointer reports received over the bridge
pub static POINTER_CHANNEL: Channel<CriticalSectionRawMutex, PointerReport, POINTER_CHANNEL_SIZE> =
    Channel::new();

/// Uptime in milliseconds of the last valid bridge frame (report or ping)
pub static BRIDGE_LAST_SEEN_MS: AtomicU32 = AtomicU32::new(0);

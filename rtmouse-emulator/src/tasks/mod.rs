//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod bridge_rx;
pub mod link_rx;
pub mod mouse;

pub use bridge_rx::bridge_rx_task;
pub use link_rx::link_rx_task;
pub use mouse::mouse_task;

//! Collaborator traits
//!
//! The engine talks to the adapter and to the pointer source only through
//! these traits.

pub mod pointer;
pub mod port;

pub use pointer::PointerSource;
pub use port::CommandPort;

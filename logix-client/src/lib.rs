//! Logix5000 controller client
//!
//! This crate drives the wire against a controller: the [`Link`] shared
//! session handle, fragmented read/write reassembly, symbol and template
//! discovery, and the [`Controller`] facade with its symbol/type caches
//! and symbolic path translation.

pub mod controller;
pub mod discovery;
pub mod fragmented;
pub mod link;
pub mod symbol;
pub mod tag_io;

#[cfg(test)]
pub(crate) mod script;

pub use controller::{Controller, ControllerBuilder, ControllerConfig};
pub use fragmented::MAX_PACKET_SIZE;
pub use link::Link;
pub use symbol::Symbol;
pub use tag_io::TagTransfer;

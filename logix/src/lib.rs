//! EtherNet/IP tag access for Allen-Bradley Logix5000 controllers
//!
//! This library maps symbolic tag names to strongly-typed values stored on
//! a remote controller, over CIP's fragmentable request/response services.
//!
//! # Architecture
//!
//! The workspace is organized as focused crates:
//!
//! - `logix-core`: controller type system, template layout engine, tag
//!   object model, error handling
//! - `logix-protocol`: CIP service codes, EPath codec, request/response
//!   body codecs, session traits
//! - `logix-client`: controller facade with symbol/type caches, discovery,
//!   fragmented transfer, liveness probing
//!
//! # Usage
//!
//! ```no_run
//! use logix::Controller;
//! ```
//!
//! Supply a [`client::Link`] transport via an implementation of
//! [`protocol::CipConnect`] (the encapsulation/session layer is outside
//! this library), then read and write tags by name through [`Controller`].

// Re-export core types
pub use logix_core::{LogixError, LogixResult};
pub use logix_core::{ArrayTag, ScalarTag, Slot, StructureTag, Tag, TagType, TagValue, Template};

// Re-export the client API
pub use logix_client::{Controller, ControllerBuilder, ControllerConfig, TagTransfer};

pub mod core {
    pub use logix_core::*;
}

pub mod protocol {
    pub use logix_protocol::*;
}

pub mod client {
    pub use logix_client::*;
}

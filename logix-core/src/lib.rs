//! Core types and utilities for Logix5000 tag access
//!
//! This crate provides the controller type system, the template (struct
//! definition) layout engine and the tag object model used throughout the
//! Logix5000 EtherNet/IP client implementation. Everything here is pure
//! data and codec logic; all I/O lives in `logix-client`.

pub mod error;
pub mod tag;
pub mod template;
pub mod types;
pub mod wire;

pub use error::{LogixError, LogixResult};
pub use tag::{ArrayTag, PathTarget, ScalarTag, Slot, StructureTag, Tag};
pub use template::{Member, RawMember, Template, TemplateAttributes, TemplateDefinition};
pub use types::{IntWidth, TagType, TagValue};

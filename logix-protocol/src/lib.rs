//! CIP protocol bodies for Logix5000 tag access
//!
//! This crate owns everything that crosses the wire below the tag model:
//! the CIP service codes the client issues, the EPath codec for symbolic
//! and class/instance addressing, the request/response body codecs for
//! reads, writes, symbol listing and template discovery, and the session
//! traits behind which the (out of scope) encapsulation and transport
//! layers live.

pub mod epath;
pub mod messages;
pub mod service;
pub mod session;

pub use epath::{EPath, PathSegment};
pub use messages::{
    encode_symbol_list_request, encode_template_attributes_request, parse_symbol_records,
    parse_template_attributes, ReadFragmentedRequest, ReadFragmentedResponse, SymbolRecord,
    TemplateDefinitionRequest, WriteFragmentedRequest, WriteRequest,
};
pub use service::CipService;
pub use session::{CipConnect, CipReply, CipSession};

use thiserror::Error;

/// Main error type for Logix5000 tag-access operations
///
/// Errors fall into three categories: transport failures (which cause the
/// controller to drop its session), protocol/format failures (fatal for the
/// current operation, never retried) and lookup failures (precondition
/// violations such as an unknown member name).
#[derive(Error, Debug)]
pub enum LogixError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Buffer truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("No member named {member} in template {template}")]
    UnknownMember { template: String, member: String },

    #[error("Cannot resolve path segment: {0}")]
    PathResolution(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
}

/// Result type alias for Logix5000 tag-access operations
pub type LogixResult<T> = Result<T, LogixError>;

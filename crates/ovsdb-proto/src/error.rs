//! Error types for wire encode/decode.

use thiserror::Error;

/// Errors raised while encoding or decoding OVSDB wire shapes.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// JSON syntax or structure error from serde.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport error surfaced through the stream codec.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON value that does not fit any OVSDB datum form.
    #[error("malformed datum: {0}")]
    Datum(String),

    /// A JSON-RPC frame missing required members or with an
    /// unrecognized shape.
    #[error("malformed frame: {0}")]
    Frame(String),

    /// A transaction result array that cannot be decoded.
    #[error("malformed result: {0}")]
    Result(String),

    /// A database schema document that cannot be decoded.
    #[error("malformed schema: {0}")]
    Schema(String),
}

/// Result type alias for proto operations.
pub type Result<T> = std::result::Result<T, ProtoError>;

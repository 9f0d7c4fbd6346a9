//! Error types for chunk decoding

use thiserror::Error;

/// Result type for chunk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chunk decoding error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown compression-mode tag
    #[error("Unsupported compression mode: {0:#04x}")]
    UnsupportedCompressionMode(u8),

    /// Zlib inflate failed
    #[error("Inflate failed: {0}")]
    Inflate(String),

    /// Chunk data ended before the requested range
    #[error("Truncated chunk: expected {expected} bytes, got {actual}")]
    TruncatedChunk { expected: usize, actual: usize },
}

//! Error types for encoding-table parsing and lookup

use thiserror::Error;

use crate::{Md5, jenkins3};

/// Result type for encoding-table operations
pub type Result<T> = std::result::Result<T, Error>;

/// Encoding-table error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error other than a short read
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// A field or block read ended before the expected length
    #[error("Truncated stream: {0}")]
    TruncatedStream(std::io::Error),

    /// Wrong magic at the start of the encoding blob
    #[error("Invalid signature: expected 0x4e45, got {found:#06x}")]
    InvalidSignature { found: u16 },

    /// A page's MD5 digest does not match its header checksum.
    ///
    /// The lookup3 fingerprints mirror how checksums are reported
    /// elsewhere in the storage layer.
    #[error(
        "Page checksum mismatch: expected {} ({:#010x}), got {} ({:#010x})",
        hex::encode(expected),
        jenkins3::hashlittle(expected, 0),
        hex::encode(actual),
        jenkins3::hashlittle(actual, 0)
    )]
    PageChecksumMismatch { expected: Vec<u8>, actual: Md5 },

    /// No table-A record for a content hash
    #[error("Content hash does not exist: {0}")]
    HashNotFound(String),

    /// No table-B record for a storage key
    #[error("Key does not exist: {0}")]
    KeyNotFound(String),

    /// Query key width does not match the table's declared hash width
    #[error("Invalid key length: table uses {expected}-byte keys, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Key string that is not valid hex
    #[error("Invalid hex in key: {0}")]
    InvalidKeyHex(String),

    /// Table-B record referenced a profile outside the profile table
    #[error("Profile index {index} is out of range, must be less than {profiles}")]
    InvalidProfileIndex { index: i32, profiles: usize },

    /// Chunk decoding error from the stream provider
    #[error("Chunk error: {0}")]
    Chunk(#[from] casc_chunk::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::TruncatedStream(e)
        } else {
            Self::Io(e)
        }
    }
}

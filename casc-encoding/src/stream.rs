//! Stream access to archive byte ranges.
//!
//! The encoding table never touches archive files itself; a
//! [`StreamProvider`] owns that, handing out byte streams for a
//! [`Location`] and applying chunk decompression (`casc-chunk`) when a
//! content-decoded view is requested.

use std::io::{Read, Seek};

use crate::Result;

/// A byte range within a numbered archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Index of the archive file.
    pub archive_index: u32,

    /// Byte offset of the range within the archive.
    pub offset: u64,

    /// Byte size of the range.
    pub size: u64,
}

impl Location {
    pub fn new(archive_index: u32, offset: u64, size: u64) -> Self {
        Self {
            archive_index,
            offset,
            size,
        }
    }
}

/// Provides byte streams into archive files.
///
/// Reads are blocking; failures propagate to the caller unretried. Retry
/// policy, if any, lives in the implementation.
pub trait StreamProvider {
    /// Stream type handed to parsers.
    type Stream: Read + Seek;

    /// Opens a stream over `location`, positioned at its first byte.
    ///
    /// With `decode_chunks` set, per-chunk compression-mode tags are
    /// interpreted and chunk handlers applied, so the stream yields
    /// logical (decoded) bytes. Otherwise raw archive bytes are returned
    /// unmodified.
    fn open(&self, location: &Location, decode_chunks: bool) -> Result<Self::Stream>;
}

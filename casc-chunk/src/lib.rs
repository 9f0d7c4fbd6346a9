//! Chunk decompression for CASC archive payloads.
//!
//! Stored files are split into independently compressed chunks. Each chunk
//! carries a one-byte compression-mode tag; a [`ChunkHandlerRegistry`] maps
//! that tag to a [`ChunkHandler`] which turns raw chunk bytes into decoded
//! output bytes.

pub mod decompress;
pub mod error;
pub mod handler;

pub use decompress::inflate;
pub use error::{Error, Result};
pub use handler::{ChunkData, ChunkHandler, ChunkHandlerRegistry, RAW_MODE, ZLIB_MODE};

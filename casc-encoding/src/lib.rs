//! Decoder for the CASC encoding table.
//!
//! The encoding table maps a file's content hash to its storage keys
//! (table A) and a storage key to its encoding profile (table B). Both
//! tables are stored as checksum-verified 4096-byte pages behind a sorted
//! header list, so point lookups are a floor search over page first-keys
//! followed by a scan of one verified page.
//!
//! Table data reaches this crate through a [`stream::StreamProvider`], which
//! owns archive access and applies chunk decompression (see `casc-chunk`)
//! when a content-decoded stream is requested.

pub mod encoding;
pub mod error;
pub mod jenkins3;
pub mod key;
pub mod stream;

pub use encoding::{EncodedFileInfo, EncodingTable, FileInfo};
pub use error::{Error, Result};
pub use key::Key;
pub use stream::{Location, StreamProvider};

/// Length of an MD5 digest in bytes
pub const MD5_LENGTH: usize = 16;

/// An MD5 digest
pub type Md5 = [u8; MD5_LENGTH];

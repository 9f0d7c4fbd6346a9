//! Fixed-width byte-string keys.
//!
//! Content hashes and storage keys are both opaque byte strings whose width
//! is declared by the encoding-table header, not hardcoded. Keys order
//! lexicographically, which is what makes the page floor search work.

use std::fmt;

use crate::{Error, Result, jenkins3};

/// An immutable fixed-width byte string used as a content hash or
/// storage key.
///
/// Ordering is lexicographic on the raw bytes. Keys of different widths
/// belong to different tables and are never meaningfully compared; lookup
/// entry points reject a width mismatch up front.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// Creates a key from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parses a key from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidKeyHex(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Width of the key in bytes.
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Seeded 32-bit lookup3 fingerprint of the key bytes, used for name
    /// indexing and log output.
    pub fn hash32(&self, seed: u32) -> u32 {
        jenkins3::hashlittle(&self.0, seed)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

//! Compression-mode handlers for archive chunks.
//!
//! A handler converts a range of raw chunk bytes into decoded output bytes.
//! Handlers are selected by the one-byte mode tag in the chunk header; each
//! variant holds only the state its mode needs, so a handler instance is
//! scoped to a single chunk and must be reset (or replaced) before decoding
//! the next one.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::decompress::inflate;
use crate::{Error, Result};

/// Mode tag for uncompressed chunks: `N`
pub const RAW_MODE: u8 = b'N';

/// Mode tag for zlib-compressed chunks: `Z`
pub const ZLIB_MODE: u8 = b'Z';

/// Decoded bytes for one `buffer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    /// The requested window of decoded bytes.
    pub data: Vec<u8>,

    /// Total decoded size of the chunk.
    ///
    /// Compressed chunk sizes are not known to callers up front; this is
    /// only exact once a compressed chunk has been fully inflated.
    pub decoded_size: u64,
}

/// Cache state for a zlib chunk: the fully inflated output, kept so that
/// windowed re-reads never inflate twice.
#[derive(Debug, Default)]
pub struct ZlibCache {
    decoded: Option<Vec<u8>>,
    inflate_calls: usize,
}

/// A chunk decoding strategy, dispatched on the compression-mode tag.
#[derive(Debug)]
pub enum ChunkHandler {
    /// Pass-through copy of raw chunk bytes.
    Raw,
    /// Inflate-on-first-use with a cached full output.
    Zlib(ZlibCache),
}

impl ChunkHandler {
    pub fn raw() -> Self {
        Self::Raw
    }

    pub fn zlib() -> Self {
        Self::Zlib(ZlibCache::default())
    }

    /// The mode tag this handler is registered for.
    pub fn compression_mode(&self) -> u8 {
        match self {
            Self::Raw => RAW_MODE,
            Self::Zlib(_) => ZLIB_MODE,
        }
    }

    /// Clears per-chunk state so the handler can serve another chunk.
    pub fn reset(&mut self) {
        if let Self::Zlib(cache) = self {
            cache.decoded = None;
        }
    }

    /// Number of times this handler has run the inflate primitive.
    ///
    /// Always 0 for [`ChunkHandler::Raw`]. A second windowed read within an
    /// already-decoded chunk must not bump this counter.
    pub fn inflate_calls(&self) -> usize {
        match self {
            Self::Raw => 0,
            Self::Zlib(cache) => cache.inflate_calls,
        }
    }

    /// Reads and decodes a window of one chunk.
    ///
    /// `f` must be positioned at the chunk's first raw byte. `in_size` is the
    /// raw byte count of the chunk; `out_size` decoded bytes are returned
    /// starting at `offset` within the chunk's decoded output.
    pub fn buffer<R: Read + Seek>(
        &mut self,
        f: &mut R,
        offset: u64,
        in_size: usize,
        out_size: usize,
    ) -> Result<ChunkData> {
        match self {
            Self::Raw => {
                if offset > 0 {
                    f.seek(SeekFrom::Current(offset as i64))?;
                }

                let mut data = vec![0; out_size];
                let actual = read_up_to(f, &mut data)?;
                if actual < out_size {
                    return Err(Error::TruncatedChunk {
                        expected: out_size,
                        actual,
                    });
                }

                Ok(ChunkData {
                    data,
                    decoded_size: in_size as u64,
                })
            }

            Self::Zlib(cache) => {
                let end = offset as usize + out_size;

                let needs_decode = match cache.decoded.as_ref() {
                    Some(decoded) => decoded.len() < end,
                    None => true,
                };

                if needs_decode {
                    let mut raw = vec![0; in_size];
                    let actual = read_up_to(f, &mut raw)?;
                    if actual < in_size {
                        return Err(Error::TruncatedChunk {
                            expected: in_size,
                            actual,
                        });
                    }

                    let decoded = inflate(&raw)?;
                    cache.inflate_calls += 1;
                    trace!(
                        "inflated chunk: {} -> {} bytes (call {})",
                        in_size,
                        decoded.len(),
                        cache.inflate_calls
                    );
                    cache.decoded = Some(decoded);
                }

                // Checked above or freshly decoded
                let decoded = cache.decoded.as_ref().ok_or(Error::TruncatedChunk {
                    expected: end,
                    actual: 0,
                })?;

                if decoded.len() < end {
                    return Err(Error::TruncatedChunk {
                        expected: end,
                        actual: decoded.len(),
                    });
                }

                Ok(ChunkData {
                    data: decoded[offset as usize..end].to_vec(),
                    decoded_size: decoded.len() as u64,
                })
            }
        }
    }
}

/// Reads until `buf` is full or the stream ends, returning the byte count.
fn read_up_to<R: Read>(f: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = f.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// The set of handlers available for decoding one chunked stream.
///
/// Handlers carry per-chunk cache state, so a registry must not be shared
/// between threads decoding different chunks at the same time.
#[derive(Debug)]
pub struct ChunkHandlerRegistry {
    handlers: Vec<ChunkHandler>,
}

impl Default for ChunkHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkHandlerRegistry {
    /// Creates a registry with the built-in handlers (Raw, Zlib).
    pub fn new() -> Self {
        Self {
            handlers: vec![ChunkHandler::raw(), ChunkHandler::zlib()],
        }
    }

    /// Adds a handler, replacing any existing handler for the same mode.
    pub fn register(&mut self, handler: ChunkHandler) {
        let mode = handler.compression_mode();
        self.handlers.retain(|h| h.compression_mode() != mode);
        self.handlers.push(handler);
    }

    /// Resolves the handler for a mode tag by exact match.
    ///
    /// An unrecognized tag is an error; there is no fallback handler.
    pub fn handler(&mut self, mode: u8) -> Result<&mut ChunkHandler> {
        self.handlers
            .iter_mut()
            .find(|h| h.compression_mode() == mode)
            .ok_or(Error::UnsupportedCompressionMode(mode))
    }

    /// Resets all handlers before decoding the next chunk.
    pub fn reset(&mut self) {
        for handler in &mut self.handlers {
            handler.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_mode_tags() {
        assert_eq!(ChunkHandler::raw().compression_mode(), b'N');
        assert_eq!(ChunkHandler::zlib().compression_mode(), b'Z');
    }

    #[test]
    fn test_registry_rejects_unknown_tag() {
        let mut registry = ChunkHandlerRegistry::new();
        let result = registry.handler(b'E');
        assert!(matches!(
            result,
            Err(Error::UnsupportedCompressionMode(0x45))
        ));
    }

    #[test]
    fn test_raw_short_read() {
        let mut f = Cursor::new(vec![1, 2, 3]);
        let mut handler = ChunkHandler::raw();
        let result = handler.buffer(&mut f, 0, 8, 8);
        assert!(matches!(
            result,
            Err(Error::TruncatedChunk {
                expected: 8,
                actual: 3
            })
        ));
    }
}

//! Zlib inflate primitive

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{Error, Result};

/// Inflates a complete zlib stream into an owned buffer.
///
/// The decompressed size of a chunk is not known up front, so this always
/// decodes to the end of the stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Inflate(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate_roundtrip() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = deflate(&payload);
        assert_eq!(inflate(&compressed).unwrap(), payload);
    }

    #[test]
    fn test_inflate_garbage() {
        let result = inflate(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(Error::Inflate(_))));
    }
}

//! Encoding table parser and lookup engine.
//!
//! The encoding table maps content hashes to storage keys (table A) and
//! storage keys to encoding profiles (table B). Both tables are stored as
//! contiguous 4096-byte pages behind a header list of
//! `(first_key, checksum)` pairs sorted ascending by `first_key`, so a
//! point lookup is a floor search over the headers, an MD5 check of the
//! selected page, and a linear scan of its records.
//!
//! IMPORTANT: multi-byte header fields are BIG-ENDIAN except the two-byte
//! signature; record fields mix both orders and are annotated below.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tracing::{debug, trace, warn};

use casc_chunk::inflate;

use crate::key::Key;
use crate::stream::{Location, StreamProvider};
use crate::{Error, Md5, Result};

/// Signature at the start of the encoding blob: "EN" read as a
/// little-endian u16.
const SIGNATURE: u16 = 0x4E45;

/// Size of the fixed header in bytes.
const HEADER_SIZE: u64 = 22;

/// Size of one table page in bytes.
const PAGE_SIZE: usize = 4096;

/// First two bytes of an embedded zlib stream.
const ZLIB_MARKER: [u8; 2] = [0x78, 0xDA];

/// One logical file: its content hash, uncompressed size, and the storage
/// keys holding its bytes. The first key is the primary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub content_hash: Key,
    pub size: u64,
    pub keys: Vec<Key>,
}

/// How one storage key is physically encoded: its declared size and the
/// profile string describing chunking/compression parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFileInfo {
    pub key: Key,
    pub size: u64,
    pub profile: String,
}

/// Header of one table page: the first key stored in the page and the MD5
/// checksum of its raw bytes.
#[derive(Debug, Clone)]
struct PageHeader {
    first_key: Key,
    checksum: Vec<u8>,
}

/// Parsed encoding table.
///
/// Built once from a single sequential read and immutable afterwards, so
/// shared read-only use across threads is safe. Queries decode pages on
/// demand from the owned raw page regions.
pub struct EncodingTable {
    hash_size_a: usize,
    hash_size_b: usize,
    headers_a: Vec<PageHeader>,
    table_a: Vec<u8>,
    headers_b: Vec<PageHeader>,
    table_b: Vec<u8>,
    profiles: Vec<String>,
    params: Option<String>,
}

impl EncodingTable {
    /// Reads and parses the encoding table identified by `location`.
    ///
    /// Opens the location twice: once raw to pull the wrapper-header size
    /// field and scan its parameter region for an embedded zlib blob
    /// (best-effort, see [`EncodingTable::params`]), then content-decoded
    /// for the actual table parse.
    pub fn open<P: StreamProvider>(provider: &P, location: &Location) -> Result<Self> {
        let params = Self::read_params(&mut provider.open(location, false)?)?;
        let mut table = Self::parse(&mut provider.open(location, true)?)?;
        table.params = params;
        Ok(table)
    }

    /// Extracts the parameter string from the raw wrapper header.
    ///
    /// The wrapper layout is externally defined; the only field read here
    /// is the little-endian size 16 bytes in. The `size - 20` bytes after
    /// it are scanned backward for a zlib stream, which inflates to a
    /// parameter string. No marker means no string, not an error.
    fn read_params<R: Read + Seek>(f: &mut R) -> Result<Option<String>> {
        f.seek(SeekFrom::Start(16))?;
        let size = f.read_u32::<LittleEndian>()? as usize;

        let Some(region) = size.checked_sub(20) else {
            return Ok(None);
        };
        let mut buf = vec![0; region];
        f.read_exact(&mut buf)?;

        for i in (2..buf.len()).rev() {
            if buf[i - 1..=i] == ZLIB_MARKER {
                let text = inflate(&buf[i - 1..])?;
                let params = String::from_utf8_lossy(&text).into_owned();
                debug!("extracted parameter string: {} bytes", params.len());
                return Ok(Some(params));
            }
        }

        trace!("no zlib marker in {region}-byte parameter region");
        Ok(None)
    }

    /// Parses an encoding table from a content-decoded stream.
    pub fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let signature = f.read_u16::<LittleEndian>()?;
        if signature != SIGNATURE {
            return Err(Error::InvalidSignature { found: signature });
        }

        f.read_u8()?; // unknown
        let hash_size_a = usize::from(f.read_u8()?);
        let hash_size_b = usize::from(f.read_u8()?);
        let mut flags = [0u8; 4];
        f.read_exact(&mut flags)?; // flags, unused
        let page_count_a = f.read_u32::<BigEndian>()? as usize;
        let page_count_b = f.read_u32::<BigEndian>()? as usize;
        f.read_u8()?; // unknown
        let string_table_size = u64::from(f.read_u32::<BigEndian>()?);

        debug!(
            "parsed encoding header: hash_size_a={hash_size_a}, hash_size_b={hash_size_b}, \
             pages_a={page_count_a}, pages_b={page_count_b}, string_table={string_table_size}"
        );

        if hash_size_a != hash_size_b {
            // Reference decoders read table-B page headers at width A; with
            // differing widths the two interpretations diverge.
            warn!("table hash widths differ: A={hash_size_a}, B={hash_size_b}");
        }

        // Profile strings fill the region up to absolute offset
        // 22 + string_table_size - 1 (the declared size counts the header).
        let mut profiles = Vec::new();
        let mut pos = HEADER_SIZE;
        while pos < (HEADER_SIZE + string_table_size).saturating_sub(1) {
            profiles.push(read_cstring(f, &mut pos)?);
        }
        trace!("read {} profile strings", profiles.len());

        let headers_a = read_page_headers(f, page_count_a, hash_size_a)?;
        let table_a = read_page_data(f, page_count_a)?;
        let headers_b = read_page_headers(f, page_count_b, hash_size_b)?;
        let table_b = read_page_data(f, page_count_b)?;

        // One final profile string describes this blob's own storage.
        profiles.push(read_trailing_cstring(f)?);

        Ok(Self {
            hash_size_a,
            hash_size_b,
            headers_a,
            table_a,
            headers_b,
            table_b,
            profiles,
            params: None,
        })
    }

    /// Finds the file info for a content hash.
    pub fn find_file_info(&self, hash: &Key) -> Result<FileInfo> {
        check_width(hash, self.hash_size_a)?;

        let index = floor_page(&self.headers_a, hash)
            .ok_or_else(|| Error::HashNotFound(hash.to_string()))?;
        trace!(
            "hash {hash} (lookup3 {:#010x}) floors to page {index}",
            hash.hash32(0)
        );

        let page = verified_page(&self.table_a, &self.headers_a, index)?;
        self.parse_file_page(page)?
            .into_iter()
            .find(|file| file.content_hash == *hash)
            .ok_or_else(|| Error::HashNotFound(hash.to_string()))
    }

    /// Finds the encoding info for a storage key.
    pub fn find_encoded_file_info(&self, key: &Key) -> Result<EncodedFileInfo> {
        check_width(key, self.hash_size_b)?;

        let index =
            floor_page(&self.headers_b, key).ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
        trace!(
            "key {key} (lookup3 {:#010x}) floors to page {index}",
            key.hash32(0)
        );

        let page = verified_page(&self.table_b, &self.headers_b, index)?;
        self.parse_encoded_page(page)?
            .into_iter()
            .find(|file| file.key == *key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    /// Lists file info starting at page `offset`.
    ///
    /// The cursor is page-granular: records accumulate across page
    /// boundaries until `count` are collected or table A is exhausted.
    pub fn list_file_info(&self, offset: usize, count: usize) -> Result<Vec<FileInfo>> {
        let mut list = Vec::new();

        for index in offset..self.headers_a.len() {
            if list.len() >= count {
                break;
            }
            let page = verified_page(&self.table_a, &self.headers_a, index)?;
            let mut files = self.parse_file_page(page)?;
            files.truncate(count - list.len());
            list.append(&mut files);
        }

        Ok(list)
    }

    /// Lists encoded file info starting at page `offset`.
    pub fn list_encoded_file_info(&self, offset: usize, count: usize) -> Result<Vec<EncodedFileInfo>> {
        let mut list = Vec::new();

        for index in offset..self.headers_b.len() {
            if list.len() >= count {
                break;
            }
            let page = verified_page(&self.table_b, &self.headers_b, index)?;
            let mut files = self.parse_encoded_page(page)?;
            files.truncate(count - list.len());
            list.append(&mut files);
        }

        Ok(list)
    }

    /// Parses a table-A page: densely packed variable-length records,
    /// terminated by the page end or a zero key count.
    fn parse_file_page(&self, page: &[u8]) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut r = page;

        while r.len() >= 2 {
            let key_count = r.read_u16::<LittleEndian>()?;
            if key_count == 0 {
                // Rest of the page is padding
                break;
            }

            let size = u64::from(r.read_u32::<BigEndian>()?);

            let mut hash = vec![0; self.hash_size_a];
            r.read_exact(&mut hash)?;

            let mut keys = Vec::with_capacity(usize::from(key_count));
            for _ in 0..key_count {
                let mut key = vec![0; self.hash_size_a];
                r.read_exact(&mut key)?;
                keys.push(Key::new(key));
            }

            files.push(FileInfo {
                content_hash: Key::new(hash),
                size,
                keys,
            });
        }

        Ok(files)
    }

    /// Parses a table-B page: fixed-width records, exactly
    /// `4096 / (hash_size_b + 9)` per page, no sentinel.
    fn parse_encoded_page(&self, page: &[u8]) -> Result<Vec<EncodedFileInfo>> {
        let record_width = self.hash_size_b + 9;
        let records = PAGE_SIZE / record_width;

        let mut files = Vec::with_capacity(records);
        let mut r = page;

        for _ in 0..records {
            let mut key = vec![0; self.hash_size_b];
            r.read_exact(&mut key)?;

            let profile_index = r.read_i32::<BigEndian>()?;
            r.read_u8()?; // padding
            let size = u64::from(r.read_u32::<BigEndian>()?);

            // Negative means "no profile"; a non-negative index must land
            // inside the profile table.
            let profile = if profile_index < 0 {
                String::new()
            } else {
                self.profiles
                    .get(profile_index as usize)
                    .cloned()
                    .ok_or(Error::InvalidProfileIndex {
                        index: profile_index,
                        profiles: self.profiles.len(),
                    })?
            };

            files.push(EncodedFileInfo {
                key: Key::new(key),
                size,
                profile,
            });
        }

        Ok(files)
    }

    /// Byte width of table-A keys.
    pub fn hash_size_a(&self) -> usize {
        self.hash_size_a
    }

    /// Byte width of table-B keys.
    pub fn hash_size_b(&self) -> usize {
        self.hash_size_b
    }

    /// Number of table-A pages.
    pub fn page_count_a(&self) -> usize {
        self.headers_a.len()
    }

    /// Number of table-B pages.
    pub fn page_count_b(&self) -> usize {
        self.headers_b.len()
    }

    /// The profile strings referenced by table-B records, plus the blob's
    /// own trailing profile as the last element.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// The profile describing how the encoding blob itself is stored.
    pub fn self_profile(&self) -> Option<&str> {
        self.profiles.last().map(String::as_str)
    }

    /// The diagnostic parameter string from the wrapper header, if the
    /// zlib marker was found. Nothing downstream depends on it.
    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }
}

/// Rejects a query key whose width differs from the table's declared one.
fn check_width(key: &Key, expected: usize) -> Result<()> {
    if key.width() == expected {
        Ok(())
    } else {
        Err(Error::InvalidKeyLength {
            expected,
            actual: key.width(),
        })
    }
}

/// Index of the page with the greatest `first_key <= target`, if any.
///
/// Headers are kept in their natural ascending file order, so this is a
/// plain binary floor search.
fn floor_page(headers: &[PageHeader], target: &Key) -> Option<usize> {
    let n = headers.partition_point(|h| h.first_key <= *target);
    n.checked_sub(1)
}

/// Returns page `index`, checking its MD5 digest against the header
/// checksum first. The checksum is compared at its declared width.
fn verified_page<'a>(table: &'a [u8], headers: &[PageHeader], index: usize) -> Result<&'a [u8]> {
    let page = &table[index * PAGE_SIZE..(index + 1) * PAGE_SIZE];
    let digest: Md5 = md5::compute(page).0;
    let checksum = &headers[index].checksum;

    if !digest.starts_with(checksum) {
        return Err(Error::PageChecksumMismatch {
            expected: checksum.clone(),
            actual: digest,
        });
    }

    Ok(page)
}

fn read_page_headers<R: Read>(
    f: &mut R,
    count: usize,
    hash_size: usize,
) -> Result<Vec<PageHeader>> {
    let mut headers = Vec::with_capacity(count);

    for _ in 0..count {
        let mut first_key = vec![0; hash_size];
        f.read_exact(&mut first_key)?;

        let mut checksum = vec![0; hash_size];
        f.read_exact(&mut checksum)?;

        headers.push(PageHeader {
            first_key: Key::new(first_key),
            checksum,
        });
    }

    Ok(headers)
}

fn read_page_data<R: Read>(f: &mut R, count: usize) -> Result<Vec<u8>> {
    let mut data = vec![0; count * PAGE_SIZE];
    f.read_exact(&mut data)?;
    Ok(data)
}

/// Reads a null-terminated string, advancing `pos` past the terminator.
/// Running out of stream mid-string is a truncation error.
fn read_cstring<R: Read>(f: &mut R, pos: &mut u64) -> Result<String> {
    let mut buf = Vec::new();

    loop {
        let b = f.read_u8()?;
        *pos += 1;
        if b == 0 {
            break;
        }
        buf.push(b);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads a null-terminated string at the end of the blob, where the
/// stream ending also terminates the string.
fn read_trailing_cstring<R: Read>(f: &mut R) -> Result<String> {
    let mut buf = Vec::new();

    loop {
        match f.read_u8() {
            Ok(0) => break,
            Ok(b) => buf.push(b),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        // Fixed header is exactly 22 bytes
        let header_size = 2 + 1 + 1 + 1 + 4 + 4 + 4 + 1 + 4;
        assert_eq!(header_size, HEADER_SIZE);
    }

    #[test]
    fn test_parse_empty_table() {
        let mut data = Vec::new();
        data.extend_from_slice(&SIGNATURE.to_le_bytes());
        data.push(0); // unknown
        data.push(16); // hash size A
        data.push(16); // hash size B
        data.extend_from_slice(&[0; 4]); // flags
        data.extend_from_slice(&0u32.to_be_bytes()); // page count A
        data.extend_from_slice(&0u32.to_be_bytes()); // page count B
        data.push(0); // unknown
        data.extend_from_slice(&0u32.to_be_bytes()); // string table size
        data.extend_from_slice(b"z\0"); // trailing self profile

        let table = EncodingTable::parse(&mut data.as_slice()).unwrap();
        assert_eq!(table.hash_size_a(), 16);
        assert_eq!(table.hash_size_b(), 16);
        assert_eq!(table.page_count_a(), 0);
        assert_eq!(table.page_count_b(), 0);
        assert_eq!(table.self_profile(), Some("z"));
        assert_eq!(table.params(), None);
    }

    #[test]
    fn test_invalid_signature() {
        let data = [0x00u8, 0x00, 1, 16, 16];
        let result = EncodingTable::parse(&mut data.as_slice());
        assert!(matches!(
            result,
            Err(Error::InvalidSignature { found: 0 })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = SIGNATURE.to_le_bytes();
        let result = EncodingTable::parse(&mut data.as_slice());
        assert!(matches!(result, Err(Error::TruncatedStream(_))));
    }

    #[test]
    fn test_floor_page() {
        let headers: Vec<PageHeader> = [[0x10u8], [0x20], [0x30]]
            .iter()
            .map(|first| PageHeader {
                first_key: Key::new(first.to_vec()),
                checksum: vec![],
            })
            .collect();

        assert_eq!(floor_page(&headers, &Key::new(vec![0x0F])), None);
        assert_eq!(floor_page(&headers, &Key::new(vec![0x10])), Some(0));
        assert_eq!(floor_page(&headers, &Key::new(vec![0x1F])), Some(0));
        assert_eq!(floor_page(&headers, &Key::new(vec![0x20])), Some(1));
        assert_eq!(floor_page(&headers, &Key::new(vec![0xFF])), Some(2));
    }
}

//! Persisted hash64 translation table.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "T64C" | version u16 | reserved u16 | md5 [u8; 16]
//! fingerprint u64 | count u32 | count x (hash64 u64, hash32 u32)
//! ```
//!
//! The MD5 covers every byte after the checksum field. A file whose
//! fingerprint differs from the current package set is stale.

use crate::{Result, StorageError};
use binrw::{BinRead, BinWrite, BinWriterExt};
use std::collections::HashMap;
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use tiger_formats::{TagHash, TagHash64};
use tracing::{debug, info};

/// Cache file magic bytes.
pub const HASH64_CACHE_MAGIC: [u8; 4] = *b"T64C";

/// Cache file version.
pub const HASH64_CACHE_VERSION: u16 = 1;

/// Offset of the first checksummed byte.
const CHECKSUM_END: usize = 24;

#[derive(Debug, BinRead, BinWrite)]
#[brw(little)]
struct CacheHeader {
    #[br(assert(magic == HASH64_CACHE_MAGIC, "Invalid hash64 cache magic"))]
    magic: [u8; 4],
    version: u16,
    reserved: u16,
    checksum: [u8; 16],
    fingerprint: u64,
    count: u32,
}

#[derive(Debug, BinRead, BinWrite)]
#[brw(little)]
struct CacheRow {
    hash64: TagHash64,
    hash32: TagHash,
}

const HEADER_SIZE: usize = 36;
const ROW_SIZE: usize = 12;

/// Serialize a translation table. Rows are sorted by 64-bit hash.
pub fn serialize(fingerprint: u64, table: &HashMap<TagHash64, TagHash>) -> Result<Vec<u8>> {
    let mut rows: Vec<_> = table.iter().map(|(&h64, &h32)| (h64, h32)).collect();
    rows.sort_unstable_by_key(|(h64, _)| *h64);

    let header = CacheHeader {
        magic: HASH64_CACHE_MAGIC,
        version: HASH64_CACHE_VERSION,
        reserved: 0,
        checksum: [0; 16],
        fingerprint,
        count: u32::try_from(rows.len())
            .map_err(|_| StorageError::InvalidFormat("too many hash64 rows".to_string()))?,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_SIZE + rows.len() * ROW_SIZE));
    cursor.write_le(&header)?;
    for (hash64, hash32) in rows {
        cursor.write_le(&CacheRow { hash64, hash32 })?;
    }

    let mut data = cursor.into_inner();
    let digest = md5::compute(&data[CHECKSUM_END..]);
    data[8..CHECKSUM_END].copy_from_slice(&digest.0);
    Ok(data)
}

/// Parse a cache file and check it against the current fingerprint.
pub fn deserialize(data: &[u8], fingerprint: u64) -> Result<HashMap<TagHash64, TagHash>> {
    let mut cursor = Cursor::new(data);
    let header = CacheHeader::read(&mut cursor)?;

    if header.version != HASH64_CACHE_VERSION {
        return Err(StorageError::InvalidFormat(format!(
            "unsupported hash64 cache version {}",
            header.version
        )));
    }

    let expected_len = HEADER_SIZE + header.count as usize * ROW_SIZE;
    if data.len() != expected_len {
        return Err(StorageError::Corruption(format!(
            "hash64 cache is {} bytes, expected {expected_len}",
            data.len()
        )));
    }

    if md5::compute(&data[CHECKSUM_END..]).0 != header.checksum {
        return Err(StorageError::Corruption(
            "hash64 cache checksum mismatch".to_string(),
        ));
    }

    if header.fingerprint != fingerprint {
        return Err(StorageError::InvalidFormat(format!(
            "hash64 cache fingerprint {:016x} does not match package set {fingerprint:016x}",
            header.fingerprint
        )));
    }

    let mut table = HashMap::with_capacity(header.count as usize);
    for _ in 0..header.count {
        let row = CacheRow::read(&mut cursor)?;
        table.insert(row.hash64, row.hash32);
    }
    Ok(table)
}

/// Load the table at `path`. `Ok(None)` when no file exists.
pub fn load(path: &Path, fingerprint: u64) -> Result<Option<HashMap<TagHash64, TagHash>>> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No hash64 cache at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let table = deserialize(&data, fingerprint)?;
    info!(
        "Loaded {} hash64 mappings from {}",
        table.len(),
        path.display()
    );
    Ok(Some(table))
}

/// Write the table to `path` through a temporary sibling file.
pub fn save(path: &Path, fingerprint: u64, table: &HashMap<TagHash64, TagHash>) -> Result<()> {
    let data = serialize(fingerprint, table)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &data)?;
    std::fs::rename(&tmp, path)?;
    debug!("Wrote {} hash64 mappings to {}", table.len(), path.display());
    Ok(())
}

//! Builder for creating package files from scratch
//!
//! [`PackageBuilder`] lays a package out as header, entry table, hash64
//! table and then entry data in insertion order. Output parses back with
//! [`PackageIndex::parse`](crate::package::PackageIndex::parse).
//!
//! # Example
//!
//! ```rust
//! use tiger_formats::package::{PackageBuilder, PackageIndex};
//!
//! let mut builder = PackageBuilder::new(0x12).with_patch_id(1);
//! let hash = builder.add_entry(0x8080_6D30, vec![0xDE, 0xAD]).expect("entry");
//! builder.add_hash64(0x1122_3344_5566_7788, hash);
//!
//! let data = builder.build().expect("build");
//! let index = PackageIndex::parse(&data).expect("parse");
//! assert_eq!(index.entries.len(), 1);
//! assert_eq!(index.entry_data(&data, 0).expect("data"), &[0xDE, 0xAD]);
//! ```

use crate::hash::{TagHash, TagHash64};
use crate::package::{
    ENTRY_FLAG_COMPRESSED, ENTRY_FLAG_REDIRECT, Hash64Entry, PackageEntry, PackageHeader,
    error::{PackageError, Result},
    header::MAX_ENTRIES,
};
use binrw::BinWriterExt;
use flate2::{Compression, write::ZlibEncoder};
use std::io::{Cursor, Write};

/// Description of one entry to add
#[derive(Debug, Clone)]
pub struct EntrySpec {
    /// Class hash of the stored tag
    pub type_tag: u32,
    pub file_type: u8,
    pub file_subtype: u8,
    /// Uncompressed data
    pub data: Vec<u8>,
    /// Store zlib-compressed
    pub compress: bool,
}

impl EntrySpec {
    pub fn new(type_tag: u32, data: Vec<u8>) -> Self {
        Self {
            type_tag,
            file_type: 0,
            file_subtype: 0,
            data,
            compress: false,
        }
    }

    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    #[must_use]
    pub fn with_file_type(mut self, file_type: u8, file_subtype: u8) -> Self {
        self.file_type = file_type;
        self.file_subtype = file_subtype;
        self
    }
}

#[derive(Debug, Clone)]
enum PendingEntry {
    Data(EntrySpec),
    Redirect { type_tag: u32, target: TagHash },
}

/// Builder for package files
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    header: PackageHeader,
    entries: Vec<PendingEntry>,
    hash64: Vec<Hash64Entry>,
}

impl PackageBuilder {
    /// Create a builder for `package_id` at patch 0
    pub fn new(package_id: u16) -> Self {
        Self {
            header: PackageHeader::new(package_id),
            entries: Vec::new(),
            hash64: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_patch_id(mut self, patch_id: u16) -> Self {
        self.header.patch_id = patch_id;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: u16) -> Self {
        self.header.platform = platform;
        self
    }

    #[must_use]
    pub fn with_build_id(mut self, build_id: u32) -> Self {
        self.header.build_id = build_id;
        self
    }

    /// Hash the next added entry will get
    pub fn next_hash(&self) -> Result<TagHash> {
        Ok(TagHash::encode(
            self.header.package_id,
            self.entries.len() as u16,
        )?)
    }

    fn push(&mut self, entry: PendingEntry) -> Result<TagHash> {
        if self.entries.len() as u32 >= MAX_ENTRIES {
            return Err(PackageError::TooManyEntries(self.entries.len() as u32 + 1));
        }
        let hash = self.next_hash()?;
        self.entries.push(entry);
        Ok(hash)
    }

    /// Add an uncompressed entry and return its hash
    pub fn add_entry(&mut self, type_tag: u32, data: Vec<u8>) -> Result<TagHash> {
        self.push(PendingEntry::Data(EntrySpec::new(type_tag, data)))
    }

    /// Add an entry with full control over its row
    pub fn add_entry_spec(&mut self, spec: EntrySpec) -> Result<TagHash> {
        self.push(PendingEntry::Data(spec))
    }

    /// Add a data-less entry pointing at `target`
    pub fn add_redirect(&mut self, type_tag: u32, target: TagHash) -> Result<TagHash> {
        if !target.is_valid() {
            return Err(PackageError::InvalidRedirect(target));
        }
        self.push(PendingEntry::Redirect { type_tag, target })
    }

    /// Add a hash64 translation row
    pub fn add_hash64(&mut self, hash64: u64, target: TagHash) {
        self.hash64.push(Hash64Entry {
            hash64: TagHash64(hash64),
            hash32: target,
            flags: 0,
        });
    }

    /// Serialize the package
    pub fn build(&self) -> Result<Vec<u8>> {
        let entry_table_offset = PackageHeader::SIZE;
        let hash64_table_offset = entry_table_offset + self.entries.len() * PackageEntry::SIZE;
        let data_offset = hash64_table_offset + self.hash64.len() * Hash64Entry::SIZE;

        let mut rows = Vec::with_capacity(self.entries.len());
        let mut blobs = Vec::new();
        for entry in &self.entries {
            let row = match entry {
                PendingEntry::Data(spec) => {
                    let stored = if spec.compress {
                        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                        encoder.write_all(&spec.data)?;
                        encoder.finish()?
                    } else {
                        spec.data.clone()
                    };
                    let offset = to_u32(data_offset + blobs.len())?;
                    let size = to_u32(stored.len())?;
                    blobs.extend_from_slice(&stored);
                    PackageEntry {
                        reference: TagHash::NONE,
                        type_tag: spec.type_tag,
                        file_type: spec.file_type,
                        file_subtype: spec.file_subtype,
                        flags: if spec.compress {
                            ENTRY_FLAG_COMPRESSED
                        } else {
                            0
                        },
                        offset,
                        size,
                    }
                }
                PendingEntry::Redirect { type_tag, target } => PackageEntry {
                    reference: *target,
                    type_tag: *type_tag,
                    file_type: 0,
                    file_subtype: 0,
                    flags: ENTRY_FLAG_REDIRECT,
                    offset: 0,
                    size: 0,
                },
            };
            rows.push(row);
        }

        let mut header = self.header.clone();
        header.entry_table_offset = to_u32(entry_table_offset)?;
        header.entry_count = to_u32(rows.len())?;
        header.hash64_table_offset = to_u32(hash64_table_offset)?;
        header.hash64_count = to_u32(self.hash64.len())?;

        let mut cursor = Cursor::new(Vec::with_capacity(data_offset + blobs.len()));
        cursor.write_le(&header)?;
        for row in &rows {
            cursor.write_le(row)?;
        }
        for row in &self.hash64 {
            cursor.write_le(row)?;
        }
        let mut out = cursor.into_inner();
        out.extend_from_slice(&blobs);
        Ok(out)
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| PackageError::TooLarge)
}

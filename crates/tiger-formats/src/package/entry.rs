use crate::hash::{TagHash, TagHash64};
use binrw::{BinRead, BinWrite};

/// Entry flag: the entry holds no data and points at `reference`
pub const ENTRY_FLAG_REDIRECT: u16 = 0x1;

/// Entry flag: the data is zlib-compressed
pub const ENTRY_FLAG_COMPRESSED: u16 = 0x2;

/// Entry table row (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct PackageEntry {
    /// Canonical entry for redirected content, [`TagHash::NONE`] otherwise
    pub reference: TagHash,

    /// Class hash of the tag stored in this entry
    pub type_tag: u32,

    pub file_type: u8,

    pub file_subtype: u8,

    /// `ENTRY_FLAG_*` bits
    pub flags: u16,

    /// Absolute offset of the entry data
    pub offset: u32,

    /// Stored (possibly compressed) size
    pub size: u32,
}

impl PackageEntry {
    /// Serialized size in bytes
    pub const SIZE: usize = 0x14;

    pub fn is_redirect(&self) -> bool {
        self.flags & ENTRY_FLAG_REDIRECT != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & ENTRY_FLAG_COMPRESSED != 0
    }
}

/// Hash64 table row (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Hash64Entry {
    pub hash64: TagHash64,
    pub hash32: TagHash,
    pub flags: u32,
}

impl Hash64Entry {
    /// Serialized size in bytes
    pub const SIZE: usize = 0x10;
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::BinWriterExt;
    use std::io::Cursor;

    #[test]
    fn test_entry_layout() {
        let entry = PackageEntry {
            reference: TagHash::NONE,
            type_tag: 0x8080_9AD8,
            file_type: 8,
            file_subtype: 0,
            flags: ENTRY_FLAG_COMPRESSED,
            offset: 0x100,
            size: 0x40,
        };

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&entry).unwrap();
        let data = cursor.into_inner();
        assert_eq!(data.len(), PackageEntry::SIZE);
        assert_eq!(&data[4..8], &0x8080_9AD8u32.to_le_bytes());

        let parsed = PackageEntry::read(&mut Cursor::new(&data)).unwrap();
        assert_eq!(parsed, entry);
        assert!(parsed.is_compressed());
        assert!(!parsed.is_redirect());
    }

    #[test]
    fn test_hash64_layout() {
        let row = Hash64Entry {
            hash64: TagHash64(0x0102_0304_0506_0708),
            hash32: TagHash(0x8080_0001),
            flags: 0,
        };
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&row).unwrap();
        let data = cursor.into_inner();
        assert_eq!(data.len(), Hash64Entry::SIZE);
        assert_eq!(Hash64Entry::read(&mut Cursor::new(&data)).unwrap(), row);
    }
}

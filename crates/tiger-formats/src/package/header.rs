use crate::hash::MAX_PACKAGE_ID;
use crate::package::error::PackageError;
use binrw::{BinRead, BinWrite};

/// Package magic bytes
pub const PACKAGE_MAGIC: [u8; 4] = *b"TPKG";

/// Only supported package version
pub const PACKAGE_VERSION: u16 = 1;

/// Highest entry count one package can hold (13-bit entry index)
pub const MAX_ENTRIES: u32 = 0x2000;

/// Package file header (48 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
pub struct PackageHeader {
    /// Magic bytes: 'TPKG'
    #[br(assert(magic == PACKAGE_MAGIC, "Invalid package magic"))]
    pub magic: [u8; 4],

    /// Format version (1)
    pub version: u16,

    /// Target platform identifier
    pub platform: u16,

    /// Package index used in every [`TagHash`](crate::hash::TagHash) of this package
    pub package_id: u16,

    /// Patch level; the highest patch of a package id wins
    pub patch_id: u16,

    /// Build the package was produced by
    pub build_id: u32,

    /// Absolute offset of the entry table
    pub entry_table_offset: u32,

    /// Number of entries in the entry table
    pub entry_count: u32,

    /// Absolute offset of the hash64 table
    pub hash64_table_offset: u32,

    /// Number of hash64 table rows
    pub hash64_count: u32,

    /// Reserved, written as zero
    pub reserved: [u8; 16],
}

impl PackageHeader {
    /// Serialized size in bytes
    pub const SIZE: usize = 0x30;

    /// Header for an empty package
    pub fn new(package_id: u16) -> Self {
        Self {
            magic: PACKAGE_MAGIC,
            version: PACKAGE_VERSION,
            platform: 0,
            package_id,
            patch_id: 0,
            build_id: 0,
            entry_table_offset: Self::SIZE as u32,
            entry_count: 0,
            hash64_table_offset: Self::SIZE as u32,
            hash64_count: 0,
            reserved: [0; 16],
        }
    }

    /// Validate header fields
    pub fn validate(&self) -> Result<(), PackageError> {
        if self.magic != PACKAGE_MAGIC {
            return Err(PackageError::InvalidMagic(self.magic));
        }

        if self.version != PACKAGE_VERSION {
            return Err(PackageError::UnsupportedVersion(self.version));
        }

        if self.package_id > MAX_PACKAGE_ID {
            return Err(PackageError::PackageIdOutOfRange(self.package_id));
        }

        if self.entry_count > MAX_ENTRIES {
            return Err(PackageError::TooManyEntries(self.entry_count));
        }

        Ok(())
    }
}

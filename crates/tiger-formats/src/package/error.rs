//! Error types for package file operations

use crate::hash::HashError;
use thiserror::Error;

/// Errors that can occur when parsing or building package files
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum PackageError {
    #[error("Invalid magic: expected 'TPKG', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("Package id {0:#x} exceeds 0x7ff")]
    PackageIdOutOfRange(u16),

    #[error("Entry count {0} exceeds 0x2000")]
    TooManyEntries(u32),

    #[error("{table} table at {offset:#x} with {count} entries exceeds file size {file_size:#x}")]
    TableOutOfBounds {
        /// Which table is out of bounds
        table: &'static str,
        /// Table start offset
        offset: u32,
        /// Number of entries in the table
        count: u32,
        /// Size of the package file
        file_size: usize,
    },

    #[error("Entry {index} data at {offset:#x}+{size:#x} exceeds file size {file_size:#x}")]
    EntryOutOfBounds {
        /// Entry index
        index: u16,
        /// Data offset
        offset: u32,
        /// Data size
        size: u32,
        /// Size of the package file
        file_size: usize,
    },

    #[error("Entry index {0} not present in package")]
    NoSuchEntry(u16),

    #[error("Redirect target {0} is not a valid hash")]
    InvalidRedirect(crate::hash::TagHash),

    #[error("Package exceeds 4 GiB")]
    TooLarge,

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for package operations
pub type Result<T> = std::result::Result<T, PackageError>;

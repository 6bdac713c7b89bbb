//! Tiger package file format
//!
//! A package file is a 48-byte [`PackageHeader`], an entry table of
//! [`PackageEntry`] rows indexed by entry index, a table of [`Hash64Entry`]
//! rows translating 64-bit hashes to package hashes, and the entry data.
//! All integers are little-endian.

mod builder;
mod entry;
mod error;
mod file;
mod header;

pub use builder::{EntrySpec, PackageBuilder};
pub use entry::{ENTRY_FLAG_COMPRESSED, ENTRY_FLAG_REDIRECT, Hash64Entry, PackageEntry};
pub use error::{PackageError, Result};
pub use file::{PackageIndex, inflate_entry};
pub use header::{MAX_ENTRIES, PACKAGE_MAGIC, PACKAGE_VERSION, PackageHeader};

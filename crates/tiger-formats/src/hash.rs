//! Tiger content hashes
//!
//! Every blob in a package set is addressed by one of three hash shapes:
//!
//! - [`TagHash`]: the 32-bit package-relative hash. Bits 13..=22 hold the low
//!   ten bits of the package id, bit 24 holds its eleventh bit and the low 13
//!   bits hold the entry index. Encoded hashes always carry the `0x8080_0000`
//!   bank offset.
//! - [`TagHash64`]: the 64-bit hash that stays stable across repackaging. It
//!   must be translated to a [`TagHash`] through the package set's hash64
//!   table before it can address bytes.
//! - [`StringHash`]: FNV-1 32-bit hash of a text value. Never addresses bytes.
//!
//! Both `0` and the all-ones pattern are "absent" for tag hashes. Callers must
//! go through [`TagHash::is_valid`] rather than comparing against zero.

use binrw::{BinRead, BinWrite};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bank offset applied to every encoded [`TagHash`].
pub const TAG_HASH_BASE: u32 = 0x8080_0000;

/// Highest package id a [`TagHash`] can address (11 bits).
pub const MAX_PACKAGE_ID: u16 = 0x7FF;

/// Highest entry index a [`TagHash`] can address (13 bits).
pub const MAX_ENTRY_INDEX: u16 = 0x1FFF;

/// FNV-1 32-bit offset basis, also the hash of the empty string.
pub const FNV1_OFFSET_BASIS: u32 = 0x811C_9DC5;

/// FNV-1 32-bit prime.
pub const FNV1_PRIME: u32 = 0x0100_0193;

/// Errors produced while decoding, encoding or parsing hashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// The hash is one of the absent sentinels (`0` or all ones).
    #[error("invalid hash {0:#010x}")]
    Invalid(u32),

    /// Package id does not fit into 11 bits.
    #[error("package id {0:#x} exceeds {MAX_PACKAGE_ID:#x}")]
    PackageIdOutOfRange(u16),

    /// Entry index does not fit into 13 bits.
    #[error("entry index {0:#x} exceeds {MAX_ENTRY_INDEX:#x}")]
    EntryIndexOutOfRange(u16),

    /// Text is not a 1..=8 digit hexadecimal number.
    #[error("malformed hash text {0:?}")]
    Malformed(String),
}

/// 32-bit package-relative hash (`FileHash` in Tiger parlance).
#[derive(
    BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[brw(little)]
pub struct TagHash(pub u32);

impl TagHash {
    /// The canonical absent hash.
    pub const NONE: Self = Self(u32::MAX);

    /// Wrap a raw 32-bit value without validation.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Pack a package id and entry index.
    pub fn encode(package_id: u16, entry_index: u16) -> Result<Self, HashError> {
        if package_id > MAX_PACKAGE_ID {
            return Err(HashError::PackageIdOutOfRange(package_id));
        }
        if entry_index > MAX_ENTRY_INDEX {
            return Err(HashError::EntryIndexOutOfRange(entry_index));
        }

        // Package bit 10 carries through bit 23 of the base into bit 24.
        Ok(Self(
            TAG_HASH_BASE + (u32::from(package_id) << 13) + u32::from(entry_index),
        ))
    }

    /// Split into `(package_id, entry_index)`.
    pub fn decode(self) -> Result<(u16, u16), HashError> {
        if !self.is_valid() {
            return Err(HashError::Invalid(self.0));
        }
        Ok((self.package_id(), self.entry_index()))
    }

    /// Package id bits. Meaningless for invalid hashes.
    pub const fn package_id(self) -> u16 {
        (((self.0 >> 13) & 0x3FF) | ((self.0 & 0x0100_0000) >> 14)) as u16
    }

    /// Entry index bits. Meaningless for invalid hashes.
    pub const fn entry_index(self) -> u16 {
        (self.0 & 0x1FFF) as u16
    }

    /// `false` for both absent sentinels.
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != u32::MAX
    }

    /// Raw little-endian value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for TagHash {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<u32> for TagHash {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<TagHash> for u32 {
    fn from(hash: TagHash) -> Self {
        hash.0
    }
}

/// Displays in the byte order the game tools use, e.g. `2D3BAE80`.
impl fmt::Display for TagHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0.swap_bytes())
    }
}

impl fmt::Debug for TagHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagHash({self})")
    }
}

impl FromStr for TagHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_text_hash(s, false)
    }
}

/// Parse a user-supplied hexadecimal hash.
///
/// Text ending in `80` or `81` is the display form of a package hash and is
/// byte-swapped back into the in-memory value. `assume_big_endian` forces the
/// swap for any other text.
pub fn parse_text_hash(text: &str, assume_big_endian: bool) -> Result<TagHash, HashError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 8 {
        return Err(HashError::Malformed(text.to_string()));
    }

    let value =
        u32::from_str_radix(digits, 16).map_err(|_| HashError::Malformed(text.to_string()))?;

    if digits.ends_with("80") || digits.ends_with("81") || assume_big_endian {
        Ok(TagHash(value.swap_bytes()))
    } else {
        Ok(TagHash(value))
    }
}

/// 64-bit hash that survives repackaging.
#[derive(
    BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[brw(little)]
pub struct TagHash64(pub u64);

impl TagHash64 {
    /// The canonical absent hash.
    pub const NONE: Self = Self(u64::MAX);

    /// Wrap a raw 64-bit value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// `false` for `0` and all ones.
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != u64::MAX
    }

    /// Raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TagHash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl fmt::Debug for TagHash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagHash64({self})")
    }
}

/// Compute the FNV-1 32-bit hash (multiply, then xor).
pub fn fnv1_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV1_OFFSET_BASIS, |hash, &byte| {
        hash.wrapping_mul(FNV1_PRIME) ^ u32::from(byte)
    })
}

/// FNV-1 hash of a string value.
#[derive(
    BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[brw(little)]
pub struct StringHash(pub u32);

impl StringHash {
    /// Hash of the empty string, used as the "no string" marker.
    pub const NONE: Self = Self(FNV1_OFFSET_BASIS);

    /// Hash a text value.
    pub fn from_text(text: &str) -> Self {
        Self(fnv1_32(text.as_bytes()))
    }

    /// `false` for `0` and for the hash of the empty string.
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != FNV1_OFFSET_BASIS
    }
}

impl fmt::Display for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({self})")
    }
}

/// Any identifier found in tag data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentId {
    /// Package-relative hash.
    Local(TagHash),
    /// Repackaging-stable hash, needs translation.
    Global(TagHash64),
    /// Text hash, addresses no bytes.
    String(StringHash),
}

impl ContentId {
    /// The wide hash form stored in tag data: `hash32`, `is_hash32`, `hash64`.
    pub fn from_wide(hash32: u32, is_hash32: u32, hash64: u64) -> Self {
        if is_hash32 == 1 {
            Self::Local(TagHash(hash32))
        } else {
            Self::Global(TagHash64(hash64))
        }
    }

    /// `true` when the identifier is one of its shape's sentinels.
    pub const fn is_absent(&self) -> bool {
        match self {
            Self::Local(hash) => !hash.is_valid(),
            Self::Global(hash) => !hash.is_valid(),
            Self::String(hash) => !hash.is_valid(),
        }
    }
}

impl From<TagHash> for ContentId {
    fn from(hash: TagHash) -> Self {
        Self::Local(hash)
    }
}

impl From<TagHash64> for ContentId {
    fn from(hash: TagHash64) -> Self {
        Self::Global(hash)
    }
}

impl From<StringHash> for ContentId {
    fn from(hash: StringHash) -> Self {
        Self::String(hash)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(hash) => write!(f, "{hash}"),
            Self::Global(hash) => write!(f, "{hash}"),
            Self::String(hash) => write!(f, "str:{hash}"),
        }
    }
}

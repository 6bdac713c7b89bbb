//! Binary formats for Tiger game packages
//!
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::float_cmp)] // Binary format requirements
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate holds everything needed to turn package bytes into structured
//! data without touching the filesystem:
//!
//! - **Hashes** ([`hash`]): encode, decode and parse the 32-bit package
//!   hashes, 64-bit stable hashes and FNV-1 string hashes
//! - **Cursor** ([`cursor`]): little-endian reader with relative-offset arrays
//! - **Schemas** ([`schema`]): static field layouts decoded into records
//! - **Packages** ([`package`]): symmetric parser and builder for package files
//!
//! # Example
//!
//! ```rust
//! use tiger_formats::hash::{TagHash, parse_text_hash};
//!
//! let hash = TagHash::encode(0x171, 0x1B2D).expect("in range");
//! assert_eq!(hash.to_string(), "2D3BAE80");
//! assert_eq!(parse_text_hash("2D3BAE80", false).expect("parse"), hash);
//! ```

pub mod cursor;
pub mod hash;
pub mod package;
pub mod schema;

pub use cursor::{BinaryCursor, CursorError};
pub use hash::{ContentId, HashError, StringHash, TagHash, TagHash64};
pub use schema::{Field, FieldType, Record, Schema, Value};

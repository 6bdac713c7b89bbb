//! The [`Tag`] trait implemented by every domain type

use crate::Result;
use crate::graph::ResolveContext;
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use tiger_formats::{Record, Schema};

/// A domain type decoded from one package entry.
///
/// The graph reads the entry bytes, decodes the header with [`Tag::SCHEMA`]
/// and hands the record to [`Tag::assemble`], which builds the value and
/// resolves referenced tags through `ctx`. Assembly must only fill the
/// value's own fields; the graph owns caching.
#[async_trait]
pub trait Tag: Any + Send + Sync + Sized {
    /// Human readable type name
    const NAME: &'static str;

    /// Class hash stored in the entry table for this type
    const TYPE_TAG: u32;

    /// Header layout at the start of the entry
    const SCHEMA: &'static Schema;

    /// Build the value from its decoded header and the raw entry bytes
    async fn assemble(record: Record, bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self>;
}

//! Command implementations

pub mod entity;
pub mod hash;
pub mod meta;
pub mod stats;

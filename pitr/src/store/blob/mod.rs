//! Object storage abstractions and implementations.
//!
//! Provides the [`BlobStore`] trait used to archive binlog payloads, their GTID set sidecars and
//! the collection cursor.

mod base;
pub mod memory;
pub mod s3;

pub use base::{BlobReader, BlobStore};

//! Incremental collection of MySQL binary logs into object storage for point-in-time recovery.
//!
//! A [`collector::Collector`] lists the binlogs of a cluster member, streams every binlog that
//! is not archived yet into a [`store::blob::BlobStore`] together with its GTID set, and
//! persists a cursor after each binlog so that the next run resumes where this one stopped.

pub mod archive;
pub mod collector;
pub mod concurrency;
pub mod error;
pub mod extract;
#[cfg(feature = "failpoints")]
pub mod failpoints;
mod macros;
pub mod source;
pub mod store;
pub mod types;

//! Access to the binlogs of the cluster.
//!
//! Provides the [`BinlogSource`] trait, which lists the binlogs of the cluster and maps them to
//! and from GTID sets, together with the discovery of the cluster member to read them from.

mod base;
pub mod host;
pub mod memory;
pub mod mysql;

pub use base::BinlogSource;

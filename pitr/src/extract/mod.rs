//! Streaming extraction of binlog payloads.
//!
//! Provides the [`BinlogExtractor`] trait and its `mysqlbinlog` based implementation, which
//! streams a payload through a named pipe without ever holding it entirely in memory.

mod base;
mod conduit;
pub mod mysqlbinlog;

pub use base::BinlogExtractor;
pub use conduit::Conduit;

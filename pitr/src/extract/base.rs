use std::future::Future;
use tokio::io::AsyncRead;

use crate::error::PitrResult;
use crate::types::BinlogName;

/// This trait represents a way of reading the raw payload of a binlog.
pub trait BinlogExtractor {
    /// Owned, sequential reader over a binlog payload.
    ///
    /// A failure of the extraction surfaces as a read error, at the latest when the end of the
    /// payload is reached, so a consumer never mistakes a truncated payload for a complete one.
    type Stream: AsyncRead + Unpin + Send;

    /// Starts the extraction of `binlog` and returns a reader over its payload.
    fn open(&self, binlog: &BinlogName) -> impl Future<Output = PitrResult<Self::Stream>> + Send;
}

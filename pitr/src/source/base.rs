use std::future::Future;

use crate::error::PitrResult;
use crate::types::{BinlogName, GtidSet};

/// This trait represents the cluster member the binlogs are collected from.
pub trait BinlogSource {
    /// Returns the host the binlogs are read from, which is also the host the payloads are
    /// exported from.
    fn host(&self) -> &str;

    /// Lists the binlogs currently present on the server, oldest first.
    ///
    /// Every call returns a fresh snapshot of the server inventory.
    fn list_binlogs(&self) -> impl Future<Output = PitrResult<Vec<BinlogName>>> + Send;

    /// Returns the GTID set contained in `binlog`, which is empty when the binlog holds no
    /// committed transaction.
    fn gtid_set(&self, binlog: &BinlogName) -> impl Future<Output = PitrResult<GtidSet>> + Send;

    /// Returns the binlog holding `gtid_set`, or `None` when the set is empty or unknown to the
    /// server.
    fn binlog_name(
        &self,
        gtid_set: &GtidSet,
    ) -> impl Future<Output = PitrResult<Option<BinlogName>>> + Send;
}

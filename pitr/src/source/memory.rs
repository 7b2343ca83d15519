use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::source::BinlogSource;
use crate::types::{BinlogName, GtidSet};

/// Call made to a [`MemoryBinlogSource`], recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    ListBinlogs,
    GtidSet(BinlogName),
    BinlogName(GtidSet),
}

#[derive(Debug, Default)]
struct Inner {
    binlogs: Vec<(BinlogName, GtidSet)>,
    calls: Vec<SourceCall>,
}

/// In-memory [`BinlogSource`] with a scripted binlog inventory.
///
/// Binlogs are listed in the order they were pushed.
#[derive(Debug, Clone)]
pub struct MemoryBinlogSource {
    host: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBinlogSource {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_owned(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Appends a binlog with its GTID set to the inventory.
    pub async fn push_binlog(&self, name: impl Into<BinlogName>, gtid_set: impl Into<GtidSet>) {
        let mut inner = self.inner.lock().await;
        inner.binlogs.push((name.into(), gtid_set.into()));
    }

    /// Removes a binlog from the inventory, e.g. to simulate a purge on the server.
    pub async fn purge_binlog(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.binlogs.retain(|(n, _)| n.as_str() != name);
    }

    pub async fn calls(&self) -> Vec<SourceCall> {
        let inner = self.inner.lock().await;
        inner.calls.clone()
    }
}

impl Default for MemoryBinlogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BinlogSource for MemoryBinlogSource {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list_binlogs(&self) -> PitrResult<Vec<BinlogName>> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(SourceCall::ListBinlogs);

        Ok(inner.binlogs.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn gtid_set(&self, binlog: &BinlogName) -> PitrResult<GtidSet> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(SourceCall::GtidSet(binlog.clone()));

        inner
            .binlogs
            .iter()
            .find(|(name, _)| name == binlog)
            .map(|(_, set)| set.clone())
            .ok_or_else(|| {
                pitr_error!(
                    ErrorKind::SourceQueryFailed,
                    "Binlog does not exist",
                    binlog
                )
            })
    }

    async fn binlog_name(&self, gtid_set: &GtidSet) -> PitrResult<Option<BinlogName>> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(SourceCall::BinlogName(gtid_set.clone()));

        if gtid_set.is_empty() {
            return Ok(None);
        }

        Ok(inner
            .binlogs
            .iter()
            .find(|(_, set)| set == gtid_set)
            .map(|(name, _)| name.clone()))
    }
}

use tokio::io::AsyncRead;
use tracing::info;

use crate::error::PitrResult;
use crate::store::blob::BlobStore;
use crate::types::{BinlogName, GtidSet};

/// Writes binlog payloads and their GTID set sidecars to a [`BlobStore`].
#[derive(Debug, Clone)]
pub struct Archiver<B> {
    store: B,
}

impl<B> Archiver<B>
where
    B: BlobStore,
{
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// Streams the payload of `binlog` from `reader` into an object named after the binlog.
    ///
    /// Returns the number of bytes stored.
    pub async fn put_binlog<R>(&self, binlog: &BinlogName, reader: R) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let size = self.store.put_object(binlog.as_str(), reader).await?;
        info!(%binlog, size, "archived binlog payload");

        Ok(size)
    }

    /// Stores the GTID set of `binlog` in its sidecar object.
    pub async fn put_gtid_set(&self, binlog: &BinlogName, gtid_set: &GtidSet) -> PitrResult<()> {
        self.store
            .put_object(&binlog.gtid_set_object_name(), gtid_set.as_str().as_bytes())
            .await?;
        info!(%binlog, %gtid_set, "archived binlog GTID set");

        Ok(())
    }
}

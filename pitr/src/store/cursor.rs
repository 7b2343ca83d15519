use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::store::blob::BlobStore;
use crate::types::{GtidSet, LAST_SET_OBJECT_NAME};

/// Reads and writes the collection cursor: the GTID set of the last archived binlog.
///
/// The cursor lives in a single object of the blob store, so it survives restarts of the
/// collector and is the only state a new run resumes from.
#[derive(Debug, Clone)]
pub struct CursorStore<B> {
    store: B,
}

impl<B> CursorStore<B>
where
    B: BlobStore,
{
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// Returns the persisted cursor, or an empty [`GtidSet`] if nothing was archived yet.
    pub async fn get(&self) -> PitrResult<GtidSet> {
        let mut reader = match self.store.get_object(LAST_SET_OBJECT_NAME).await {
            Ok(reader) => reader,
            Err(err) if err.is_not_found() => {
                info!("no cursor found in storage, collecting from the first binlog");

                return Ok(GtidSet::empty());
            }
            Err(err) => return Err(err),
        };

        let mut content = String::new();
        reader.read_to_string(&mut content).await.map_err(|err| {
            pitr_error!(
                ErrorKind::StorageReadFailed,
                "Failed to read cursor object",
                err
            )
        })?;

        let cursor = GtidSet::new(content.trim());
        debug!(%cursor, "loaded cursor");

        Ok(cursor)
    }

    /// Overwrites the persisted cursor with `gtid_set`.
    pub async fn set(&self, gtid_set: &GtidSet) -> PitrResult<()> {
        self.store
            .put_object(LAST_SET_OBJECT_NAME, gtid_set.as_str().as_bytes())
            .await?;

        debug!(cursor = %gtid_set, "stored cursor");

        Ok(())
    }
}

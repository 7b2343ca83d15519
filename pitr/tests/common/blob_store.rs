use pitr::bail;
use pitr::error::{ErrorKind, PitrResult};
use pitr::store::blob::{BlobReader, BlobStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncRead;

#[derive(Debug, Clone)]
pub enum FaultType {
    Panic,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    pub get_object: Option<FaultType>,
    pub put_object: Option<FaultType>,
    /// Restricts `put_object` faults to writes of this object.
    pub put_object_name: Option<String>,
}

/// [`BlobStore`] wrapper failing selected operations, used to simulate crashes and outages.
#[derive(Debug, Clone)]
pub struct FaultInjectingBlobStore<B> {
    inner: B,
    config: Arc<FaultConfig>,
    faults: Arc<AtomicUsize>,
}

impl<B> FaultInjectingBlobStore<B> {
    pub fn wrap(inner: B, config: FaultConfig) -> Self {
        Self {
            inner,
            config: Arc::new(config),
            faults: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn get_inner(&self) -> &B {
        &self.inner
    }

    /// Returns how many faults were triggered so far.
    pub fn triggered_faults(&self) -> usize {
        self.faults.load(Ordering::SeqCst)
    }

    fn trigger_fault(&self, fault: &Option<FaultType>) -> PitrResult<()> {
        let Some(fault_type) = fault else {
            return Ok(());
        };

        self.faults.fetch_add(1, Ordering::SeqCst);
        match fault_type {
            FaultType::Panic => panic!("Fault injection: panic triggered"),
            FaultType::Error => bail!(
                ErrorKind::StorageWriteFailed,
                "Fault injection: error triggered"
            ),
        }
    }
}

impl<B> BlobStore for FaultInjectingBlobStore<B>
where
    B: BlobStore + Send + Sync,
{
    async fn get_object(&self, name: &str) -> PitrResult<BlobReader> {
        self.trigger_fault(&self.config.get_object)?;
        self.inner.get_object(name).await
    }

    async fn put_object<R>(&self, name: &str, reader: R) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let targeted = self
            .config
            .put_object_name
            .as_deref()
            .is_none_or(|target| target == name);
        if targeted {
            self.trigger_fault(&self.config.put_object)?;
        }

        self.inner.put_object(name, reader).await
    }
}

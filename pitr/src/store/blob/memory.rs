use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::store::blob::{BlobReader, BlobStore};

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Vec<u8>>,
    writes: Vec<String>,
}

/// In-memory [`BlobStore`], used in tests and for dry runs.
///
/// Besides the objects themselves it keeps the ordered list of successful writes, which makes
/// it possible to assert on the exact sequence of uploads performed by the collector.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the object named `name`, if present.
    pub async fn object(&self, name: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().await;
        inner.objects.get(name).cloned()
    }

    /// Returns the object named `name` decoded as UTF-8, if present.
    pub async fn object_string(&self, name: &str) -> Option<String> {
        self.object(name)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns the names of all stored objects.
    pub async fn object_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut names: Vec<String> = inner.objects.keys().cloned().collect();
        names.sort();

        names
    }

    /// Returns the names of all successful writes, in order, including overwrites.
    pub async fn writes(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.writes.clone()
    }

    /// Stores an object directly, bypassing the write log.
    pub async fn insert(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().await;
        inner.objects.insert(name.into(), content.into());
    }
}

impl BlobStore for MemoryBlobStore {
    async fn get_object(&self, name: &str) -> PitrResult<BlobReader> {
        let inner = self.inner.lock().await;
        let Some(content) = inner.objects.get(name) else {
            return Err(pitr_error!(
                ErrorKind::ObjectNotFound,
                "Object does not exist",
                name
            ));
        };

        Ok(Box::new(Cursor::new(content.clone())))
    }

    async fn put_object<R>(&self, name: &str, mut reader: R) -> PitrResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        // The content is only published once fully read, a failing reader leaves no object.
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;
        let size = content.len() as u64;

        let mut inner = self.inner.lock().await;
        inner.objects.insert(name.to_owned(), content);
        inner.writes.push(name.to_owned());

        debug!(object = name, size, "stored object in memory");

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("source went away")))
        }
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get_object("missing").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn put_then_get_returns_content() {
        let store = MemoryBlobStore::new();
        let size = store
            .put_object("binlog.000001", &b"payload"[..])
            .await
            .unwrap();
        assert_eq!(size, 7);

        let mut reader = store.get_object("binlog.000001").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "payload");
        assert_eq!(store.writes().await, vec!["binlog.000001".to_string()]);
    }

    #[tokio::test]
    async fn failing_reader_leaves_no_object() {
        let store = MemoryBlobStore::new();
        let err = store.put_object("binlog.000001", FailingReader).await;
        assert!(err.is_err());
        assert!(store.object("binlog.000001").await.is_none());
        assert!(store.writes().await.is_empty());
    }
}

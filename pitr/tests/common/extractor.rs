use pitr::bail;
use pitr::error::{ErrorKind, PitrError, PitrResult};
use pitr::extract::BinlogExtractor;
use pitr::pitr_error;
use pitr::types::BinlogName;
use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::Mutex;

/// Returns the payload [`TestExtractor`] produces for `binlog`.
pub fn payload_of(binlog: &str) -> Vec<u8> {
    format!("payload of {binlog}").into_bytes()
}

#[derive(Debug, Default)]
struct Inner {
    opened: Vec<BinlogName>,
    failing_open: HashSet<String>,
    failing_stream: HashSet<String>,
}

/// [`BinlogExtractor`] serving synthetic payloads, recording which binlogs were opened.
#[derive(Debug, Clone, Default)]
pub struct TestExtractor {
    inner: Arc<Mutex<Inner>>,
}

impl TestExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes opening `binlog` fail, as when the exporter cannot be started.
    pub async fn fail_open(&self, binlog: &str) {
        self.inner.lock().await.failing_open.insert(binlog.to_owned());
    }

    /// Makes the stream of `binlog` fail after its payload, as when the exporter reports an error.
    pub async fn fail_stream(&self, binlog: &str) {
        self.inner
            .lock()
            .await
            .failing_stream
            .insert(binlog.to_owned());
    }

    /// Lets every binlog be extracted again.
    pub async fn heal(&self) {
        let mut inner = self.inner.lock().await;
        inner.failing_open.clear();
        inner.failing_stream.clear();
    }

    pub async fn opened(&self) -> Vec<BinlogName> {
        self.inner.lock().await.opened.clone()
    }
}

impl BinlogExtractor for TestExtractor {
    type Stream = TestStream;

    async fn open(&self, binlog: &BinlogName) -> PitrResult<TestStream> {
        let mut inner = self.inner.lock().await;
        inner.opened.push(binlog.clone());

        if inner.failing_open.contains(binlog.as_str()) {
            bail!(
                ErrorKind::ExtractionFailed,
                "Failed to start mysqlbinlog",
                binlog
            );
        }

        let error = inner.failing_stream.contains(binlog.as_str()).then(|| {
            pitr_error!(
                ErrorKind::ExtractionFailed,
                "mysqlbinlog reported an error",
                "ERROR: Got error reading packet from server"
            )
        });

        Ok(TestStream {
            payload: payload_of(binlog.as_str()),
            position: 0,
            error,
        })
    }
}

/// Reader over a synthetic payload, optionally failing once the payload has been read.
#[derive(Debug)]
pub struct TestStream {
    payload: Vec<u8>,
    position: usize,
    error: Option<PitrError>,
}

impl AsyncRead for TestStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        let remaining = &this.payload[this.position..];
        if !remaining.is_empty() {
            let len = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..len]);
            this.position += len;

            return Poll::Ready(Ok(()));
        }

        match this.error.take() {
            Some(err) => Poll::Ready(Err(err.into())),
            None => Poll::Ready(Ok(())),
        }
    }
}

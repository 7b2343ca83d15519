//! Extraction of binlogs with the `mysqlbinlog` client.
//!
//! `mysqlbinlog --raw` writes the binlog to `<result-file prefix><binlog name>`. Creating a named
//! pipe at that path turns the write into a stream the collector reads from while the exporter
//! is still downloading, so a binlog never has to fit in memory or on local disk.

use pitr_config::SerializableSecretString;
use pitr_config::shared::{ExtractorConfig, SourceConfig};
use secrecy::ExposeSecret;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::net::unix::pipe;
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bail;
use crate::error::{ErrorKind, PitrError, PitrResult};
use crate::extract::{BinlogExtractor, Conduit};
use crate::pitr_error;
use crate::types::BinlogName;

/// Warning printed by `mysqlbinlog` whenever a password is passed as an argument.
pub const PASSWORD_WARNING: &str =
    "mysqlbinlog: [Warning] Using a password on the command line interface can be insecure.";

/// [`BinlogExtractor`] streaming binlogs from a server with `mysqlbinlog --read-from-remote-server`.
#[derive(Debug, Clone)]
pub struct MysqlBinlogExtractor {
    program: PathBuf,
    conduit_dir: PathBuf,
    host: String,
    port: u16,
    username: String,
    password: SerializableSecretString,
}

impl MysqlBinlogExtractor {
    pub fn new(host: impl Into<String>, source: &SourceConfig, config: &ExtractorConfig) -> Self {
        Self {
            program: config.mysqlbinlog_path.clone(),
            conduit_dir: config.conduit_dir.clone(),
            host: host.into(),
            port: source.port,
            username: source.username.clone(),
            password: source.password.clone(),
        }
    }

    fn command(&self, binlog: &BinlogName) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-R")
            .arg("--raw")
            .arg(format!("-h{}", self.host))
            .arg(format!("-P{}", self.port))
            .arg(format!("-u{}", self.username))
            .arg(format!("-p{}", self.password.expose_secret()))
            // Joining an empty component keeps the trailing separator, the binlog name is
            // appended to the prefix verbatim.
            .arg(format!("--result-file={}", self.conduit_dir.join("").display()))
            .arg(binlog.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command
    }
}

impl BinlogExtractor for MysqlBinlogExtractor {
    type Stream = MysqlBinlogStream;

    async fn open(&self, binlog: &BinlogName) -> PitrResult<MysqlBinlogStream> {
        let conduit = Conduit::create(self.conduit_dir.join(binlog.as_str()))?;

        // Opening both ends never blocks and keeps the pipe alive until the exporter exits, the
        // end of the payload is detected from the exit of the exporter instead.
        let receiver = pipe::OpenOptions::new()
            .read_write(true)
            .open_receiver(conduit.path())
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::ConduitError,
                    "Failed to open conduit",
                    format!("{}: {err}", conduit.path().display())
                )
            })?;

        let mut child = self.command(binlog).spawn().map_err(|err| {
            pitr_error!(
                ErrorKind::ExtractionFailed,
                "Failed to start mysqlbinlog",
                format!("{}: {err}", self.program.display())
            )
        })?;

        let Some(stderr) = child.stderr.take() else {
            bail!(
                ErrorKind::ExtractionFailed,
                "mysqlbinlog stderr is not captured"
            );
        };

        info!(%binlog, host = self.host, "started binlog extraction");

        let exporter = tokio::spawn(supervise_exporter(child, stderr));

        Ok(MysqlBinlogStream {
            binlog: binlog.clone(),
            receiver,
            exporter,
            conduit: Some(conduit),
            state: StreamState::Streaming,
        })
    }
}

#[derive(Debug)]
enum StreamState {
    /// The exporter is running, data is read as it arrives.
    Streaming,
    /// The exporter exited, what is left in the pipe is drained before reporting its outcome.
    Draining(Option<PitrResult<()>>),
    Finished,
    /// The extraction failed, every further read returns the failure.
    Failed(PitrError),
}

/// Reader over the payload written by a `mysqlbinlog` process.
///
/// End of stream is only reported once the exporter exited successfully and the conduit has been
/// removed. Any failure of the exporter is returned as a read error instead, on this read and on
/// every later one.
#[derive(Debug)]
pub struct MysqlBinlogStream {
    binlog: BinlogName,
    receiver: pipe::Receiver,
    exporter: JoinHandle<PitrResult<()>>,
    conduit: Option<Conduit>,
    state: StreamState,
}

impl MysqlBinlogStream {
    fn finish(&mut self, outcome: PitrResult<()>) -> io::Result<()> {
        let conduit_removed = match self.conduit.take() {
            Some(conduit) => conduit.close(),
            None => Ok(()),
        };

        match outcome.and(conduit_removed) {
            Ok(()) => {
                debug!(binlog = %self.binlog, "binlog extraction finished");
                self.state = StreamState::Finished;
                Ok(())
            }
            Err(err) => {
                warn!(binlog = %self.binlog, error = %err, "binlog extraction failed");
                self.state = StreamState::Failed(err.clone());
                Err(err.into())
            }
        }
    }
}

impl AsyncRead for MysqlBinlogStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            match &mut this.state {
                StreamState::Streaming => {
                    if let Poll::Ready(result) = Pin::new(&mut this.receiver).poll_read(cx, buf) {
                        return Poll::Ready(result);
                    }

                    let joined = ready!(Pin::new(&mut this.exporter).poll(cx));
                    let outcome = joined.unwrap_or_else(|err| {
                        Err(pitr_error!(
                            ErrorKind::ExtractionFailed,
                            "mysqlbinlog supervisor panicked",
                            err
                        ))
                    });
                    this.state = StreamState::Draining(Some(outcome));
                }
                StreamState::Draining(outcome) => {
                    match this.receiver.try_read(buf.initialize_unfilled()) {
                        Ok(read) if read > 0 => {
                            buf.advance(read);
                            return Poll::Ready(Ok(()));
                        }
                        Ok(_) => {}
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                        Err(err) => return Poll::Ready(Err(err)),
                    }

                    let outcome = outcome.take().unwrap_or(Ok(()));
                    return Poll::Ready(this.finish(outcome));
                }
                StreamState::Finished => return Poll::Ready(Ok(())),
                StreamState::Failed(err) => return Poll::Ready(Err(err.clone().into())),
            }
        }
    }
}

impl Drop for MysqlBinlogStream {
    fn drop(&mut self) {
        // Dropping the supervisor drops the child, which kills it.
        self.exporter.abort();
    }
}

/// Waits for the exporter to exit and validates how it went.
async fn supervise_exporter(mut child: Child, mut stderr: ChildStderr) -> PitrResult<()> {
    let mut diagnostics = Vec::new();
    let (status, read) = tokio::join!(child.wait(), stderr.read_to_end(&mut diagnostics));

    let status = status.map_err(|err| {
        pitr_error!(
            ErrorKind::ExtractionFailed,
            "Failed to wait for mysqlbinlog",
            err
        )
    })?;
    read.map_err(PitrError::from)?;

    check_exporter_outcome(status, &String::from_utf8_lossy(&diagnostics))
}

/// Decides whether the exporter succeeded from its exit status and its diagnostics output.
///
/// Every non-blank diagnostics line other than [`PASSWORD_WARNING`] is treated as an error, even
/// when the exporter exits successfully.
pub fn check_exporter_outcome(status: ExitStatus, diagnostics: &str) -> PitrResult<()> {
    let unexpected: Vec<&str> = diagnostics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != PASSWORD_WARNING)
        .collect();

    if !unexpected.is_empty() {
        bail!(
            ErrorKind::ExtractionFailed,
            "mysqlbinlog reported an error",
            unexpected.join("\n")
        );
    }

    if !status.success() {
        bail!(
            ErrorKind::ExtractionFailed,
            "mysqlbinlog exited with an error",
            status
        );
    }

    Ok(())
}

use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::archive::Archiver;
use crate::concurrency::shutdown::{ShutdownRx, is_shutdown_requested};
use crate::error::{PitrError, PitrResult};
use crate::extract::BinlogExtractor;
#[cfg(feature = "failpoints")]
use crate::failpoints::{ARCHIVE_BINLOG__AFTER_PAYLOAD_UPLOAD, pitr_fail_point};
use crate::source::BinlogSource;
use crate::store::blob::BlobStore;
use crate::store::cursor::CursorStore;
use crate::types::{BinlogName, GtidSet};

/// What happened to a single binlog during a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinlogOutcome {
    /// Payload, GTID set and cursor were stored.
    Archived,
    /// The binlog holds no transactions and was left alone.
    SkippedEmpty,
    /// The binlog's GTID set is the cursor itself, so it is already in the archive.
    AlreadyArchived,
}

/// Summary of a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub archived: Vec<BinlogName>,
    pub skipped: Vec<BinlogName>,
    /// Cursor persisted at the end of the run.
    pub cursor: GtidSet,
    /// Whether the run stopped early because a shutdown was requested.
    pub interrupted: bool,
}

/// Archives the binlogs of a cluster member that are not in storage yet.
///
/// Binlogs are processed one at a time in ascending order. For each of them the payload is
/// stored first, then its GTID set, then the cursor, so the cursor never points past a binlog
/// that is not fully archived. A run stops at the first failure and the next run resumes from
/// the binlog that failed.
#[derive(Debug)]
pub struct Collector<S, E, B> {
    source: S,
    extractor: E,
    cursor_store: CursorStore<B>,
    archiver: Archiver<B>,
}

impl<S, E, B> Collector<S, E, B>
where
    S: BinlogSource,
    E: BinlogExtractor,
    B: BlobStore + Clone,
{
    pub fn new(source: S, extractor: E, store: B) -> Self {
        Self {
            source,
            extractor,
            cursor_store: CursorStore::new(store.clone()),
            archiver: Archiver::new(store),
        }
    }

    /// Runs a single collection pass.
    ///
    /// `shutdown_rx` is checked before every binlog, a binlog that started being archived is
    /// always completed.
    pub async fn run(&self, shutdown_rx: &ShutdownRx) -> PitrResult<CollectReport> {
        let span = info_span!("collect", host = self.source.host());

        self.collect(shutdown_rx).instrument(span).await
    }

    /// Runs collection passes every `interval` until a shutdown is requested.
    ///
    /// A failed pass is logged and retried on the next tick. Dropping every shutdown sender is
    /// not a shutdown request, collection goes on.
    pub async fn run_periodically(
        &self,
        interval: Duration,
        mut shutdown_rx: ShutdownRx,
    ) -> PitrResult<()> {
        let mut shutdown_open = true;

        loop {
            match self.run(&shutdown_rx).await {
                Ok(report) if report.interrupted => {
                    info!("shutdown requested, stopping periodic collection");
                    return Ok(());
                }
                Ok(report) => {
                    info!(
                        archived = report.archived.len(),
                        skipped = report.skipped.len(),
                        cursor = %report.cursor,
                        "collection pass completed"
                    );
                }
                Err(err) => {
                    error!(error = %err, "collection pass failed, retrying on next tick");
                }
            }

            let tick = tokio::time::sleep(interval);
            tokio::pin!(tick);

            loop {
                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed(), if shutdown_open => {
                        if changed.is_ok() {
                            info!("shutdown requested, stopping periodic collection");
                            return Ok(());
                        }

                        warn!("shutdown channel closed, collection can no longer be stopped");
                        shutdown_open = false;
                    }
                    _ = &mut tick => break,
                }
            }
        }
    }

    async fn collect(&self, shutdown_rx: &ShutdownRx) -> PitrResult<CollectReport> {
        let mut cursor = self.cursor_store.get().await?;

        let resume_from = self.source.binlog_name(&cursor).await?;
        match &resume_from {
            Some(binlog) => info!(%cursor, %binlog, "resuming collection"),
            None if cursor.is_empty() => info!("collecting from the first binlog"),
            None => warn!(%cursor, "cursor matches no binlog, collecting from the first binlog"),
        }

        let mut binlogs = self.source.list_binlogs().await?;
        binlogs.sort();
        let mut report = CollectReport::default();
        let mut reached = resume_from.is_none();

        for binlog in binlogs {
            if !reached {
                if resume_from.as_ref() != Some(&binlog) {
                    debug!(%binlog, "binlog precedes cursor, skipping");
                    continue;
                }
                reached = true;
            }

            if is_shutdown_requested(shutdown_rx) {
                info!(%binlog, "shutdown requested, stopping before binlog");
                report.interrupted = true;
                break;
            }

            let (next_cursor, outcome) = self.archive_binlog(&binlog, cursor).await?;
            cursor = next_cursor;

            match outcome {
                BinlogOutcome::Archived => report.archived.push(binlog),
                BinlogOutcome::SkippedEmpty | BinlogOutcome::AlreadyArchived => {
                    report.skipped.push(binlog)
                }
            }
        }

        info!(
            archived = report.archived.len(),
            skipped = report.skipped.len(),
            %cursor,
            "collection finished"
        );
        report.cursor = cursor;

        Ok(report)
    }

    /// Archives `binlog` given the current `cursor` and returns the cursor to continue with.
    pub async fn archive_binlog(
        &self,
        binlog: &BinlogName,
        cursor: GtidSet,
    ) -> PitrResult<(GtidSet, BinlogOutcome)> {
        let gtid_set = self.source.gtid_set(binlog).await?;

        if gtid_set.is_empty() {
            debug!(%binlog, "binlog has an empty GTID set, skipping");
            return Ok((cursor, BinlogOutcome::SkippedEmpty));
        }
        if gtid_set == cursor {
            debug!(%binlog, "binlog GTID set equals the cursor, skipping");
            return Ok((cursor, BinlogOutcome::AlreadyArchived));
        }

        let span = info_span!("archive_binlog", %binlog);
        async {
            let stream = self.extractor.open(binlog).await?;
            self.archiver.put_binlog(binlog, stream).await?;

            #[cfg(feature = "failpoints")]
            pitr_fail_point(ARCHIVE_BINLOG__AFTER_PAYLOAD_UPLOAD)?;

            self.archiver.put_gtid_set(binlog, &gtid_set).await?;
            self.cursor_store.set(&gtid_set).await?;

            Ok::<_, PitrError>((gtid_set, BinlogOutcome::Archived))
        }
        .instrument(span)
        .await
    }
}

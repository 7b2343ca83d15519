use pitr::collector::Collector;
use pitr::concurrency::shutdown::create_shutdown_channel;
use pitr::extract::mysqlbinlog::MysqlBinlogExtractor;
use pitr::source::host::HostResolver;
use pitr::source::mysql::MySqlBinlogSource;
use pitr::store::blob::s3::S3BlobStore;
use pitr_config::shared::{CollectorConfig, ExtractorConfig, SourceConfig, StorageConfig};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

type BinlogCollector = Collector<MySqlBinlogSource, MysqlBinlogExtractor, S3BlobStore>;

/// Starts the collector service with the provided configuration.
///
/// Connects to the object storage and to a synced member of the cluster, then collects binlogs
/// once, or periodically when an interval is configured.
pub async fn start_collector_with_config(collector_config: CollectorConfig) -> anyhow::Result<()> {
    info!("starting collector service");

    log_config(&collector_config);

    let store = S3BlobStore::new(&collector_config.storage).await?;
    store.check_connection().await?;

    let host = resolve_host(&collector_config.source).await?;
    let source = MySqlBinlogSource::connect(host.clone(), &collector_config.source).await?;
    let extractor =
        MysqlBinlogExtractor::new(host, &collector_config.source, &collector_config.extractor);

    let collector = Collector::new(source.clone(), extractor, store);
    let interval = collector_config
        .collect_interval_secs
        .map(Duration::from_secs);

    let result = start_collector(&collector, interval).await;
    source.close().await;
    result?;

    info!("collector service completed");

    Ok(())
}

fn log_config(config: &CollectorConfig) {
    log_source_config(&config.source);
    log_storage_config(&config.storage);
    log_extractor_config(&config.extractor);
    debug!(
        collect_interval_secs = config.collect_interval_secs,
        "collector config"
    );
}

fn log_source_config(config: &SourceConfig) {
    debug!(
        service_name = config.service_name,
        host = config.host,
        port = config.port,
        username = config.username,
        "source cluster config"
    );
}

fn log_storage_config(config: &StorageConfig) {
    debug!(
        endpoint = config.endpoint,
        region = config.region,
        bucket = config.bucket,
        prefix = config.prefix,
        part_size_bytes = config.part_size_bytes,
        force_path_style = config.force_path_style,
        "object storage config"
    );
}

fn log_extractor_config(config: &ExtractorConfig) {
    debug!(
        mysqlbinlog_path = %config.mysqlbinlog_path.display(),
        conduit_dir = %config.conduit_dir.display(),
        "extractor config"
    );
}

/// Returns the configured host, or resolves a synced primary member of the cluster service.
async fn resolve_host(config: &SourceConfig) -> anyhow::Result<String> {
    if let Some(host) = &config.host {
        info!(host, "using configured cluster member");

        return Ok(host.clone());
    }

    let host = HostResolver::new(&config.service_name).resolve().await?;

    Ok(host)
}

/// Runs the collector and handles graceful shutdown signals.
///
/// A signal stops the collector before the next binlog, a binlog being archived is completed
/// first so the cursor stays consistent with the archive.
#[tracing::instrument(skip(collector))]
async fn start_collector(
    collector: &BinlogCollector,
    interval: Option<Duration>,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let signal_tx = shutdown_tx.clone();
    let shutdown_handle = tokio::spawn(async move {
        // Kubernetes sends SIGTERM before SIGKILL during pod termination.
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT (Ctrl+C) received, shutting down collector");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down collector");
            }
        }

        if let Err(e) = signal_tx.shutdown() {
            warn!("failed to send shutdown signal: {:?}", e);
        }
    });

    let result = match interval {
        Some(interval) => collector.run_periodically(interval, shutdown_rx).await,
        None => collector.run(&shutdown_rx).await.map(|report| {
            info!(
                archived = report.archived.len(),
                skipped = report.skipped.len(),
                cursor = %report.cursor,
                interrupted = report.interrupted,
                "collection completed"
            );
        }),
    };

    shutdown_handle.abort();
    let _ = shutdown_handle.await;
    drop(shutdown_tx);

    result?;

    Ok(())
}

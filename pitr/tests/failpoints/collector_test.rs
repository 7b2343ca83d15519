use fail::FailScenario;
use pitr::collector::Collector;
use pitr::concurrency::shutdown::create_shutdown_channel;
use pitr::error::ErrorKind;
use pitr::failpoints::ARCHIVE_BINLOG__AFTER_PAYLOAD_UPLOAD;
use pitr::source::memory::MemoryBinlogSource;
use pitr::store::blob::memory::MemoryBlobStore;
use pitr::types::{GtidSet, LAST_SET_OBJECT_NAME};
use pitr_telemetry::init_test_tracing;

use crate::common::extractor::TestExtractor;

#[path = "../common/mod.rs"]
mod common;

#[tokio::test(flavor = "multi_thread")]
async fn crash_after_payload_upload_is_repaired_by_next_run() {
    let scenario = FailScenario::setup();
    fail::cfg(ARCHIVE_BINLOG__AFTER_PAYLOAD_UPLOAD, "1*return->off").unwrap();

    init_test_tracing();

    let source = MemoryBinlogSource::new();
    source.push_binlog("mysql-bin.000001", "uuid:1-10").await;
    source.push_binlog("mysql-bin.000002", "uuid:1-20").await;
    let extractor = TestExtractor::new();
    let blobs = MemoryBlobStore::new();
    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let collector = Collector::new(source, extractor.clone(), blobs.clone());

    // The first binlog is interrupted between its payload and its GTID set.
    let err = collector.run(&shutdown_rx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WithNoRetry);
    assert!(blobs.object("mysql-bin.000001").await.is_some());
    assert!(blobs.object("mysql-bin.000001-gtid-set").await.is_none());
    assert!(blobs.object(LAST_SET_OBJECT_NAME).await.is_none());

    let report = collector.run(&shutdown_rx).await.unwrap();

    assert_eq!(report.archived.len(), 2);
    assert_eq!(report.cursor, GtidSet::from("uuid:1-20"));
    assert_eq!(
        blobs.object_string("mysql-bin.000001-gtid-set").await.as_deref(),
        Some("uuid:1-10")
    );
    assert_eq!(extractor.opened().await.len(), 3);

    scenario.teardown();
}

use crate::config::load_collector_config;
use crate::core::start_collector_with_config;
use pitr_config::shared::CollectorConfig;
use pitr_telemetry::init_tracing;
use tracing::error;

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let collector_config = load_collector_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(collector_config))?;

    Ok(())
}

async fn async_main(collector_config: CollectorConfig) -> anyhow::Result<()> {
    if let Err(err) = start_collector_with_config(collector_config).await {
        error!("an error occurred in the collector: {err}");

        return Err(err);
    }

    Ok(())
}

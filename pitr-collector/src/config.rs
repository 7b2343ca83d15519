use pitr_config::load_config;
use pitr_config::shared::CollectorConfig;

/// Loads the [`CollectorConfig`] and validates it.
pub fn load_collector_config() -> anyhow::Result<CollectorConfig> {
    let config = load_config::<CollectorConfig>()?;
    config.validate()?;

    Ok(config)
}

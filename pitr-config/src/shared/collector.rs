use serde::{Deserialize, Serialize};

use crate::shared::{ExtractorConfig, SourceConfig, StorageConfig, ValidationError};

/// Configuration of the binlog collector service.
///
/// Typically deserialized with [`crate::load_config`] and validated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollectorConfig {
    /// Cluster the binlogs are collected from.
    pub source: SourceConfig,
    /// Object storage the binlogs are archived to.
    pub storage: StorageConfig,
    /// Payload extraction settings.
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Seconds between two collections. A single collection is performed when unset.
    #[serde(default)]
    pub collect_interval_secs: Option<u64>,
}

impl CollectorConfig {
    /// Validates the loaded [`CollectorConfig`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.storage.validate()?;
        self.extractor.validate()?;

        if self.collect_interval_secs == Some(0) {
            return Err(ValidationError::CollectIntervalZero);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::MIN_PART_SIZE_BYTES;

    fn valid_config() -> CollectorConfig {
        let json = serde_json::json!({
            "source": {
                "service_name": "cluster1-pxc",
                "username": "xtrabackup",
                "password": "secret",
            },
            "storage": {
                "endpoint": "http://minio:9000",
                "region": "us-east-1",
                "bucket": "binlogs",
                "access_key_id": "key",
                "secret_access_key": "secret",
            },
        });

        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let config = valid_config();
        assert_eq!(config.source.port, 3306);
        assert!(config.source.host.is_none());
        assert_eq!(config.storage.prefix, "");
        assert!(config.storage.force_path_style);
        assert_eq!(config.extractor.conduit_dir.to_str(), Some("/tmp"));
        assert_eq!(config.collect_interval_secs, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn small_part_size_is_rejected() {
        let mut config = valid_config();
        config.storage.part_size_bytes = MIN_PART_SIZE_BYTES - 1;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::PartSizeTooSmall { .. })
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = valid_config();
        config.collect_interval_secs = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::CollectIntervalZero)
        ));
    }

    #[test]
    fn explicit_host_makes_service_name_optional() {
        let mut config = valid_config();
        config.source.service_name.clear();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyField("source.service_name"))
        ));

        config.source.host = Some("cluster1-pxc-0".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_scheme_is_checked() {
        let mut config = valid_config();
        config.storage.endpoint = Some("minio:9000".to_string());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidConfig(_))
        ));
    }
}

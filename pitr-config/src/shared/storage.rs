use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Smallest part size accepted by S3 for every part of a multipart upload but the last.
pub const MIN_PART_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Default size of the parts uploaded while streaming a binlog.
const DEFAULT_PART_SIZE_BYTES: usize = 16 * 1024 * 1024;

/// S3 compatible object storage receiving the archived binlogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Custom endpoint, e.g. a MinIO deployment. Uses AWS when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    /// Key prefix under which all objects are stored.
    #[serde(default)]
    pub prefix: String,
    pub access_key_id: String,
    pub secret_access_key: SerializableSecretString,
    /// Size of the parts of a multipart upload, which bounds the memory used per upload.
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: usize,
    /// Addresses buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

fn default_part_size_bytes() -> usize {
    DEFAULT_PART_SIZE_BYTES
}

fn default_force_path_style() -> bool {
    true
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.region.is_empty() {
            return Err(ValidationError::EmptyField("storage.region"));
        }
        if self.bucket.is_empty() {
            return Err(ValidationError::EmptyField("storage.bucket"));
        }
        if self.access_key_id.is_empty() {
            return Err(ValidationError::EmptyField("storage.access_key_id"));
        }
        if self.secret_access_key.is_empty() {
            return Err(ValidationError::EmptyField("storage.secret_access_key"));
        }
        if self.part_size_bytes < MIN_PART_SIZE_BYTES {
            return Err(ValidationError::PartSizeTooSmall {
                min: MIN_PART_SIZE_BYTES,
                actual: self.part_size_bytes,
            });
        }
        if let Some(endpoint) = &self.endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(ValidationError::InvalidConfig(
                "`storage.endpoint` must start with http:// or https://".to_string(),
            ));
        }

        Ok(())
    }
}

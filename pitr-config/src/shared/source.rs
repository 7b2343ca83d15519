use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Default MySQL port of the cluster members.
const DEFAULT_PORT: u16 = 3306;

/// Connection settings for the Percona XtraDB Cluster the binlogs are collected from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Kubernetes service name used to discover the cluster members.
    pub service_name: String,
    /// Explicit host to connect to, bypassing discovery through the service.
    #[serde(default)]
    pub host: Option<String>,
    /// MySQL port of the cluster members.
    #[serde(default = "default_port")]
    pub port: u16,
    /// User with `REPLICATION CLIENT` and `REPLICATION SLAVE` privileges.
    pub username: String,
    /// Password of [`SourceConfig::username`].
    pub password: SerializableSecretString,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_none() && self.service_name.is_empty() {
            return Err(ValidationError::EmptyField("source.service_name"));
        }
        if self.username.is_empty() {
            return Err(ValidationError::EmptyField("source.username"));
        }

        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::shared::ValidationError;

const DEFAULT_MYSQLBINLOG_PATH: &str = "mysqlbinlog";
const DEFAULT_CONDUIT_DIR: &str = "/tmp";

/// Settings of the `mysqlbinlog` based payload extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractorConfig {
    /// Path of the `mysqlbinlog` executable, resolved through `PATH` when relative.
    #[serde(default = "default_mysqlbinlog_path")]
    pub mysqlbinlog_path: PathBuf,
    /// Directory in which the named pipes used to stream payloads are created.
    #[serde(default = "default_conduit_dir")]
    pub conduit_dir: PathBuf,
}

fn default_mysqlbinlog_path() -> PathBuf {
    PathBuf::from(DEFAULT_MYSQLBINLOG_PATH)
}

fn default_conduit_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONDUIT_DIR)
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mysqlbinlog_path: default_mysqlbinlog_path(),
            conduit_dir: default_conduit_dir(),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mysqlbinlog_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyField("extractor.mysqlbinlog_path"));
        }
        if self.conduit_dir.as_os_str().is_empty() {
            return Err(ValidationError::EmptyField("extractor.conduit_dir"));
        }

        Ok(())
    }
}

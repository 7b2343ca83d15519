use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("`{0}` cannot be empty")]
    EmptyField(&'static str),

    /// The multipart part size is below the S3 minimum.
    #[error("`storage.part_size_bytes` must be at least {min} bytes, got {actual}")]
    PartSizeTooSmall { min: usize, actual: usize },

    /// The collection interval is zero.
    #[error("`collect_interval_secs` cannot be zero")]
    CollectIntervalZero,

    /// General configuration validation error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

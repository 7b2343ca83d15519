//! Fault injection points for testing crash safety of the collector.
//!
//! Failpoints are configured from tests with the `fail` crate and compiled in only with the
//! `failpoints` feature.

use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, PitrResult};

pub const ARCHIVE_BINLOG__AFTER_PAYLOAD_UPLOAD: &str = "archive_binlog.after_payload_upload";

/// Executes the failpoint `name`.
///
/// When configured with `return`, the failpoint fails with [`ErrorKind::WithNoRetry`]; when
/// configured with `panic`, it panics. Returns `Ok(())` while inactive.
pub fn pitr_fail_point(name: &str) -> PitrResult<()> {
    fail_point!(name, |_| {
        bail!(
            ErrorKind::WithNoRetry,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}

//! Discovery of the cluster member to collect binlogs from.
//!
//! Members are listed with `peer-list`, which runs `get-pxc-state` against every endpoint of the
//! cluster service. Only a member that is ready, connected, synced and part of the primary
//! component is eligible.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::bail;
use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;

const PEER_LIST_PATH: &str = "peer-list";
const PXC_STATE_COMMAND: &str = "/usr/bin/get-pxc-state";

/// Separator between the entries printed by `peer-list`.
const NODE_SEPARATOR: &str = "node:";

/// State reported by a member that is safe to read binlogs from.
const SYNCED_PRIMARY_STATE: &str = "wsrep_ready:ON:wsrep_connected:ON:wsrep_local_state_comment:Synced:wsrep_cluster_status:Primary";

/// Resolves the host of a synced primary member of the cluster.
#[derive(Debug, Clone)]
pub struct HostResolver {
    service_name: String,
    peer_list_path: PathBuf,
}

impl HostResolver {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            peer_list_path: PathBuf::from(PEER_LIST_PATH),
        }
    }

    /// Overrides the path of the `peer-list` executable.
    pub fn with_peer_list_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.peer_list_path = path.into();
        self
    }

    /// Runs `peer-list` and returns the host of a synced primary member.
    pub async fn resolve(&self) -> PitrResult<String> {
        let output = Command::new(&self.peer_list_path)
            .arg(format!("-on-start={PXC_STATE_COMMAND}"))
            .arg(format!("-service={}", self.service_name))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| {
                pitr_error!(
                    ErrorKind::HostResolutionFailed,
                    "Failed to run peer-list",
                    err
                )
            })?;

        if !output.status.success() {
            bail!(
                ErrorKind::HostResolutionFailed,
                "peer-list exited with an error",
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(output = %stdout, "peer-list output");

        let Some(host) = parse_synced_primary_host(&stdout) else {
            bail!(
                ErrorKind::HostResolutionFailed,
                "No synced primary member found",
                format!("service {}", self.service_name)
            );
        };

        info!(host, service = self.service_name, "resolved cluster member");

        Ok(host)
    }
}

/// Picks the host of a synced primary member out of the output of `peer-list`.
///
/// Entries are sorted so that the choice is stable across runs; the last eligible one wins.
pub fn parse_synced_primary_host(output: &str) -> Option<String> {
    let mut nodes: Vec<&str> = output.split(NODE_SEPARATOR).collect();
    nodes.sort_unstable();

    nodes
        .into_iter()
        .filter(|node| node.contains(SYNCED_PRIMARY_STATE))
        .filter_map(|node| node.split(':').next())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .last()
        .map(str::to_owned)
}

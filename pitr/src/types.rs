//! Core value types shared across the collector.
//!
//! Also defines the object naming scheme used in the blob store, which is the wire contract
//! between the collector and the restore tooling.

use std::cmp::Ordering;
use std::fmt;

/// Name of the object holding the last archived GTID set.
pub const LAST_SET_OBJECT_NAME: &str = "last-binlog-set";

/// Suffix appended to a binlog name to build the name of its GTID set sidecar object.
pub const GTID_SET_SUFFIX: &str = "-gtid-set";

/// Name of a binary log file as reported by the cluster, e.g. `binlog.000042`.
///
/// Names are ordered by the sequence number encoded in their extension, which is how the server
/// assigns them chronologically. Names without a numeric extension sort after numbered ones and
/// between themselves lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinlogName(String);

impl BinlogName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the sequence number encoded in the file extension, if any.
    pub fn sequence(&self) -> Option<u64> {
        let (_, extension) = self.0.rsplit_once('.')?;
        if extension.is_empty() || !extension.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        extension.parse().ok()
    }

    /// Returns the name of the sidecar object storing this binlog's GTID set.
    pub fn gtid_set_object_name(&self) -> String {
        format!("{}{GTID_SET_SUFFIX}", self.0)
    }
}

impl Ord for BinlogName {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.sequence(), other.sequence()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for BinlogName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BinlogName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BinlogName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BinlogName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Opaque GTID set identifying a position in the replication stream.
///
/// An empty set is valid and means the binlog holds no committed transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GtidSet(String);

impl GtidSet {
    pub fn new(set: impl Into<String>) -> Self {
        Self(set.into())
    }

    /// Returns an empty set, used as the cursor before anything has been archived.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GtidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GtidSet {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for GtidSet {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

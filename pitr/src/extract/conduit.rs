use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;

/// A named pipe through which an external exporter hands a payload over to the collector.
///
/// The pipe is created on construction and removed when the [`Conduit`] is closed or dropped.
#[derive(Debug)]
pub struct Conduit {
    path: PathBuf,
    removed: bool,
}

impl Conduit {
    /// Creates a fresh named pipe at `path`, replacing any leftover from an interrupted run.
    pub fn create(path: impl Into<PathBuf>) -> PitrResult<Conduit> {
        let path = path.into();

        remove_if_exists(&path).map_err(|err| {
            pitr_error!(
                ErrorKind::ConduitError,
                "Failed to remove stale conduit",
                format!("{}: {err}", path.display())
            )
        })?;

        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|err| {
            pitr_error!(
                ErrorKind::ConduitError,
                "Failed to create conduit",
                format!("{}: {err}", path.display())
            )
        })?;

        debug!(path = %path.display(), "created conduit");

        Ok(Conduit {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the named pipe, reporting a failure instead of only logging it.
    pub fn close(mut self) -> PitrResult<()> {
        self.removed = true;

        remove_if_exists(&self.path).map_err(|err| {
            pitr_error!(
                ErrorKind::ConduitError,
                "Failed to remove conduit",
                format!("{}: {err}", self.path.display())
            )
        })
    }
}

impl Drop for Conduit {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        if let Err(err) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove conduit");
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

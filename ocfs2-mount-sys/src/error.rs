// SPDX-License-Identifier: GPL-3.0-only

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use nix::errno::Errno;
use thiserror::Error;

/// Errors raised while mounting an OCFS2 volume
///
/// Everything except [`MountError::MountTableIo`] aborts the mount.
#[derive(Error, Debug)]
pub enum MountError {
    #[error("no device specified")]
    MissingDevice,

    #[error("no mountpoint specified")]
    MissingMountpoint,

    #[error("heartbeat control {} is not executable", path.display())]
    HeartbeatControlMissing {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("failed to spawn {}", path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} did not start the heartbeat ({status})", path.display())]
    HeartbeatStartFailed { path: PathBuf, status: ExitStatus },

    #[error("error {} while mounting {device} on {mountpoint}", raw_errno(.errno))]
    MountSyscallFailed {
        device: String,
        mountpoint: String,
        #[source]
        errno: Errno,
    },

    #[error("{}", path.display())]
    MountTableIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MountError {
    /// Whether this error leaves the volume unmounted
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MountError::MountTableIo { .. })
    }

    /// Whether the error came out of the heartbeat stage
    pub fn is_heartbeat(&self) -> bool {
        matches!(
            self,
            MountError::HeartbeatControlMissing { .. }
                | MountError::SpawnFailed { .. }
                | MountError::HeartbeatStartFailed { .. }
        )
    }
}

fn raw_errno(errno: &Errno) -> i32 {
    *errno as i32
}

/// Result type alias for the mount pipeline
pub type Result<T> = std::result::Result<T, MountError>;

// SPDX-License-Identifier: GPL-3.0-only

//! Cluster heartbeat startup
//!
//! OCFS2 refuses to mount a shared volume unless this node is heartbeating on
//! it. The heartbeat is started by `ocfs2_hb_ctl -S -d <device>`, which is
//! safe to run when the heartbeat is already up.

use std::path::{Path, PathBuf};
use std::process::Command;

use nix::unistd::{AccessFlags, access};
use tracing::{debug, info};

use crate::error::{MountError, Result};

/// Wrapper around the heartbeat control executable
#[derive(Debug, Clone)]
pub struct HeartbeatControl {
    path: PathBuf,
}

impl HeartbeatControl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail unless the control executable exists and may be executed
    pub fn check(&self) -> Result<()> {
        access(self.path.as_path(), AccessFlags::X_OK).map_err(|source| {
            MountError::HeartbeatControlMissing {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// The `-S -d <device>` invocation that starts the heartbeat
    pub fn start_command(&self, device: &str) -> Command {
        let mut command = Command::new(&self.path);
        command.args(["-S", "-d"]).arg(device);
        command
    }

    /// Start the heartbeat on `device`, blocking until the helper exits
    pub fn start(&self, device: &str) -> Result<()> {
        self.check()?;

        debug!("Running {:?} -S -d {}", self.path, device);
        let status = self
            .start_command(device)
            .status()
            .map_err(|source| MountError::SpawnFailed {
                path: self.path.clone(),
                source,
            })?;

        if !status.success() {
            return Err(MountError::HeartbeatStartFailed {
                path: self.path.clone(),
                status,
            });
        }

        info!("Heartbeat started on {}", device);
        Ok(())
    }
}

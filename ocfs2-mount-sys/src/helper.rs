// SPDX-License-Identifier: GPL-3.0-only

//! The mount pipeline
//!
//! validate -> heartbeat -> mount(2) -> mtab, strictly in that order. Any
//! failure up to and including the mount aborts with the volume unmounted.
//! Mount table problems afterwards are reported in the outcome instead.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::constants::{HB_CTL_PATH, MTAB_LOCK_PATH, MTAB_LOCK_TIMEOUT, MTAB_PATH};
use crate::error::{MountError, Result};
use crate::heartbeat::HeartbeatControl;
use crate::mount::{KernelMount, MountSyscall, mount_volume};
use crate::mtab::{MountTable, MountTableEntry};
use crate::request::MountRequest;

/// Locations of the external collaborators
#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub hb_ctl_path: PathBuf,
    pub mtab_path: PathBuf,
    pub mtab_lock_path: PathBuf,
    pub lock_timeout: Duration,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            hb_ctl_path: PathBuf::from(HB_CTL_PATH),
            mtab_path: PathBuf::from(MTAB_PATH),
            mtab_lock_path: PathBuf::from(MTAB_LOCK_PATH),
            lock_timeout: MTAB_LOCK_TIMEOUT,
        }
    }
}

/// What happened to the mount table after a successful mount
#[derive(Debug)]
pub enum TableUpdate {
    Written,
    /// `-n` was given
    Suppressed,
    /// The table is a symlink or cannot be opened for writing
    NotWritable,
    /// Always a [`MountError::MountTableIo`]
    Failed(MountError),
}

#[derive(Debug)]
pub struct MountOutcome {
    pub entry: MountTableEntry,
    pub table: TableUpdate,
}

pub struct MountHelper<M = KernelMount> {
    heartbeat: HeartbeatControl,
    table: MountTable,
    syscall: M,
}

impl MountHelper<KernelMount> {
    pub fn new(config: HelperConfig) -> Self {
        Self::with_syscall(config, KernelMount)
    }
}

impl<M: MountSyscall> MountHelper<M> {
    pub fn with_syscall(config: HelperConfig, syscall: M) -> Self {
        Self {
            heartbeat: HeartbeatControl::new(config.hb_ctl_path),
            table: MountTable::new(config.mtab_path, config.mtab_lock_path, config.lock_timeout),
            syscall,
        }
    }

    pub fn heartbeat(&self) -> &HeartbeatControl {
        &self.heartbeat
    }

    pub fn table(&self) -> &MountTable {
        &self.table
    }

    pub fn syscall(&self) -> &M {
        &self.syscall
    }

    /// Run the whole pipeline for one request
    ///
    /// Verbose output (`device=` and the mount summary) goes to `out`.
    pub fn run<W: Write>(&self, request: &MountRequest, out: &mut W) -> Result<MountOutcome> {
        let volume = request.validate()?;
        if request.is_verbose() {
            say(out, format_args!("device={}", volume.device));
        }

        self.heartbeat.start(&volume.device)?;
        mount_volume(&self.syscall, &volume)?;

        let entry = MountTableEntry::for_mount(
            &volume.device,
            &volume.mountpoint,
            volume.raw_options.as_deref(),
        );
        // chatty before the table update: the mount has happened either way
        if request.is_verbose() {
            say(out, format_args!("{}", entry.summary()));
        }

        let table = self.record(&entry, request.skip_table_update);
        Ok(MountOutcome { entry, table })
    }

    fn record(&self, entry: &MountTableEntry, skip: bool) -> TableUpdate {
        if skip {
            debug!("Mount table update suppressed");
            return TableUpdate::Suppressed;
        }
        if !self.table.is_writable() {
            return TableUpdate::NotWritable;
        }

        match self.table.append(entry) {
            Ok(()) => TableUpdate::Written,
            Err(source) => {
                debug!("Failed to update {:?}: {}", self.table.path(), source);
                TableUpdate::Failed(MountError::MountTableIo {
                    path: self.table.path().to_path_buf(),
                    source,
                })
            }
        }
    }
}

fn say<W: Write>(out: &mut W, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        debug!("Could not write verbose output: {}", e);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! The `/etc/mtab` mount table
//!
//! Entries are appended under the mtab lock. On systems where `/etc/mtab`
//! is a symlink into `/proc` the kernel keeps the table itself and there is
//! nothing to write.

mod entry;
mod lock;

pub use entry::{MountTableEntry, ParseEntryError, parse_entries};
pub use lock::MtabLock;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::constants::{MTAB_LOCK_PATH, MTAB_LOCK_TIMEOUT, MTAB_PATH};

/// Location of a mount table and its lock file
#[derive(Debug, Clone)]
pub struct MountTable {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new(MTAB_PATH, MTAB_LOCK_PATH, MTAB_LOCK_TIMEOUT)
    }
}

impl MountTable {
    pub fn new(path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            lock_path: lock_path.into(),
            lock_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether this table is a regular file we are allowed to update
    ///
    /// A symlink (usually to `/proc/self/mounts`) means the table is kept by
    /// the kernel. The table is created if it does not exist yet.
    pub fn is_writable(&self) -> bool {
        if let Ok(meta) = fs::symlink_metadata(&self.path)
            && meta.file_type().is_symlink()
        {
            debug!("{:?} is a symlink, not updating it", self.path);
            return false;
        }

        match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o644)
            .open(&self.path)
        {
            Ok(_) => true,
            Err(e) => {
                debug!("{:?} is not writable: {}", self.path, e);
                false
            }
        }
    }

    /// Append one entry while holding the mtab lock
    ///
    /// The lock is released whether or not the write succeeds.
    pub fn append(&self, entry: &MountTableEntry) -> io::Result<()> {
        let _lock = MtabLock::acquire(&self.lock_path, self.lock_timeout)?;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o644)
            .open(&self.path)?;

        // a single write keeps the line whole for readers that ignore the lock
        file.write_all(format!("{entry}\n").as_bytes())?;
        file.sync_all()?;

        debug!("Recorded {} in {:?}", entry.summary(), self.path);
        Ok(())
    }

    pub fn read_entries(&self) -> io::Result<Vec<MountTableEntry>> {
        let content = fs::read_to_string(&self.path)?;
        parse_entries(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

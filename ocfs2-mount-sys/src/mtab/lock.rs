// SPDX-License-Identifier: GPL-3.0-only

//! The `/etc/mtab~` lock
//!
//! Whoever manages to `link(2)` a private file onto the lock path holds the
//! lock; the lock file existing is what "locked" means. The holder also puts
//! an `fcntl` write lock on it, which is what other writers sleep on until the
//! holder unlinks the file.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, fcntl};
use nix::libc;
use tracing::{debug, warn};

use crate::constants::MTAB_LOCK_POLL;

static NEXT_LINK_SOURCE: AtomicU32 = AtomicU32::new(0);

/// Exclusive hold on the mtab lock file
///
/// Only a lock this process linked into place is ever removed. The guard
/// unlinks the lock file and then drops the `fcntl` lock when dropped, on
/// every exit path.
pub struct MtabLock {
    path: PathBuf,
    _file: File,
}

impl MtabLock {
    /// Take the lock, waiting at most `timeout` for the current holder
    pub fn acquire(path: &Path, timeout: Duration) -> io::Result<Self> {
        let source = link_source(path);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&source)?;

        let result = Self::link_into_place(path, &source, Instant::now() + timeout);

        if let Err(e) = fs::remove_file(&source) {
            warn!("Failed to remove {:?}: {}", source, e);
        }
        result
    }

    fn link_into_place(path: &Path, source: &Path, deadline: Instant) -> io::Result<Self> {
        loop {
            match fs::hard_link(source, path) {
                Ok(()) => return Self::hold(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("can't create lock file {}", path.display()),
                ));
            }
            wait_for_holder(path, deadline);
        }
    }

    fn hold(path: &Path) -> io::Result<Self> {
        let file = match OpenOptions::new().write(true).open(path) {
            Ok(file) => file,
            Err(e) => {
                // the link is ours, so is the cleanup
                let _ = fs::remove_file(path);
                return Err(e);
            }
        };

        // the link alone already makes us the owner
        if let Err(errno) = fcntl(&file, FcntlArg::F_SETLK(&write_lock())) {
            debug!("Can't fcntl-lock {:?}: {}", path, errno);
        }

        debug!("Acquired mtab lock {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for MtabLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MtabLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for MtabLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove mtab lock {:?}: {}", self.path, e);
        }
        debug!("Released mtab lock {:?}", self.path);
    }
}

/// `<lock path><pid>.<n>`, unique per attempt so threads never share one
fn link_source(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(
        "{}.{}",
        process::id(),
        NEXT_LINK_SOURCE.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(name)
}

/// Sleep until the holder of `path` lets go of its `fcntl` lock
///
/// Returns straight away when the lock file is already gone. A lock file
/// nobody has `fcntl`-locked (stale, or its owner is about to lock it) costs
/// one poll interval.
fn wait_for_holder(path: &Path, deadline: Instant) {
    let Ok(file) = OpenOptions::new().write(true).open(path) else {
        return;
    };

    let mut waited = false;
    while Instant::now() < deadline {
        match fcntl(&file, FcntlArg::F_SETLK(&write_lock())) {
            Err(Errno::EAGAIN | Errno::EACCES) => {
                waited = true;
                thread::sleep(MTAB_LOCK_POLL);
            }
            _ => break,
        }
    }

    if !waited {
        thread::sleep(MTAB_LOCK_POLL);
    }
}

fn write_lock() -> libc::flock {
    // SAFETY: `flock` is a plain C struct, all zeroes is a valid value
    let mut lock: libc::flock = unsafe { std::mem::zeroed() };
    lock.l_type = libc::F_WRLCK as _;
    lock.l_whence = libc::SEEK_SET as _;
    lock
}

// SPDX-License-Identifier: GPL-3.0-only

//! Mount pipeline for OCFS2 cluster volumes
//!
//! This crate implements everything `mount.ocfs2` does between reading its
//! arguments and exiting:
//! - Translation of mount option strings into kernel mount flags
//! - Starting the cluster heartbeat through `ocfs2_hb_ctl`
//! - The `mount(2)` call itself
//! - Recording the new mount in `/etc/mtab` under the mtab lock
//!
//! Every stage before the mount is fatal on failure. Mount table bookkeeping
//! after a successful mount is best-effort.

pub mod constants;
pub mod error;
pub mod heartbeat;
pub mod helper;
pub mod mount;
pub mod mtab;
pub mod options;
pub mod request;

pub use error::{MountError, Result};
pub use heartbeat::HeartbeatControl;
pub use helper::{HelperConfig, MountHelper, MountOutcome, TableUpdate};
pub use mount::{KernelMount, MountSyscall};
pub use mtab::{MountTable, MountTableEntry, MtabLock};
pub use options::{HelperFlag, MountFlags, TranslatedOptions, translate};
pub use request::{MountRequest, ValidatedMount};

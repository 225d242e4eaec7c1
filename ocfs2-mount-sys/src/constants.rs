// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

/// Name used as the prefix of every diagnostic
pub const PROGRAM_NAME: &str = "mount.ocfs2";

/// Filesystem type handed to `mount(2)` and recorded in the mount table
pub const FS_TYPE: &str = "ocfs2";

/// Heartbeat control helper shipped with ocfs2-tools
pub const HB_CTL_PATH: &str = "/sbin/ocfs2_hb_ctl";

pub const MTAB_PATH: &str = "/etc/mtab";

/// Lock file honoured by every mtab writer (mount, umount, helpers)
pub const MTAB_LOCK_PATH: &str = "/etc/mtab~";

pub const MTAB_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
pub const MTAB_LOCK_POLL: Duration = Duration::from_millis(100);

/// Option string recorded when the caller passed no `-o`
pub const DEFAULT_MTAB_OPTIONS: &str = "defaults";

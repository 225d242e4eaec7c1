// SPDX-License-Identifier: GPL-3.0-only

//! The `mount(2)` call

use nix::errno::Errno;
use nix::mount::MsFlags;
use tracing::{debug, info};

use crate::constants::FS_TYPE;
use crate::error::{MountError, Result};
use crate::request::ValidatedMount;

/// Seam over `mount(2)` so the pipeline can run without privileges
pub trait MountSyscall {
    fn mount(
        &self,
        device: &str,
        mountpoint: &str,
        fs_type: &str,
        flags: MsFlags,
        data: Option<&str>,
    ) -> std::result::Result<(), Errno>;
}

/// The real system call
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelMount;

impl MountSyscall for KernelMount {
    fn mount(
        &self,
        device: &str,
        mountpoint: &str,
        fs_type: &str,
        flags: MsFlags,
        data: Option<&str>,
    ) -> std::result::Result<(), Errno> {
        nix::mount::mount(Some(device), mountpoint, Some(fs_type), flags, data)
    }
}

/// Mount a validated volume as OCFS2
///
/// Userspace-only option bits are stripped before the call. A failure is
/// returned as is; the caller decides nothing about retrying.
pub fn mount_volume<M: MountSyscall + ?Sized>(syscall: &M, volume: &ValidatedMount) -> Result<()> {
    let flags = volume.options.flags.kernel_flags();
    let data = volume.options.extra.as_deref();

    debug!(
        "mount({}, {}, {}, {:?}, {:?})",
        volume.device, volume.mountpoint, FS_TYPE, flags, data
    );

    syscall
        .mount(&volume.device, &volume.mountpoint, FS_TYPE, flags, data)
        .map_err(|errno| MountError::MountSyscallFailed {
            device: volume.device.clone(),
            mountpoint: volume.mountpoint.clone(),
            errno,
        })?;

    info!("Mounted {} on {}", volume.device, volume.mountpoint);
    Ok(())
}

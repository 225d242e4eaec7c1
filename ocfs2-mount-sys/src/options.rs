// SPDX-License-Identifier: GPL-3.0-only

//! Mount option string translation
//!
//! Turns a comma separated option string (`rw,noatime,heartbeat=local`) into
//! the flag word for `mount(2)` plus the leftover options that only the OCFS2
//! kernel driver understands. The keyword table is the one shared by
//! mount(8) and its filesystem helpers.

use enumflags2::{BitFlags, bitflags};
use nix::mount::MsFlags;

/// Options that mean something to mount(8) and fstab but never to the kernel
///
/// Together these form the `MS_NOSYS` set. They can be parsed from an option
/// string but [`MountFlags::kernel_flags`] never lets them through.
#[bitflags]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelperFlag {
    NoAuto = 1 << 0,
    User = 1 << 1,
    Users = 1 << 2,
    Owner = 1 << 3,
    Group = 1 << 4,
    /// `_netdev` and `comment`
    Comment = 1 << 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MountFlags {
    pub kernel: MsFlags,
    pub helper: BitFlags<HelperFlag>,
}

impl Default for MountFlags {
    fn default() -> Self {
        Self {
            kernel: MsFlags::empty(),
            helper: BitFlags::empty(),
        }
    }
}

impl MountFlags {
    /// Flags to hand to `mount(2)`, with every userspace-only bit cleared
    pub fn kernel_flags(&self) -> MsFlags {
        self.kernel
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Set(mask) => self.kernel.insert(mask),
            Effect::Clear(mask) => self.kernel.remove(mask),
            Effect::SetHelper(flag) => self.helper.insert(flag),
            Effect::ClearHelper(flag) => self.helper.remove(flag),
        }
    }
}

/// Result of translating an option string
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslatedOptions {
    pub flags: MountFlags,
    /// Unrecognised options in their original order, comma joined
    pub extra: Option<String>,
}

#[derive(Clone, Copy, Debug)]
enum Effect {
    None,
    Set(MsFlags),
    Clear(MsFlags),
    SetHelper(HelperFlag),
    ClearHelper(HelperFlag),
}

const OPTION_TABLE: &[(&str, Effect)] = &[
    ("defaults", Effect::None),
    ("ro", Effect::Set(MsFlags::MS_RDONLY)),
    ("rw", Effect::Clear(MsFlags::MS_RDONLY)),
    ("exec", Effect::Clear(MsFlags::MS_NOEXEC)),
    ("noexec", Effect::Set(MsFlags::MS_NOEXEC)),
    ("suid", Effect::Clear(MsFlags::MS_NOSUID)),
    ("nosuid", Effect::Set(MsFlags::MS_NOSUID)),
    ("dev", Effect::Clear(MsFlags::MS_NODEV)),
    ("nodev", Effect::Set(MsFlags::MS_NODEV)),
    ("sync", Effect::Set(MsFlags::MS_SYNCHRONOUS)),
    ("async", Effect::Clear(MsFlags::MS_SYNCHRONOUS)),
    ("dirsync", Effect::Set(MsFlags::MS_DIRSYNC)),
    ("remount", Effect::Set(MsFlags::MS_REMOUNT)),
    ("bind", Effect::Set(MsFlags::MS_BIND)),
    ("rbind", Effect::Set(MsFlags::MS_BIND.union(MsFlags::MS_REC))),
    ("mand", Effect::Set(MsFlags::MS_MANDLOCK)),
    ("nomand", Effect::Clear(MsFlags::MS_MANDLOCK)),
    ("noatime", Effect::Set(MsFlags::MS_NOATIME)),
    ("atime", Effect::Clear(MsFlags::MS_NOATIME)),
    ("nodiratime", Effect::Set(MsFlags::MS_NODIRATIME)),
    ("diratime", Effect::Clear(MsFlags::MS_NODIRATIME)),
    ("quiet", Effect::Set(MsFlags::MS_SILENT)),
    ("silent", Effect::Set(MsFlags::MS_SILENT)),
    ("loud", Effect::Clear(MsFlags::MS_SILENT)),
    ("auto", Effect::ClearHelper(HelperFlag::NoAuto)),
    ("noauto", Effect::SetHelper(HelperFlag::NoAuto)),
    ("user", Effect::SetHelper(HelperFlag::User)),
    ("nouser", Effect::ClearHelper(HelperFlag::User)),
    ("users", Effect::SetHelper(HelperFlag::Users)),
    ("nousers", Effect::ClearHelper(HelperFlag::Users)),
    ("owner", Effect::SetHelper(HelperFlag::Owner)),
    ("noowner", Effect::ClearHelper(HelperFlag::Owner)),
    ("group", Effect::SetHelper(HelperFlag::Group)),
    ("nogroup", Effect::ClearHelper(HelperFlag::Group)),
    ("_netdev", Effect::SetHelper(HelperFlag::Comment)),
    ("comment", Effect::SetHelper(HelperFlag::Comment)),
];

fn lookup(token: &str) -> Option<Effect> {
    OPTION_TABLE
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, effect)| *effect)
}

/// Translate a raw `-o` option string
///
/// Recognised keywords are folded into the flag word; toggle pairs such as
/// `ro`/`rw` are last-wins. Everything else is passed to the kernel verbatim.
pub fn translate(raw: &str) -> TranslatedOptions {
    let mut flags = MountFlags::default();
    let mut extra = Vec::new();

    for token in raw.split(',').filter(|token| !token.is_empty()) {
        match lookup(token) {
            Some(effect) => flags.apply(effect),
            None => extra.push(token),
        }
    }

    TranslatedOptions {
        flags,
        extra: (!extra.is_empty()).then(|| extra.join(",")),
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Command line of `mount.ocfs2`
//!
//! mount(8) passes helpers whatever flags it was given, so anything other
//! than `-v`, `-n` and `-o` is dropped before clap sees the arguments.

use std::ffi::OsString;

use anyhow::{Result, anyhow};
use clap::{ArgAction, Parser};
use ocfs2_mount_sys::MountRequest;

/// Mount an OCFS2 cluster volume
#[derive(Parser, Debug)]
#[command(name = "mount.ocfs2")]
#[command(about = "Mount helper for OCFS2 cluster volumes", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Print the device and the resulting mount
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Do not write an entry to /etc/mtab
    #[arg(short = 'n', action = ArgAction::Count)]
    pub no_mtab: u8,

    /// Comma separated mount options; the last one given wins
    #[arg(short = 'o', value_name = "OPTIONS", action = ArgAction::Append, allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// Block device holding the volume
    pub device: Option<String>,

    /// Directory to mount on
    pub mountpoint: Option<String>,

    #[arg(hide = true)]
    pub extra: Vec<String>,
}

impl Cli {
    pub fn from_args<I, S>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

impl From<Cli> for MountRequest {
    fn from(cli: Cli) -> Self {
        if !cli.extra.is_empty() {
            tracing::debug!("Ignoring extra arguments {:?}", cli.extra);
        }
        MountRequest {
            device: cli.device,
            mountpoint: cli.mountpoint,
            raw_options: cli.options.into_iter().last(),
            verbose: cli.verbose,
            skip_table_update: cli.no_mtab > 0,
        }
    }
}

/// argv as UTF-8 strings
///
/// A device or mountpoint that is not valid UTF-8 is refused instead of being
/// replaced by a lossy, different path.
pub fn utf8_args<I>(args: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow!("argument {:?} is not valid UTF-8", arg))
        })
        .collect()
}

/// Rewrite argv the way getopt("vno:") would read it
///
/// Option clusters are split (`-vn` -> `-v -n`), `-o` takes the rest of its
/// cluster or the next argument, unknown flags are dropped, and every
/// positional argument is moved behind `--` in its original order.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut flags = Vec::new();
    let mut positionals = Vec::new();

    if let Some(program) = args.next() {
        flags.push(program);
    }

    while let Some(arg) = args.next() {
        if arg == "--" {
            positionals.extend(args.by_ref());
            break;
        }
        if arg.starts_with("--") {
            tracing::debug!("Ignoring unknown option {}", arg);
            continue;
        }
        let Some(cluster) = arg.strip_prefix('-').filter(|rest| !rest.is_empty()) else {
            positionals.push(arg);
            continue;
        };

        for (index, letter) in cluster.char_indices() {
            match letter {
                'v' | 'n' => flags.push(format!("-{letter}")),
                'o' => {
                    let attached = &cluster[index + 1..];
                    let value = if attached.is_empty() {
                        args.next()
                    } else {
                        Some(attached.to_string())
                    };
                    match value {
                        Some(value) => {
                            flags.push("-o".to_string());
                            flags.push(value);
                        }
                        None => tracing::debug!("Option -o is missing its argument"),
                    }
                    break;
                }
                other => tracing::debug!("Ignoring unknown option -{}", other),
            }
        }
    }

    flags.push("--".to_string());
    flags.extend(positionals);
    flags
}

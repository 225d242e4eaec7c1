// SPDX-License-Identifier: GPL-3.0-only

//! mount.ocfs2 - mount helper for OCFS2 cluster volumes
//!
//! Invoked by mount(8) as `mount.ocfs2 [-v] [-n] [-o options] <device> <dir>`.
//! Starts the cluster heartbeat on the device, mounts it and records the
//! mount in /etc/mtab. Exits 1 if the volume could not be mounted.
//!
//! Cargo builds the binary as `mount_ocfs2`, since a target name cannot
//! contain a dot. Install it as `/sbin/mount.ocfs2` so mount(8) finds it.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use ocfs2_mount_sys::constants::PROGRAM_NAME;
use ocfs2_mount_sys::{HelperConfig, MountHelper, MountRequest, MountSyscall, TableUpdate};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::Cli;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let parsed = cli::utf8_args(std::env::args_os())
        .and_then(|args| Cli::from_args(args).map_err(anyhow::Error::from));
    let cli = match parsed {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{PROGRAM_NAME}: {e:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_logging(cli.verbose);

    let helper = MountHelper::new(HelperConfig::default());
    let code = run(
        &helper,
        &cli.into(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    ExitCode::from(code)
}

/// Diagnostics go to stderr; stdout is reserved for the verbose summary
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    fmt()
        .with_env_filter(EnvFilter::new(format!(
            "ocfs2_mount_sys={level},mount_ocfs2={level},warn"
        )))
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

/// Mount the volume and report on `err`; returns the exit status
fn run<M, O, E>(helper: &MountHelper<M>, request: &MountRequest, out: &mut O, err: &mut E) -> u8
where
    M: MountSyscall,
    O: Write,
    E: Write,
{
    match mount(helper, request, out, err) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            tracing::debug!("Mount failed: {:?}", e);
            report(err, &e);
            EXIT_FAILURE
        }
    }
}

fn mount<M, O, E>(helper: &MountHelper<M>, request: &MountRequest, out: &mut O, err: &mut E) -> Result<()>
where
    M: MountSyscall,
    O: Write,
    E: Write,
{
    let outcome = match helper.run(request, out) {
        Err(e) if e.is_heartbeat() => {
            return Err(e).with_context(|| {
                format!(
                    "Error when attempting to run {}",
                    helper.heartbeat().path().display()
                )
            });
        }
        other => other?,
    };

    // the volume is mounted; a bookkeeping failure is reported but not fatal
    if let TableUpdate::Failed(e) = outcome.table {
        report(err, &anyhow::Error::new(e));
    }

    Ok(())
}

fn report<E: Write>(err: &mut E, e: &anyhow::Error) {
    // nowhere left to complain to if stderr itself is gone
    let _ = writeln!(err, "{PROGRAM_NAME}: {e:#}");
}

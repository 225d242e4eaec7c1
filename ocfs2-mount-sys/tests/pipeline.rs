// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::mount::MsFlags;
use ocfs2_mount_sys::{
    HelperConfig, MountError, MountHelper, MountRequest, MountSyscall, TableUpdate,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct MountCall {
    device: String,
    mountpoint: String,
    fs_type: String,
    flags: MsFlags,
    data: Option<String>,
}

#[derive(Default)]
struct FakeMount {
    calls: Mutex<Vec<MountCall>>,
    fail_with: Option<Errno>,
}

impl FakeMount {
    fn failing(errno: Errno) -> Self {
        Self {
            fail_with: Some(errno),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<MountCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl MountSyscall for FakeMount {
    fn mount(
        &self,
        device: &str,
        mountpoint: &str,
        fs_type: &str,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<(), Errno> {
        self.calls.lock().expect("calls lock").push(MountCall {
            device: device.to_string(),
            mountpoint: mountpoint.to_string(),
            fs_type: fs_type.to_string(),
            flags,
            data: data.map(ToString::to_string),
        });
        self.fail_with.map_or(Ok(()), Err)
    }
}

fn config(dir: &Path, hb_ctl: &str) -> HelperConfig {
    HelperConfig {
        hb_ctl_path: hb_ctl.into(),
        mtab_path: dir.join("mtab"),
        mtab_lock_path: dir.join("mtab~"),
        lock_timeout: Duration::from_secs(5),
    }
}

fn request(options: Option<&str>, verbose: u8, skip: bool) -> MountRequest {
    MountRequest {
        device: Some("/dev/sdb1".to_string()),
        mountpoint: Some("/mnt/data".to_string()),
        raw_options: options.map(ToString::to_string),
        verbose,
        skip_table_update: skip,
    }
}

#[test]
fn verbose_mount_prints_summary_and_records_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(config(dir.path(), "/bin/true"), FakeMount::default());

    let mut out = Vec::new();
    let outcome = helper
        .run(&request(Some("rw,noatime,_netdev"), 1, false), &mut out)
        .expect("mount should succeed");

    let printed = String::from_utf8(out).expect("utf8");
    assert_eq!(
        printed,
        "device=/dev/sdb1\n/dev/sdb1 on /mnt/data type ocfs2 (rw,noatime,_netdev)\n"
    );

    let calls = helper.syscall().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].device, "/dev/sdb1");
    assert_eq!(calls[0].mountpoint, "/mnt/data");
    assert_eq!(calls[0].fs_type, "ocfs2");
    assert_eq!(calls[0].flags, MsFlags::MS_NOATIME);
    assert_eq!(calls[0].data, None);

    assert!(matches!(outcome.table, TableUpdate::Written));
    let entries = helper.table().read_entries().expect("read mtab");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fs_type, "ocfs2");
    assert_eq!(entries[0].options.as_deref(), Some("rw,noatime,_netdev"));
}

#[test]
fn quiet_mount_prints_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(config(dir.path(), "/bin/true"), FakeMount::default());

    let mut out = Vec::new();
    helper
        .run(&request(None, 0, false), &mut out)
        .expect("mount should succeed");

    assert!(out.is_empty());
    let content = fs::read_to_string(dir.path().join("mtab")).expect("read mtab");
    assert!(content.ends_with(" ocfs2 defaults 0 0\n"));
}

#[test]
fn missing_device_has_no_side_effects() {
    let dir = tempfile::tempdir().expect("tempdir");
    // a heartbeat helper that cannot run would fail the test if it were reached
    let helper = MountHelper::with_syscall(
        config(dir.path(), "/nonexistent/ocfs2_hb_ctl"),
        FakeMount::default(),
    );

    let mut req = request(None, 1, false);
    req.device = None;
    let err = helper.run(&req, &mut Vec::new()).unwrap_err();

    assert!(matches!(err, MountError::MissingDevice));
    assert!(helper.syscall().calls().is_empty());
    assert!(!dir.path().join("mtab").exists());
}

#[test]
fn missing_mountpoint_has_no_side_effects() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(
        config(dir.path(), "/nonexistent/ocfs2_hb_ctl"),
        FakeMount::default(),
    );

    let mut req = request(None, 0, false);
    req.mountpoint = None;
    let err = helper.run(&req, &mut Vec::new()).unwrap_err();

    assert!(matches!(err, MountError::MissingMountpoint));
    assert!(helper.syscall().calls().is_empty());
    assert!(!dir.path().join("mtab").exists());
}

#[test]
fn absent_heartbeat_control_aborts_before_mount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(
        config(dir.path(), "/nonexistent/ocfs2_hb_ctl"),
        FakeMount::default(),
    );

    let err = helper.run(&request(Some("rw"), 0, false), &mut Vec::new()).unwrap_err();

    assert!(matches!(err, MountError::HeartbeatControlMissing { .. }));
    assert!(err.is_fatal());
    assert!(helper.syscall().calls().is_empty());
    assert!(!dir.path().join("mtab").exists());
}

#[test]
fn failed_heartbeat_start_aborts_before_mount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(config(dir.path(), "/bin/false"), FakeMount::default());

    let err = helper.run(&request(Some("rw"), 0, false), &mut Vec::new()).unwrap_err();

    assert!(matches!(err, MountError::HeartbeatStartFailed { .. }));
    assert!(helper.syscall().calls().is_empty());
    assert!(!dir.path().join("mtab").exists());
}

#[test]
fn failed_mount_leaves_table_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mtab = dir.path().join("mtab");
    fs::write(&mtab, "/dev/sda2 / ext4 rw 0 0\n").expect("seed mtab");

    let helper = MountHelper::with_syscall(
        config(dir.path(), "/bin/true"),
        FakeMount::failing(Errno::EBUSY),
    );
    let err = helper.run(&request(Some("rw"), 1, false), &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err,
        MountError::MountSyscallFailed { errno: Errno::EBUSY, .. }
    ));
    assert_eq!(helper.syscall().calls().len(), 1);
    assert_eq!(
        fs::read_to_string(&mtab).expect("read mtab"),
        "/dev/sda2 / ext4 rw 0 0\n"
    );
}

#[test]
fn suppressed_update_never_creates_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = MountHelper::with_syscall(config(dir.path(), "/bin/true"), FakeMount::default());

    let mut out = Vec::new();
    let outcome = helper
        .run(&request(Some("ro"), 1, true), &mut out)
        .expect("mount should succeed");

    assert!(matches!(outcome.table, TableUpdate::Suppressed));
    assert!(!dir.path().join("mtab").exists());
    assert!(!dir.path().join("mtab~").exists());
    // the summary is still printed
    assert!(String::from_utf8(out).expect("utf8").contains(" type ocfs2 (ro)"));
}

#[test]
fn symlinked_table_is_left_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mounts = dir.path().join("mounts");
    fs::write(&mounts, "").expect("write mounts");
    std::os::unix::fs::symlink(&mounts, dir.path().join("mtab")).expect("symlink");

    let helper = MountHelper::with_syscall(config(dir.path(), "/bin/true"), FakeMount::default());
    let outcome = helper
        .run(&request(Some("rw"), 0, false), &mut Vec::new())
        .expect("mount should succeed");

    assert!(matches!(outcome.table, TableUpdate::NotWritable));
    assert_eq!(fs::read_to_string(&mounts).expect("read mounts"), "");
}

#[test]
fn table_write_failure_does_not_fail_the_mount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(dir.path(), "/bin/true");
    // lock file inside a directory that does not exist: the lock cannot be taken
    cfg.mtab_lock_path = dir.path().join("missing").join("mtab~");

    let helper = MountHelper::with_syscall(cfg, FakeMount::default());
    let outcome = helper
        .run(&request(Some("rw"), 0, false), &mut Vec::new())
        .expect("mount should still succeed");

    match outcome.table {
        TableUpdate::Failed(err) => {
            assert!(matches!(err, MountError::MountTableIo { .. }));
            assert!(!err.is_fatal());
        }
        other => panic!("unexpected table update: {other:?}"),
    }
    assert_eq!(helper.syscall().calls().len(), 1);
}

#[test]
fn concurrent_mounts_do_not_interleave_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rounds = 20;

    let workers: Vec<_> = ["/dev/sdb1", "/dev/sdc1"]
        .into_iter()
        .enumerate()
        .map(|(index, device)| {
            let cfg = config(dir.path(), "/bin/true");
            thread::spawn(move || {
                let helper = MountHelper::with_syscall(cfg, FakeMount::default());
                for round in 0..rounds {
                    let req = MountRequest {
                        device: Some(device.to_string()),
                        mountpoint: Some(format!("/mnt/node{index}/vol{round}")),
                        raw_options: Some(format!("rw,heartbeat=local,round={round}")),
                        ..Default::default()
                    };
                    let outcome = helper.run(&req, &mut Vec::new()).expect("mount");
                    assert!(matches!(outcome.table, TableUpdate::Written));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread");
    }

    let content = fs::read_to_string(dir.path().join("mtab")).expect("read mtab");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2 * rounds);
    for line in lines {
        let entry: ocfs2_mount_sys::MountTableEntry = line.parse().expect("whole line");
        assert_eq!(entry.fs_type, "ocfs2");
        assert!(entry.source == "/dev/sdb1" || entry.source == "/dev/sdc1");
    }
    assert!(!dir.path().join("mtab~").exists());
}

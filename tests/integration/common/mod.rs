#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

/// Creates `<root>/java/bin/java` as a shell script running `body`, returns the java home.
pub fn fake_java_home(root: &Path, body: &str) -> PathBuf {
    let home = root.join("java");
    let bin = home.join("bin");
    fs::create_dir_all(&bin).expect("failed to create fake java bin dir");
    let java = bin.join("java");
    fs::write(&java, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake java");
    fs::set_permissions(&java, fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake java executable");
    home
}

/// A fake java that records its arguments, one per line, into `args_file`.
pub fn recording_java_home(root: &Path, args_file: &Path, exit_code: i32) -> PathBuf {
    fake_java_home(
        root,
        &format!(
            "for arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{}'; done\nexit {exit_code}",
            args_file.display()
        ),
    )
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

pub fn wait_for_lines(path: &Path, expected: usize) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(content) = fs::read_to_string(path) {
            let lines: Vec<_> = content.lines().map(|line| line.to_string()).collect();
            if lines.len() >= expected {
                return lines;
            }
        }

        if Instant::now() >= deadline {
            panic!("Timed out waiting for {expected} lines in {:?}", path);
        }

        thread::sleep(Duration::from_millis(100));
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// True while `pid` exists and has not become a zombie awaiting its reaper.
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
        .process(Pid::from_u32(pid))
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

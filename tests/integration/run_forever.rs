#[path = "common/mod.rs"]
mod common;

use std::{sync::Arc, thread, time::Duration};

use common::{fake_java_home, is_process_alive, read_pid, wait_until};
use jvmnode::supervisor::{JavaRunner, LaunchSpec, ProcessKiller, RestartPolicy};
use tempfile::tempdir;

#[test]
fn exited_process_is_relaunched() {
    let temp = tempdir().expect("failed to create tempdir");
    let home = fake_java_home(temp.path(), "exit 1");
    let killer = Arc::new(ProcessKiller::new());

    let runner = JavaRunner::new(&home)
        .unwrap()
        .with_monitor(killer.clone());
    let spec = LaunchSpec::new("com.example.Flaky");
    assert_eq!(
        spec.restart_policy,
        RestartPolicy::RunForever {
            delay: Duration::ZERO
        }
    );

    // Never returns; the thread is abandoned when the test ends.
    thread::spawn(move || {
        let _ = runner.run_class(&spec);
    });

    assert!(
        wait_until(Duration::from_secs(5), || killer.pids().len() >= 2),
        "supervisor did not relaunch within 5s"
    );
}

#[test]
fn killer_takes_down_a_long_running_child() {
    let temp = tempdir().expect("failed to create tempdir");
    let home = fake_java_home(temp.path(), "exec sleep 30");
    let killer = Arc::new(ProcessKiller::new());

    let runner = JavaRunner::new(&home)
        .unwrap()
        .with_monitor(killer.clone());
    let spec = LaunchSpec {
        restart_policy: RestartPolicy::RunForever {
            delay: Duration::from_secs(60),
        },
        ..LaunchSpec::new("com.example.Sleeper")
    };

    thread::spawn(move || {
        let _ = runner.run_class(&spec);
    });

    assert!(wait_until(Duration::from_secs(5), || !killer.pids().is_empty()));
    let pid = killer.pids()[0];
    assert!(is_process_alive(pid));

    killer.kill_all();
    assert!(
        wait_until(Duration::from_secs(5), || !is_process_alive(pid)),
        "process {pid} survived kill_all"
    );
}

#[test]
fn killer_takes_down_forked_grandchildren() {
    let temp = tempdir().expect("failed to create tempdir");
    let pid_file = temp.path().join("grandchild.pid");
    let home = fake_java_home(
        temp.path(),
        &format!("sleep 30 &\necho $! > '{}'\nexec sleep 30", pid_file.display()),
    );
    let killer = Arc::new(ProcessKiller::new());

    let runner = JavaRunner::new(&home)
        .unwrap()
        .with_monitor(killer.clone());
    let spec = LaunchSpec {
        restart_policy: RestartPolicy::RunForever {
            delay: Duration::from_secs(60),
        },
        ..LaunchSpec::new("com.example.Forker")
    };

    thread::spawn(move || {
        let _ = runner.run_class(&spec);
    });

    assert!(wait_until(Duration::from_secs(5), || read_pid(&pid_file).is_some()));
    let grandchild = read_pid(&pid_file).unwrap();
    assert!(is_process_alive(grandchild));

    killer.kill_all();
    assert!(
        wait_until(Duration::from_secs(5), || !is_process_alive(grandchild)),
        "grandchild {grandchild} survived kill_all"
    );
}

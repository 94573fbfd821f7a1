//! End-to-end checks that drive the `handoff` binary as separate processes.
//!
//! Each test gets its own lock directory through a config file, so tests
//! never contend with each other or with other users of the default
//! directory.

#![cfg(unix)]

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Env {
    _temp: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let lock_dir = temp.path().join("locks");
        let config = temp.path().join("handoff.yaml");
        std::fs::write(
            &config,
            format!(
                "poll_interval_ms: 50\ndefault_timeout_ms: 1000\nlock_dir: {}\n",
                lock_dir.display()
            ),
        )
        .unwrap();
        Self {
            _temp: temp,
            config,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_handoff"));
        cmd.arg("--config").arg(&self.config).args(args);
        cmd.env_remove("HANDOFF_CONFIG").env_remove("HANDOFF_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().unwrap()
    }

    /// Start `handoff hold` and wait until it reports the acquisition.
    fn spawn_holder(&self, args: &[&str]) -> (Child, String) {
        let mut child = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        // Keep draining so the holder's later output never hits a closed pipe.
        thread::spawn(move || io::copy(&mut stdout, &mut io::sink()));
        (child, line.trim().to_string())
    }
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn name_is_stable_across_path_spellings() {
    let env = Env::new();
    let dir = env.config.parent().unwrap();
    let plain = dir.join("data");
    let dotted = dir.join("x").join("..").join("data").join(".");

    let a = env.run(&["name", "--global", "--path", plain.to_str().unwrap()]);
    let b = env.run(&["name", "--global", "--path", dotted.to_str().unwrap()]);
    assert!(a.status.success());
    assert_eq!(stdout_of(&a), stdout_of(&b));
    assert!(stdout_of(&a).starts_with("Global/"));
    assert_eq!(stdout_of(&a).len(), "Global/".len() + 64);
}

#[test]
fn name_local_has_no_lock_file() {
    let env = Env::new();
    let output = env.run(&["name", "--local", "--name", "x", "--lock-file"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("local mutex"));
}

#[test]
fn held_global_lock_times_out_in_another_process() {
    let env = Env::new();
    let (mut holder, line) =
        env.spawn_holder(&["hold", "--global", "--name", "xproc", "--for-ms", "2000"]);
    assert_eq!(line, "acquired Global/xproc");

    let start = Instant::now();
    let output = env.run(&[
        "run", "--global", "--name", "xproc", "--timeout-ms", "300", "--", "true",
    ]);
    let elapsed = start.elapsed();

    assert_eq!(output.status.code(), Some(4));
    assert!(stderr_of(&output).contains("Timed out"));
    assert!(elapsed >= Duration::from_millis(300));

    assert!(holder.wait().unwrap().success());

    // Free again once the holder has released.
    let output = env.run(&["run", "--global", "--name", "xproc", "--", "true"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
}

#[test]
fn waiter_runs_after_holder_releases() {
    let env = Env::new();
    let (mut holder, _) =
        env.spawn_holder(&["hold", "--global", "--name", "queue", "--for-ms", "300"]);

    let output = env.run(&[
        "run", "--global", "--name", "queue", "--timeout-ms", "5000", "--", "true",
    ]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(holder.wait().unwrap().success());
}

#[test]
fn abandoned_lock_is_taken_over() {
    let env = Env::new();
    let output = env.run(&[
        "hold", "--global", "--name", "crash", "--for-ms", "0", "--abandon",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "acquired Global/crash");

    let listed = env.run(&["lock", "list"]);
    assert!(listed.status.success());
    let listing = stdout_of(&listed);
    assert!(listing.contains("Global/crash [abandoned]"), "{}", listing);

    let output = env.run(&["hold", "--global", "--name", "crash", "--for-ms", "0"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stdout_of(&output).starts_with("acquired Global/crash (abandoned)"));

    // Released cleanly this time.
    let output = env.run(&["hold", "--global", "--name", "crash", "--for-ms", "0"]);
    assert_eq!(
        stdout_of(&output).lines().next(),
        Some("acquired Global/crash")
    );
    assert_eq!(stdout_of(&env.run(&["lock", "list"])), "No active locks.");
}

#[test]
fn lock_clear_requires_force_and_removes_abandoned_lock() {
    let env = Env::new();
    env.run(&[
        "hold", "--global", "--name", "stuck", "--for-ms", "0", "--abandon",
    ]);

    let refused = env.run(&["lock", "clear", "Global/stuck"]);
    assert_eq!(refused.status.code(), Some(1));

    let cleared = env.run(&["lock", "clear", "Global/stuck", "--force"]);
    assert!(cleared.status.success(), "{}", stderr_of(&cleared));
    assert_eq!(stdout_of(&cleared), "Cleared lock: Global/stuck");
    assert_eq!(stdout_of(&env.run(&["lock", "list"])), "No active locks.");
}

#[test]
fn failing_command_reports_work_failure() {
    let env = Env::new();
    let output = env.run(&["run", "--global", "--name", "fails", "--", "false"]);
    assert_eq!(output.status.code(), Some(2));

    // The lock was released despite the failure.
    let output = env.run(&[
        "run", "--global", "--name", "fails", "--timeout-ms", "0", "--", "true",
    ]);
    assert!(output.status.success());
}

#[test]
fn run_accepts_a_quoted_command_line() {
    let env = Env::new();
    let marker = env.config.parent().unwrap().join("marker");
    let script = format!("touch '{}'", marker.display());
    let output = env.run(&["run", "--local", "--name", "q", "--", &script]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(Path::new(&marker).exists());
}

#[test]
fn demo_runs_every_task_on_the_owner() {
    let env = Env::new();
    let output = env.run(&["demo", "--producers", "3", "--tasks", "20", "--batch", "7"]);
    assert!(output.status.success(), "{}", stderr_of(&output));
    let out = stdout_of(&output);
    assert!(out.contains("Ran 60 of 60 tasks from 3 producers"), "{}", out);
    assert!(out.contains("Faulted: 0"));
}

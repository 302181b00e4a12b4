#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn handctl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("handctl").unwrap();
    cmd.current_dir(dir.path()).env_remove("HAND_CONFIG");
    cmd
}

fn write_document(dir: &TempDir, doc: serde_json::Value) -> PathBuf {
    let path = dir.path().join("gestures.json");
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

fn hand_document() -> serde_json::Value {
    let mut limits = serde_json::Map::new();
    for id in 1..=12 {
        limits.insert(format!("servo_{id}"), serde_json::json!({ "min": 100, "max": 900 }));
    }
    serde_json::json!({
        "servo_limits": limits,
        "gestures": {
            "fist": { "servo_1": 900, "servo_12": 100 },
            "point": { "servo_1": 100, "servo_2": 950 }
        },
        "sequences": {
            "wave": [ { "gesture": "fist" }, { "gesture": "point", "hold": 300 } ]
        },
        "settings": { "gesture_step_delay_ms": 250 }
    })
}

// ---------------------------------------------------------------------------
// handctl check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_document_summary() {
    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());

    handctl(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("actuators:  12"))
        .stdout(predicate::str::contains("step delay: 250 ms"))
        .stdout(predicate::str::contains("gesture 'point' sets servo_2 to 950"));
}

#[test]
fn check_json_flags_missing_thumb_actuator() {
    let dir = TempDir::new().unwrap();
    write_document(
        &dir,
        serde_json::json!({ "servo_limits": { "servo_1": { "min": 0, "max": 10 } } }),
    );

    let output = handctl(&dir).args(["check", "--json"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["actuators"], 1);
    assert_eq!(report["staged_execution"], false);
    assert_eq!(report["gesture_step_delay_ms"], 500);
}

#[test]
fn check_rejects_inverted_limits() {
    let dir = TempDir::new().unwrap();
    write_document(
        &dir,
        serde_json::json!({ "servo_limits": { "servo_1": { "min": 50, "max": 10 } } }),
    );

    handctl(&dir)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("min 50 is greater than max 10"));
}

#[test]
fn check_rejects_malformed_actuator_key() {
    let dir = TempDir::new().unwrap();
    write_document(
        &dir,
        serde_json::json!({ "servo_limits": { "motor_1": { "min": 0, "max": 10 } } }),
    );

    handctl(&dir).arg("check").assert().failure();
}

#[test]
fn missing_document_fails() {
    let dir = TempDir::new().unwrap();
    handctl(&dir)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gestures.json"));
}

#[test]
fn config_env_var_selects_document() {
    let docs = TempDir::new().unwrap();
    let path = write_document(&docs, hand_document());
    let elsewhere = TempDir::new().unwrap();

    handctl(&elsewhere)
        .env("HAND_CONFIG", &path)
        .args(["gesture", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fist"));
}

// ---------------------------------------------------------------------------
// handctl gesture / sequence
// ---------------------------------------------------------------------------

#[test]
fn gesture_list_is_found_from_subdirectory() {
    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());
    let subdir = dir.path().join("nested/deeper");
    std::fs::create_dir_all(&subdir).unwrap();

    let mut cmd = Command::cargo_bin("handctl").unwrap();
    cmd.current_dir(&subdir)
        .env_remove("HAND_CONFIG")
        .args(["gesture", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fist"))
        .stdout(predicate::str::contains("point"));
}

#[test]
fn gesture_show_lists_positions_with_limits() {
    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());

    handctl(&dir)
        .args(["gesture", "show", "fist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("servo_12"))
        .stdout(predicate::str::contains("900"));
}

#[test]
fn gesture_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());

    handctl(&dir)
        .args(["gesture", "show", "wave"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gesture not found: wave"));
}

#[test]
fn sequence_list_json() {
    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());

    let output = handctl(&dir)
        .args(["sequence", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let sequences: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sequences["wave"][1]["gesture"], "point");
    assert_eq!(sequences["wave"][1]["hold"], 300);
}

#[test]
fn read_commands_do_not_rewrite_document() {
    let dir = TempDir::new().unwrap();
    let path = write_document(
        &dir,
        serde_json::json!({ "servo_limits": { "servo_1": { "min": 0, "max": 10 } } }),
    );
    let before = std::fs::read_to_string(&path).unwrap();

    handctl(&dir)
        .args(["gesture", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No gestures."));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

// ---------------------------------------------------------------------------
// handctl serve
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn serve_exits_cleanly_on_sigterm() {
    use std::io::{BufRead, BufReader};
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    write_document(&dir, hand_document());
    let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_handctl"))
        .args(["serve", "--bind", "127.0.0.1", "--port", "0"])
        .current_dir(dir.path())
        .env_remove("HAND_CONFIG")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // The listening banner means the signal handlers are about to be armed.
    let mut banner = String::new();
    BufReader::new(child.stdout.take().unwrap())
        .read_line(&mut banner)
        .unwrap();
    assert!(banner.contains("http://localhost:"), "unexpected banner: {banner}");
    std::thread::sleep(Duration::from_millis(300));

    let killed = std::process::Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("handctl serve ignored SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success(), "exit status: {status:?}");
}

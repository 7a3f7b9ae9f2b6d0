//! End-to-end runs of the `parity` binary over Python workspaces, through the
//! default process isolation and the bundled language host.

use std::path::Path;
use std::process::{Command, Output};

fn python_available() -> bool {
    let available = Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success());
    if !available {
        eprintln!("python3 not available, skipping test");
    }
    available
}

/// Helper: lay out one job directory with Python sources.
fn job(root: &Path, name: &str, original: &str, candidate: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("create job dir");
    std::fs::write(dir.join("original.py"), original).expect("write original");
    std::fs::write(dir.join("refactored.py"), candidate).expect("write candidate");
}

/// Run `parity check` from the crate root so the default host path resolves.
fn parity_check(workspace: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_parity"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .arg("check")
        .arg(workspace)
        .args(["--seed", "7"])
        .args(extra)
        .output()
        .expect("run parity binary")
}

const ACCOUNT: &str = r#"
class Account:
    def __init__(self, balance: int):
        self.balance = balance

    def deposit(self, amount: int):
        if amount < 0:
            raise ValueError("negative deposit")
        self.balance += amount
        return self.balance
"#;

fn passing_jobs(root: &Path) {
    let scale = "def scale(a, b):\n    return a * b + 1\n";
    job(root, "same", &format!("{}{}", scale, ACCOUNT), &format!("{}{}", scale, ACCOUNT));
    job(
        root,
        "div",
        "def div(a, b):\n    return a / b\n",
        "def div(a, b):\n    if b == 0:\n        return 0\n    return a / b\n",
    );
}

#[test]
fn test_binary_reports_divergence_and_exits_nonzero() {
    if !python_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("create workspace");
    passing_jobs(dir.path());
    job(
        dir.path(),
        "arith",
        "def combine(a, b):\n    return a + b\n",
        "def combine(a, b):\n    return a - b\n",
    );
    job(
        dir.path(),
        "loop",
        "def spin(n):\n    while True:\n        pass\n\ndef ok(n):\n    return n\n",
        "def spin(n):\n    while True:\n        pass\n\ndef ok(n):\n    return n\n",
    );

    let output = parity_check(dir.path(), &["--deadline", "2"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stdout:\n{}\nstderr:\n{}", stdout, stderr);

    assert!(stdout.contains("[FAIL] arith"), "{}", stdout);
    assert!(stdout.contains("  [FAIL] combine ("), "{}", stdout);
    assert!(stdout.contains("Mismatch for input"), "{}", stdout);
    assert!(stdout.contains("[PASS] div"), "{}", stdout);
    assert!(stdout.contains("[PASS] same"), "{}", stdout);
    assert!(stdout.contains("  [PASS] Account.deposit ("), "{}", stdout);
    assert!(stdout.contains("  [PASS] scale ("), "{}", stdout);
    assert!(stdout.contains("[PASS] loop"), "{}", stdout);
    assert!(stdout.contains("  [SKIP] spin ("), "{}", stdout);
    assert!(stdout.contains("  [PASS] ok ("), "{}", stdout);
    assert!(!stdout.contains("host failure"), "{}", stdout);
    assert!(stdout.contains("4 jobs: 3 passed, 1 failed, 0 skipped"), "{}", stdout);
}

#[test]
fn test_binary_json_report_for_passing_workspace() {
    if !python_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("create workspace");
    passing_jobs(dir.path());

    let output = parity_check(dir.path(), &["--json"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a json report");
    let jobs = report["jobs"].as_array().expect("jobs array");
    assert_eq!(jobs.len(), 2);
    for job in jobs {
        assert_eq!(job["status"], "PASS", "{}", job);
        for callable in job["callables"].as_array().expect("callables array") {
            assert_eq!(callable["verdict"]["status"], "PASS", "{}", callable);
        }
    }
}

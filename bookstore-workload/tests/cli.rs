use std::process::Command;

const WORKLOAD_EXE: &str = env!("CARGO_BIN_EXE_bookstore-workload");

#[test]
fn prints_version() {
    let output = Command::new(WORKLOAD_EXE)
        .arg("version")
        .output()
        .expect("Failed to run workload binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn runs_single_level_with_report() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.jsonl");

    let output = Command::new(WORKLOAD_EXE)
        .args(["run", "--concurrency", "2"])
        .env("BW__WORKLOAD__WARM_UP_RUNS", "0")
        .env("BW__WORKLOAD__MEASURED_RUNS", "20")
        .env("BW__WORKLOAD__SEED", "3")
        .env("BW__RUNTIME__WORKER_THREADS", "2")
        .env("BW__LOGGING__LEVEL", "error")
        .env("BW__OUTPUT", &report)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run workload binary");

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let contents = std::fs::read_to_string(&report).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let level: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(level["concurrency"], 2);
    assert!(level["interactions"]["customer"]["count"].is_u64());
}

#[test]
fn rejects_invalid_configuration() {
    let output = Command::new(WORKLOAD_EXE)
        .args(["run", "--concurrency", "1"])
        .env("BW__WORKLOAD__RARE_THRESHOLD", "50")
        .env("BW__WORKLOAD__FREQUENT_THRESHOLD", "20")
        .env("BW__LOGGING__LEVEL", "error")
        .output()
        .expect("Failed to run workload binary");

    assert!(!output.status.success());
}

#[test]
fn rejects_zero_worker_threads() {
    let output = Command::new(WORKLOAD_EXE)
        .args(["run", "--concurrency", "1"])
        .env("BW__RUNTIME__WORKER_THREADS", "0")
        .output()
        .expect("Failed to run workload binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("worker_threads"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}

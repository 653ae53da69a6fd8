//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn kgreen() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kgreen"));
    cmd.env_remove("KGREEN_NAMESPACE")
        .env_remove("KGREEN_API_URL")
        .env_remove("KUBECONFIG");
    cmd
}

const SNAPSHOT: &str = r#"{
  "workloads": [
    {
      "workload": {
        "name": "api-1",
        "requests": {
          "cpu_millicores": {"state": "declared", "value": 500.0},
          "memory_bytes": {"state": "declared", "value": 1073741824.0}
        },
        "claim_refs": ["pvc-a"]
      },
      "usage": {
        "name": "api-1",
        "usage": {
          "cpu_millicores": {"state": "declared", "value": 100.0},
          "memory_bytes": {"state": "declared", "value": 536870912.0}
        }
      }
    },
    {
      "workload": {
        "name": "batch-0",
        "requests": {
          "memory_bytes": {"state": "declared", "value": 268435456.0}
        }
      }
    }
  ],
  "claims": [
    {"name": "pvc-a", "declared_size": "5Gi"},
    {"name": "pvc-b", "declared_size": "10Gi"}
  ]
}"#;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = kgreen()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("KubeGreen"), "Should show app name");
    assert!(stdout.contains("audit"), "Should show audit command");
    assert!(stdout.contains("trigger"), "Should show trigger command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = kgreen()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kgreen"), "Should show binary name");
}

/// Test audit subcommand help
#[test]
fn test_audit_help() {
    let output = kgreen()
        .args(["audit", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Audit help should succeed");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--all"), "Should show all option");
    assert!(stdout.contains("--snapshot"), "Should show snapshot option");
    assert!(stdout.contains("--context"), "Should show context option");
}

/// Test trigger subcommand help
#[test]
fn test_trigger_help() {
    let output = kgreen()
        .args(["trigger", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Trigger help should succeed");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test offline audit of a snapshot with JSON output
#[test]
fn test_audit_snapshot_json() {
    let home = tempfile::tempdir().unwrap();
    let mut snapshot = tempfile::NamedTempFile::new().unwrap();
    snapshot.write_all(SNAPSHOT.as_bytes()).unwrap();

    let output = kgreen()
        .env("HOME", home.path())
        .args(["--format", "json", "audit", "-n", "demo", "--snapshot"])
        .arg(snapshot.path())
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "Snapshot audit should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["namespace"], "demo");

    let records = report["waste_records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "api-1");
    assert_eq!(records[0]["severity"], "HIGH_WASTE");
    // No cpu request: the 100m floor is assumed and a warning raised
    assert_eq!(records[1]["effective_cpu_request_millicores"], 100.0);
    assert_eq!(report["warnings"][0]["kind"], "missing_request");
    assert_eq!(report["warnings"][0]["workload"], "batch-0");

    let orphans = report["orphan_records"].as_array().unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0]["name"], "pvc-b");
}

/// Test offline audit table output
#[test]
fn test_audit_snapshot_table() {
    let home = tempfile::tempdir().unwrap();
    let mut snapshot = tempfile::NamedTempFile::new().unwrap();
    snapshot.write_all(SNAPSHOT.as_bytes()).unwrap();

    let output = kgreen()
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .args(["audit", "--snapshot"])
        .arg(snapshot.path())
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Snapshot audit should succeed");
    assert!(stdout.contains("simulation"), "Should default the namespace");
    assert!(stdout.contains("api-1"));
    assert!(stdout.contains("HIGH WASTE"));
    assert!(stdout.contains("pvc-b"));
    assert!(stdout.contains("batch-0 has no cpu request set"));
}

/// Test that an unreadable snapshot is reported as an error
#[test]
fn test_audit_missing_snapshot_fails() {
    let home = tempfile::tempdir().unwrap();

    let output = kgreen()
        .env("HOME", home.path())
        .args(["audit", "--snapshot"])
        .arg(home.path().join("missing.json"))
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.json"));
}

/// Test that a KUBECONFIG list is left to kube instead of read as one file
#[test]
fn test_audit_kubeconfig_list_is_not_a_single_path() {
    let home = tempfile::tempdir().unwrap();
    let first = home.path().join("a");
    let second = home.path().join("b");
    let joined = std::env::join_paths([&first, &second]).unwrap();

    let output = kgreen()
        .env("HOME", home.path())
        .env("KUBECONFIG", &joined)
        .env_remove("KUBERNETES_SERVICE_HOST")
        .env_remove("KUBERNETES_SERVICE_PORT")
        .args(["audit", "-n", "demo"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to create Kubernetes client"), "{}", stderr);
    assert!(!stderr.contains("Failed to load kubeconfig"), "{}", stderr);
}

/// Test that the kubeconfig flag is not bound to the KUBECONFIG variable
#[test]
fn test_kubeconfig_flag_has_no_env_binding() {
    let output = kgreen()
        .args(["audit", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--kubeconfig"));
    assert!(!stdout.contains("env: KUBECONFIG"));
}

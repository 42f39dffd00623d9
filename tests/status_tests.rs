//! status command tests

mod common;

use predicates::prelude::*;

#[test]
fn test_status_json_on_empty_sandbox() {
    let workspace = common::TestWorkspace::new();

    let output = common::pixgpu_cmd(&workspace)
        .args(["status", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let components = report["components"].as_array().unwrap();
    assert_eq!(components.len(), 3);
    assert_eq!(components[0]["component"], "cuda");
    assert_eq!(components[1]["component"], "cudnn");
    assert_eq!(components[2]["component"], "tensorflow");
    assert!(components.iter().all(|c| c["state"] == "absent"));
    assert_eq!(report["profile"]["block"], "absent");
    assert_eq!(report["host_app"]["installed"], false);
}

#[test]
fn test_status_reports_partial_install() {
    let workspace = common::TestWorkspace::new();
    workspace.write_file("usr/local/cuda-12.2/bin/nvcc", "");
    workspace.write_file("usr/local/cuda-12.2/include/cudnn_version.h", "");
    workspace.write_file("usr/local/cuda-12.2/lib64/libcudnn.so.8.9.7", "");

    let output = common::pixgpu_cmd(&workspace)
        .args(["status", "--json"])
        .output()
        .unwrap();

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["components"][0]["state"], "partial");
    assert_eq!(report["components"][1]["state"], "present");
    assert_eq!(report["components"][2]["state"], "absent");
}

#[test]
fn test_status_human_readable() {
    let workspace = common::TestWorkspace::new();

    common::pixgpu_cmd(&workspace)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Components"))
        .stdout(predicate::str::contains("CUDA Toolkit"))
        .stdout(predicate::str::contains("not installed"));
}

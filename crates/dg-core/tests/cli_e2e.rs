//! End-to-end CLI tests for dg-core.
//!
//! A small training CSV is written to a temp dir per test. Config search
//! paths are pointed at that dir so the host environment cannot leak in.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tempfile::TempDir;

const SAMPLE_LEN: usize = 784;

/// Get a Command for the dg-core binary with an isolated environment.
fn dg_core(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dg-core").expect("dg-core binary should exist");
    cmd.env_remove("DG_CONFIG")
        .env_remove("DG_TRAIN_DATA_PATH")
        .env_remove("DG_PCA_COMPONENTS")
        .env_remove("DG_GMM_COMPONENTS")
        .env_remove("DG_LOG")
        .env_remove("RUST_LOG")
        .env("DG_CONFIG_DIR", dir)
        .env("XDG_CONFIG_HOME", dir)
        .arg("--log-level")
        .arg("off");
    cmd
}

/// Labels 0 and 1 around flat 40 and 200, ten mirrored pairs each.
fn write_training_csv(dir: &Path) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(21);
    let mut csv = String::from("label");
    for j in 0..SAMPLE_LEN {
        write!(csv, ",pixel{j}").unwrap();
    }
    csv.push('\n');
    for (label, base) in [(0i64, 40i64), (1, 200)] {
        for _ in 0..10 {
            let noise: Vec<i64> = (0..SAMPLE_LEN).map(|_| rng.random_range(-10..=10)).collect();
            for sign in [1, -1] {
                csv.push_str(&label.to_string());
                for e in &noise {
                    write!(csv, ",{}", base + sign * e).unwrap();
                }
                csv.push('\n');
            }
        }
    }
    let path = dir.join("train.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn flat_sample(value: u8, len: usize) -> String {
    serde_json::to_string(&vec![value; len]).unwrap()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Classification
// ============================================================================

mod classify {
    use super::*;

    #[test]
    fn flat_samples_take_nearest_class() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        for (value, expected) in [(40u8, 0), (200, 1)] {
            let output = dg_core(dir.path())
                .arg("--train")
                .arg(&train)
                .args(["classify", "--sample", &flat_sample(value, SAMPLE_LEN)])
                .output()
                .unwrap();
            assert!(output.status.success());
            assert_eq!(stdout_json(&output)["label"], expected);
        }
    }

    #[test]
    fn sample_can_come_from_stdin() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        let output = dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["classify", "--detailed"])
            .write_stdin(flat_sample(200, SAMPLE_LEN))
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["decision"]["label"], 1);
        assert_eq!(json["posterior"]["posterior"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn short_sample_exits_with_sample_code() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["classify", "--sample", &flat_sample(0, 783)])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("783 given"));
    }

    #[test]
    fn malformed_sample_is_an_argument_error() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["classify", "--sample", "not json"])
            .assert()
            .code(10);
    }
}

// ============================================================================
// Generation
// ============================================================================

mod generation {
    use super::*;

    #[test]
    fn seeded_sample_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        let run = || {
            let output = dg_core(dir.path())
                .arg("--train")
                .arg(&train)
                .args(["--seed", "7", "sample", "--label", "1"])
                .output()
                .unwrap();
            assert!(output.status.success());
            stdout_json(&output)
        };
        let first = run();
        assert_eq!(first["label"], 1);
        assert_eq!(first["sample"].as_array().unwrap().len(), SAMPLE_LEN);
        assert_eq!(first, run());
    }

    #[test]
    fn label_out_of_range_exits_with_label_code() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        for label in ["10", "-1"] {
            dg_core(dir.path())
                .arg("--train")
                .arg(&train)
                .args(["sample", "--label", label])
                .assert()
                .code(12)
                .stderr(predicate::str::contains("between 0 and 9"));
        }
    }

    #[test]
    fn unobserved_label_is_model_not_ready() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["sample-mean", "--label", "5"])
            .assert()
            .code(13);
    }
}

// ============================================================================
// Clustering
// ============================================================================

mod clustering {
    use super::*;

    #[test]
    fn evaluate_separates_two_classes() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        let output = dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["evaluate", "--dims", "2", "--clusters", "2"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["accuracy"], 1.0);
        assert_eq!(json["confusion"][0][0], 10 * 2);
        assert_eq!(json["confusion"][1][1], 10 * 2);
    }

    #[test]
    fn too_many_clusters_is_an_argument_error() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .args(["evaluate", "--clusters", "50"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("clusters"));
    }
}

// ============================================================================
// Inputs, config and schema
// ============================================================================

mod surfaces {
    use super::*;

    #[test]
    fn missing_training_data_is_an_argument_error() {
        let dir = TempDir::new().unwrap();
        dg_core(dir.path())
            .arg("estimate")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("--train"));
    }

    #[test]
    fn bad_training_row_is_a_dataset_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "0,1,2,3\n").unwrap();
        dg_core(dir.path())
            .arg("--train")
            .arg(&path)
            .arg("estimate")
            .assert()
            .code(15)
            .stderr(predicate::str::contains("line 1"));
    }

    #[test]
    fn estimate_reports_both_classes() {
        let dir = TempDir::new().unwrap();
        let train = write_training_csv(dir.path());
        let output = dg_core(dir.path())
            .arg("--train")
            .arg(&train)
            .arg("estimate")
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["rows"], 40);
        assert_eq!(json["classes"].as_array().unwrap().len(), 2);
        assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn config_show_reports_file_values() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.json");
        std::fs::write(&config, r#"{"pca_components": 7}"#).unwrap();
        let output = dg_core(dir.path())
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["config"]["pca_components"], 7);
        assert_eq!(json["source"], "CLI argument");
    }

    #[test]
    fn invalid_config_exits_with_config_code() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("engine.json"), r#"{"gmm_components": 0}"#).unwrap();
        dg_core(dir.path())
            .args(["config", "show"])
            .assert()
            .code(14)
            .stderr(predicate::str::contains("gmm_components"));
    }

    #[test]
    fn schema_list_names_public_types() {
        let dir = TempDir::new().unwrap();
        dg_core(dir.path())
            .args(["schema", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ClusterEvaluation"))
            .stdout(predicate::str::contains("Sample"));
    }

    #[test]
    fn unknown_command_is_an_argument_error() {
        let dir = TempDir::new().unwrap();
        dg_core(dir.path())
            .arg("nonexistent-command")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("error"));
    }
}

//! End-to-end tests for the hl7-profile binary

mod utils;

use predicates::prelude::*;
use utils::{read_report, standard_corpus, Corpus, ADT_A01, ORU_R01};

#[test]
fn test_profile_writes_combined_report() {
    let corpus = standard_corpus().unwrap();
    let output = corpus.output_path("profile.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hl7-profile");
    cmd.arg(corpus.path()).arg(&output);
    cmd.assert().success();

    let report = read_report(&output).unwrap();
    assert_eq!(report["_metadata"]["report_type"], "combined");
    assert_eq!(report["_metadata"]["total_messages"], 3);
    assert_eq!(report["_totals_by_type"]["ADT^A01"], 2);
    assert_eq!(report["_totals_by_type"]["ORU^R01"], 1);
    assert_eq!(report["PID"]["description"], "Patient Identification");
    assert_eq!(report["PID"]["8"]["present_in"], 3);
    assert_eq!(report["PID"]["8"]["total"], 3);
}

#[test]
fn test_profile_sequence_patterns() {
    let corpus = standard_corpus().unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let report = read_report(&output).unwrap();
    let adt = &report["_sequence_profiles_by_type"]["ADT^A01"];
    assert_eq!(adt["total_messages"], 2);
    assert_eq!(
        adt["common_sequences"][0]["sequence"],
        serde_json::json!(["MSH", "[EVN]", "PID", "PV1"])
    );
    assert_eq!(adt["common_sequences"][0]["count"], 2);
    assert_eq!(adt["common_sequences"][0]["percent"], 100.0);
    assert_eq!(adt["segments"]["EVN"]["present_in"], 1);

    let oru = &report["_sequence_profiles_by_type"]["ORU^R01"];
    assert_eq!(
        oru["common_sequences"][0]["sequence"],
        serde_json::json!(["MSH", "PID", "OBR", "OBX+"])
    );
    assert_eq!(oru["segments"]["OBX"]["repeats"], true);
}

#[test]
fn test_profile_field_details() {
    let corpus = standard_corpus().unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let report = read_report(&output).unwrap();

    // Practitioner kept as one opaque value
    assert_eq!(
        report["PV1"]["7"]["unique_values"][0]["value"],
        "1234^Welby^Marcus"
    );
    // Patient identifiers decomposed and never enumerated
    assert_eq!(report["PID"]["3.1"]["count"], 4);
    assert!(report["PID"]["3.1"].get("unique_values").is_none());
    assert_eq!(report["PID"]["_repeating_fields"], serde_json::json!(["3"]));
    // Timestamps consolidated to the bare path with an inferred type
    assert_eq!(report["MSH"]["7"]["type"], "yyyyMMddHHmmss");
    assert!(report["MSH"]["7"].get("unique_values").is_none());
    assert_eq!(report["OBX"]["5"]["type"], "int");
}

#[test]
fn test_compact_output_single_line() {
    let corpus = standard_corpus().unwrap();
    let output = corpus.output_path("compact.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("--compact")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.trim_end().contains('\n'));
}

#[test]
fn test_max_unique_flag_drops_overflowed_fields() {
    let corpus = standard_corpus().unwrap();
    let output = corpus.output_path("capped.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("--max-unique")
        .arg("1")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let report = read_report(&output).unwrap();
    // Sex overflows inside ADT (M then F) and is dropped there; ORU's value survives
    assert_eq!(report["PID"]["8"]["present_in"], 1);
    assert_eq!(report["PID"]["8"]["unique_values"][0]["value"], "F");
    // Patient identifiers overflow in ADT as well
    assert_eq!(report["PID"]["3.1"]["count"], 1);
}

#[test]
fn test_bad_files_are_skipped() {
    let corpus = Corpus::new().unwrap();
    corpus.add("good.hl7", ADT_A01).unwrap();
    corpus.add("bad.hl7", "garbage without header").unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Error parsing"));

    let report = read_report(&output).unwrap();
    assert_eq!(report["_metadata"]["total_messages"], 1);
}

#[test]
fn test_custom_extension() {
    let corpus = Corpus::new().unwrap();
    corpus.add("msg.txt", ORU_R01).unwrap();
    corpus.add("ignored.hl7", ADT_A01).unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("--extension")
        .arg("txt")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let report = read_report(&output).unwrap();
    assert_eq!(report["_metadata"]["message_types"], serde_json::json!(["ORU^R01"]));
}

#[test]
fn test_config_file_applied() {
    let corpus = standard_corpus().unwrap();
    let config = corpus
        .add("profile.toml", "workers = 1\nphi_fields = [\"PID.8\"]\n")
        .unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("--config")
        .arg(&config)
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .success();

    let report = read_report(&output).unwrap();
    assert!(report["PID"]["8"].get("unique_values").is_none());
    // PHI list replaced, so names are enumerated now
    assert!(report["PID"]["5.1"].get("unique_values").is_some());
}

#[test]
fn test_empty_directory_fails() {
    let corpus = Corpus::new().unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .hl7 files found"));
    assert!(!output.exists());
}

#[test]
fn test_only_undecodable_files_fails() {
    let corpus = Corpus::new().unwrap();
    corpus.add("bad.hl7", "nothing useful").unwrap();
    let output = corpus.output_path("profile.json");

    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg(corpus.path())
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No messages could be decoded"));
}

#[test]
fn test_missing_input_dir_fails() {
    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("/nonexistent/hl7/corpus")
        .arg("/tmp/hl7-profile-never-written.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input directory not found"));
}

#[test]
fn test_runs_are_deterministic() {
    let corpus = standard_corpus().unwrap();
    let first = corpus.output_path("first.json");
    let second = corpus.output_path("second.json");

    for (output, workers) in [(&first, "1"), (&second, "4")] {
        assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
            .arg("--workers")
            .arg(workers)
            .arg(corpus.path())
            .arg(output)
            .assert()
            .success();
    }

    let mut a = read_report(&first).unwrap();
    let mut b = read_report(&second).unwrap();
    a["_metadata"]["generated_at"] = serde_json::Value::Null;
    b["_metadata"]["generated_at"] = serde_json::Value::Null;
    assert_eq!(a, b);
}

#[test]
fn test_help_mentions_usage() {
    assert_cmd::cargo::cargo_bin_cmd!("hl7-profile")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("INPUT"))
        .stdout(predicate::str::contains("--max-unique"));
}
